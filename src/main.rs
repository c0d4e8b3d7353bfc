// src/main.rs

use d3disp::config::Config;
use d3disp::constants::{HARTREE_TO_EV, HARTREE_TO_KCAL_PER_MOL};
use d3disp::io::Job;
use d3disp::reference::{self, ReferenceTable};
use d3disp::utils::logger;
use d3disp::{DispersionError, DispersionModel};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: d3disp <job.json> [--reference FILE] [--gradient] [--save-config]";

struct Args {
    job: PathBuf,
    reference: Option<PathBuf>,
    gradient: bool,
    save_config: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut job = None;
    let mut reference = None;
    let mut gradient = false;
    let mut save_config = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--reference" | "-r" => {
                let path = args.next().ok_or("--reference needs a file")?;
                reference = Some(PathBuf::from(path));
            }
            "--gradient" | "-g" => gradient = true,
            "--save-config" => save_config = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown option {}\n{}", flag, USAGE)),
            path => {
                if job.replace(PathBuf::from(path)).is_some() {
                    return Err(format!("more than one job file given\n{}", USAGE));
                }
            }
        }
    }

    Ok(Args {
        job: job.ok_or_else(|| USAGE.to_string())?,
        reference,
        gradient,
        save_config,
    })
}

fn run(args: &Args, settings: &Config) -> d3disp::Result<String> {
    let path = args
        .reference
        .as_ref()
        .or(settings.reference.as_ref())
        .ok_or_else(|| {
            DispersionError::InvalidReference(
                "no reference table given (use --reference or set it in the settings)".into(),
            )
        })?;
    let table = reference::install(ReferenceTable::from_path(path)?);

    let job = Job::from_path(&args.job)?;
    let structure = job.structure()?;
    let damping = job.damping(settings)?;
    let mut config = settings.dispersion;
    if let Some(three_body) = job.three_body {
        config.three_body = three_body;
    }

    log::info!(
        "{} atoms, {} damping, three-body {}",
        structure.len(),
        damping.kind(),
        if config.three_body { "on" } else { "off" }
    );
    let model = DispersionModel::new(table, damping, config);
    let result = model.evaluate(&structure, args.gradient)?;
    log::info!(
        "dispersion energy {:.10} Eh = {:.6} eV = {:.6} kcal/mol",
        result.energy,
        result.energy * HARTREE_TO_EV,
        result.energy * HARTREE_TO_KCAL_PER_MOL
    );
    Ok(serde_json::to_string_pretty(&result)?)
}

fn main() -> ExitCode {
    let (settings, status) = Config::load();
    if logger::init(&settings.log_level).is_err() {
        eprintln!("logger already initialized");
    }
    log::debug!("{}", status);

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    if args.save_config {
        log::info!("{}", settings.save());
    }

    match run(&args, &settings) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
