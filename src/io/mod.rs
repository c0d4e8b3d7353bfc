// src/io/mod.rs
pub mod job;

pub use job::{Job, LengthUnit};
