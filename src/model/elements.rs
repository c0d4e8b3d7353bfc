// src/model/elements.rs

/// Highest atomic number with tabulated D3 atomic data.
pub const MAX_ATOMIC_NUMBER: u8 = 118;

/// Element symbols indexed by atomic number (index 0 is a dummy).
const SYMBOLS: [&str; 119] = [
    "X",
    // --- Period 1 ---
    "H", "He",
    // --- Period 2 ---
    "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    // --- Period 3 ---
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar",
    // --- Period 4 ---
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr",
    // --- Period 5 ---
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe",
    // --- Period 6 ---
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy",
    "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt",
    "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    // --- Period 7 ---
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf",
    "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds",
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the atomic number (Z) for an element symbol.
///
/// Matching ignores case and surrounding whitespace, so `"AR"`, `"ar"` and
/// `" Ar"` all resolve to 18.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    let symbol = symbol.trim();
    SYMBOLS
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, s)| s.eq_ignore_ascii_case(symbol))
        .map(|(z, _)| z as u8)
}

/// Returns the element symbol for an atomic number in 1..=118.
pub fn symbol(number: u8) -> Option<&'static str> {
    match number {
        1..=MAX_ATOMIC_NUMBER => Some(SYMBOLS[number as usize]),
        _ => None,
    }
}
