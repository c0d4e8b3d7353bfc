// src/reference/mod.rs

pub mod data;
pub mod table;

// Re-export commonly used items
pub use table::{
    install, ElementEntry, ElementReference, PairEntry, PairView, RadiusEntry,
    ReferenceFile, ReferenceTable,
};
