//src/model/mod.rs
pub mod elements;
pub mod structure;

// Re-exports for cleaner imports
pub use elements::{atomic_number, symbol};
pub use structure::{Atom, Structure};
