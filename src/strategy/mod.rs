// Signal generation
pub mod crossover;

pub use crossover::{CrossoverDetector, Trend};
