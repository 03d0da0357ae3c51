pub mod cvedb;
pub mod engine;
pub mod vendors;

pub use engine::{correlate, FingerprintEngine};
