pub mod classifier;
pub mod deadline;
pub mod discovery;
pub mod errors;
pub mod models;
pub mod ports;
pub mod probes;
pub mod scheduler;
pub mod state;
pub mod verify;
