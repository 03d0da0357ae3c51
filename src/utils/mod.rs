pub mod fs;
pub mod gate;
pub mod logging;
pub mod time;
