pub mod ansi;
pub mod directory;
pub mod log;
pub mod status;
