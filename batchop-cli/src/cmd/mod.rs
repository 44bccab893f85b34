pub mod config;
pub mod progress;
pub mod run;
pub mod simulate;
