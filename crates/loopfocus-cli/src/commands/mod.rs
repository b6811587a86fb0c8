pub mod config;
pub mod history;
pub mod media;
pub mod run;
