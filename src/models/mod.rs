pub mod announcement;
pub mod config;
