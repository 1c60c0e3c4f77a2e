pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod http;
pub mod remote;
pub mod sensors;
pub mod state;

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
}
