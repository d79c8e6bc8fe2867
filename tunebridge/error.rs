use flexi_logger::FlexiLoggerError;
use std::io::Error as IoError;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed: {0}")]
    Io(#[from] IoError),
    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid payload for '{message}': {reason}")]
    Payload { message: String, reason: String },
    #[error("Unknown message: {0}")]
    UnknownMessage(String),
    #[error("Bridge is already active")]
    AlreadyActive,
    #[error("No async runtime available: {0}")]
    Runtime(String),
    #[error("Channel send error: {0}")]
    Send(String),
    #[error("Environment variable error")]
    EnvVar(#[from] std::env::VarError),
    #[error("Logger initialization error: {0}")]
    Logger(#[from] FlexiLoggerError),
    #[error("Zbus error: {0}")]
    Zbus(#[from] ZbusError),
}

impl App {
    pub fn payload(message: &str, reason: impl ToString) -> Self {
        App::Payload {
            message: message.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for App {
    fn from(error: tokio::sync::mpsc::error::SendError<T>) -> Self {
        App::Send(error.to_string())
    }
}
