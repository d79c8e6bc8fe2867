use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No '{0}' reply from tunebridge")]
    Timeout(String),
    #[error("Zbus error: {0}")]
    Zbus(#[from] ZbusError),
}
