use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScullError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device error: {0}")]
    Device(#[from] device::DeviceError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<storage::StorageError> for ScullError {
    fn from(err: storage::StorageError) -> Self {
        ScullError::Device(device::DeviceError::Storage(err))
    }
}

pub type Result<T> = std::result::Result<T, ScullError>;
