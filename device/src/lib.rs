mod file;
mod ops;
mod scull;

pub use file::{AccessMode, OpenFile, SessionId};
pub use ops::{read_to_end, write_all, FileOperations};
pub use scull::{ScullDev, ScullDevices};

use serde::{Deserialize, Serialize};
use storage::{StorageError, StoreConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub nr_devs: usize,
    pub first_minor: u32,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nr_devs: 4,
            first_minor: 0,
            store: StoreConfig::default(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No such device: minor {0}")]
    NoSuchDevice(u32),

    #[error("Bad file mode: {0}")]
    BadFileMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DeviceError {
    /// Kernel errno a char device driver would return for this error.
    pub fn errno(&self) -> i32 {
        match self {
            DeviceError::NoSuchDevice(_) => libc::ENODEV,
            DeviceError::BadFileMode(_) => libc::EBADF,
            DeviceError::InvalidConfig(_) => libc::EINVAL,
            DeviceError::Storage(err) => match err {
                StorageError::AllocationFailure(_) => libc::ENOMEM,
                StorageError::CopyFault(_) => libc::EFAULT,
                StorageError::InvalidConfig(_) => libc::EINVAL,
                StorageError::OffsetOverflow(_) => libc::EOVERFLOW,
                StorageError::NotEmpty(_) => libc::EBUSY,
            },
        }
    }
}
