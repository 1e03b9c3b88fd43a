use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use storage::{DeviceStore, StoreStats};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::file::{AccessMode, OpenFile};
use crate::ops::FileOperations;
use crate::{Config, DeviceError, Result};

/// One scull device: a store behind the lock that serializes every
/// operation on it.
#[derive(Debug)]
pub struct ScullDev {
    minor: u32,
    store: Mutex<DeviceStore>,
    open_count: AtomicUsize,
}

impl ScullDev {
    fn new(minor: u32, store: DeviceStore) -> Self {
        Self {
            minor,
            store: Mutex::new(store),
            open_count: AtomicUsize::new(0),
        }
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.lock().await.stats()
    }

    pub async fn trim(&self) {
        self.store.lock().await.trim();
    }

    pub async fn set_geometry(&self, quantum: usize, qset: usize) -> Result<()> {
        self.store.lock().await.set_geometry(quantum, qset)?;
        Ok(())
    }
}

pub struct ScullDevices {
    first_minor: u32,
    devices: Vec<Arc<ScullDev>>,
}

impl ScullDevices {
    pub fn new(config: Config) -> Result<Self> {
        if config.nr_devs == 0 {
            return Err(DeviceError::InvalidConfig(
                "at least one device is required".to_string(),
            ));
        }

        let nr_devs = u32::try_from(config.nr_devs)
            .ok()
            .filter(|n| config.first_minor.checked_add(*n).is_some())
            .ok_or_else(|| {
                DeviceError::InvalidConfig(format!(
                    "{} devices from minor {} overflow the minor range",
                    config.nr_devs, config.first_minor
                ))
            })?;

        let mut devices = Vec::with_capacity(config.nr_devs);
        for i in 0..nr_devs {
            let store = DeviceStore::new(config.store)?;
            devices.push(Arc::new(ScullDev::new(config.first_minor + i, store)));
        }

        info!(
            nr_devs,
            first_minor = config.first_minor,
            quantum = config.store.quantum,
            qset = config.store.qset,
            "scull devices created"
        );

        Ok(Self {
            first_minor: config.first_minor,
            devices,
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn minors(&self) -> impl Iterator<Item = u32> + '_ {
        self.devices.iter().map(|dev| dev.minor)
    }

    pub fn device(&self, minor: u32) -> Result<&Arc<ScullDev>> {
        minor
            .checked_sub(self.first_minor)
            .and_then(|index| self.devices.get(index as usize))
            .ok_or(DeviceError::NoSuchDevice(minor))
    }

    pub async fn stat(&self, minor: u32) -> Result<StoreStats> {
        Ok(self.device(minor)?.stats().await)
    }

    /// Releases the memory of every device.
    pub async fn trim_all(&self) {
        for dev in &self.devices {
            dev.trim().await;
        }
    }
}

#[async_trait]
impl FileOperations for ScullDevices {
    async fn open(&self, minor: u32, mode: AccessMode) -> Result<OpenFile> {
        let dev = self.device(minor)?;

        if mode == AccessMode::WriteOnly {
            dev.store.lock().await.trim();
        }

        let file = OpenFile::new(minor, mode);
        let open = dev.open_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!(minor, ?mode, session = %file.id, open, "open");
        Ok(file)
    }

    async fn release(&self, file: OpenFile) -> Result<()> {
        let dev = self.device(file.minor)?;
        let prev = dev
            .open_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or_else(|n| n);
        let open = prev.saturating_sub(1);
        info!(minor = file.minor, session = %file.id, open, "release");
        Ok(())
    }

    async fn read(&self, file: &OpenFile, buf: &mut [u8], offset: &mut u64) -> Result<usize> {
        if !file.mode.can_read() {
            return Err(DeviceError::BadFileMode(format!(
                "session {} is not open for reading",
                file.id
            )));
        }

        let dev = self.device(file.minor)?;
        debug!(minor = file.minor, count = buf.len(), pos = *offset, "read");

        let store = dev.store.lock().await;
        let count = buf.len();
        let mut dst = buf;
        Ok(store.read(offset, count, &mut dst)?)
    }

    async fn write(&self, file: &OpenFile, data: &[u8], offset: &mut u64) -> Result<usize> {
        if !file.mode.can_write() {
            return Err(DeviceError::BadFileMode(format!(
                "session {} is not open for writing",
                file.id
            )));
        }

        let dev = self.device(file.minor)?;
        debug!(minor = file.minor, count = data.len(), pos = *offset, "write");

        let mut store = dev.store.lock().await;
        let mut src = data;
        Ok(store.write(offset, data.len(), &mut src)?)
    }
}
