use std::sync::Arc;

use device::ScullDevices;
use tracing::info;

use crate::config::Config;
use crate::error::Result;

/// The loaded scull module: the device table built from the load-time
/// parameters. Dropping the module without calling [`ScullModule::exit`]
/// still frees every store.
pub struct ScullModule {
    config: Config,
    devices: Arc<ScullDevices>,
}

impl ScullModule {
    pub fn init(config: Config) -> Result<Self> {
        info!("scull: init");
        config.validate()?;

        let devices = Arc::new(ScullDevices::new(config.clone().into())?);

        info!(
            "scull: {} devices at minor {}, quantum {} x qset {} ({} bytes per set)",
            config.nr_devs,
            config.minor,
            config.quantum,
            config.qset,
            config.segment_span()
        );

        Ok(Self { config, devices })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn devices(&self) -> Arc<ScullDevices> {
        self.devices.clone()
    }

    pub async fn exit(self) {
        info!("scull: exit");
        self.devices.trim_all().await;
    }
}
