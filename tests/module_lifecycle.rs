use scull::device::{write_all, AccessMode, FileOperations};
use scull::{Config, ScullError, ScullModule};

#[tokio::test]
async fn test_init_creates_configured_devices() {
    let mut config = Config::new(16, 8, 3);
    config.minor = 2;

    let module = ScullModule::init(config).unwrap();
    let devices = module.devices();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices.minors().collect::<Vec<_>>(), vec![2, 3, 4]);

    let stats = devices.stat(4).await.unwrap();
    assert_eq!(stats.quantum, 16);
    assert_eq!(stats.qset, 8);
    assert_eq!(stats.size, 0);

    module.exit().await;
}

#[tokio::test]
async fn test_exit_releases_all_memory() {
    let module = ScullModule::init(Config::new(8, 2, 2)).unwrap();
    let devices = module.devices();

    for minor in devices.minors().collect::<Vec<_>>() {
        let mut file = devices.open(minor, AccessMode::WriteOnly).await.unwrap();
        write_all(devices.as_ref(), &mut file, &[0x5A; 100]).await.unwrap();
        devices.release(file).await.unwrap();
        assert_eq!(devices.stat(minor).await.unwrap().size, 100);
    }

    module.exit().await;

    for minor in devices.minors().collect::<Vec<_>>() {
        let stats = devices.stat(minor).await.unwrap();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.segments, 0);
        assert_eq!(stats.allocated_bytes, 0);
    }
}

#[test]
fn test_init_rejects_invalid_parameters() {
    assert!(matches!(
        ScullModule::init(Config::new(0, 1000, 4)),
        Err(ScullError::InvalidConfig(_))
    ));
    assert!(matches!(
        ScullModule::init(Config::new(4000, 1000, 0)),
        Err(ScullError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_geometry_change_reverts_on_truncate() {
    let module = ScullModule::init(Config::new(8, 2, 1)).unwrap();
    let devices = module.devices();
    let dev = devices.device(0).unwrap();

    dev.set_geometry(32, 4).await.unwrap();
    assert_eq!(dev.stats().await.quantum, 32);

    let file = devices.open(0, AccessMode::WriteOnly).await.unwrap();
    devices.release(file).await.unwrap();
    assert_eq!(dev.stats().await.quantum, 8);
    assert_eq!(dev.stats().await.qset, 2);
}
