use std::sync::Arc;

use rand::Rng;
use scull::device::{
    read_to_end, write_all, AccessMode, Config, DeviceError, FileOperations, ScullDevices,
};
use scull::storage::{StorageError, StoreConfig};

fn devices(quantum: usize, qset: usize) -> Arc<ScullDevices> {
    Arc::new(
        ScullDevices::new(Config {
            nr_devs: 4,
            first_minor: 0,
            store: StoreConfig::new(quantum, qset),
        })
        .unwrap(),
    )
}

fn random_data(count: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..10)).collect()
}

#[tokio::test]
async fn test_write_then_reopen_and_read() {
    let devices = devices(4000, 1000);
    let data = random_data(10);

    let mut file = devices.open(0, AccessMode::ReadWrite).await.unwrap();
    assert_eq!(write_all(devices.as_ref(), &mut file, &data).await.unwrap(), 10);
    devices.release(file).await.unwrap();

    let mut file = devices.open(0, AccessMode::ReadWrite).await.unwrap();
    let read = read_to_end(devices.as_ref(), &mut file, 10).await.unwrap();
    devices.release(file).await.unwrap();

    assert_eq!(read.as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_single_call_is_clamped_to_block() {
    let devices = devices(4, 2);
    let file = devices.open(1, AccessMode::ReadWrite).await.unwrap();

    let mut offset = 2;
    let n = devices.write(&file, b"abcdef", &mut offset).await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(offset, 4);

    let mut buf = [0u8; 8];
    let mut offset = 0;
    let n = devices.read(&file, &mut buf, &mut offset).await.unwrap();
    assert_eq!(n, 4);
    assert_eq!(&buf[..4], &[0, 0, b'a', b'b']);
}

#[tokio::test]
async fn test_read_at_end_of_data() {
    let devices = devices(4, 2);
    let mut file = devices.open(2, AccessMode::ReadWrite).await.unwrap();
    write_all(devices.as_ref(), &mut file, b"xyz").await.unwrap();

    let mut buf = [0u8; 4];
    let mut offset = 3;
    assert_eq!(devices.read(&file, &mut buf, &mut offset).await.unwrap(), 0);
    assert_eq!(offset, 3);

    let mut offset = 1000;
    assert_eq!(devices.read(&file, &mut buf, &mut offset).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_writers_on_disjoint_regions() {
    let devices = devices(16, 4);
    let writers = 8u8;
    let region = 50usize;

    let mut handles = Vec::new();
    for i in 0..writers {
        let devices = devices.clone();
        handles.push(tokio::spawn(async move {
            let mut file = devices.open(3, AccessMode::ReadWrite).await?;
            file.seek(i as u64 * region as u64);
            let written = write_all(devices.as_ref(), &mut file, &vec![i; region]).await?;
            devices.release(file).await?;
            Ok::<usize, DeviceError>(written)
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), region);
    }

    let stats = devices.stat(3).await.unwrap();
    assert_eq!(stats.size, writers as u64 * region as u64);

    let mut file = devices.open(3, AccessMode::ReadOnly).await.unwrap();
    let data = read_to_end(devices.as_ref(), &mut file, 1000).await.unwrap();
    assert_eq!(data.len(), writers as usize * region);
    for (i, chunk) in data.chunks(region).enumerate() {
        assert!(chunk.iter().all(|b| *b == i as u8), "region {} corrupted", i);
    }
}

#[tokio::test]
async fn test_write_only_open_truncates_for_other_sessions() {
    let devices = devices(4, 2);

    let mut reader = devices.open(0, AccessMode::ReadWrite).await.unwrap();
    write_all(devices.as_ref(), &mut reader, b"old contents").await.unwrap();
    reader.seek(0);

    let writer = devices.open(0, AccessMode::WriteOnly).await.unwrap();
    let data = read_to_end(devices.as_ref(), &mut reader, 64).await.unwrap();
    assert!(data.is_empty());

    devices.release(writer).await.unwrap();
    devices.release(reader).await.unwrap();
}

#[tokio::test]
async fn test_memory_ceiling_surfaces_enomem() {
    let devices = Arc::new(
        ScullDevices::new(Config {
            nr_devs: 1,
            first_minor: 0,
            store: StoreConfig::new(4, 2).max_bytes(8),
        })
        .unwrap(),
    );

    let mut file = devices.open(0, AccessMode::WriteOnly).await.unwrap();
    let err = write_all(devices.as_ref(), &mut file, &[1u8; 12])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Storage(StorageError::AllocationFailure(_))
    ));
    assert_eq!(file.pos, 8);
    assert_eq!(devices.stat(0).await.unwrap().size, 8);
}

