use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::file::{AccessMode, OpenFile};
use crate::Result;

/// The file operations a scull device answers to.
///
/// `read` and `write` transfer at most one block per call and advance
/// `offset` by the number of bytes moved; a return of 0 from `read` means
/// end of data.
#[async_trait]
pub trait FileOperations: Send + Sync {
    async fn open(&self, minor: u32, mode: AccessMode) -> Result<OpenFile>;

    async fn release(&self, file: OpenFile) -> Result<()>;

    async fn read(&self, file: &OpenFile, buf: &mut [u8], offset: &mut u64) -> Result<usize>;

    async fn write(&self, file: &OpenFile, data: &[u8], offset: &mut u64) -> Result<usize>;
}

/// Writes `data` at the file position, re-issuing clamped writes until all
/// of it is stored. Advances the file position.
pub async fn write_all<F>(ops: &F, file: &mut OpenFile, data: &[u8]) -> Result<usize>
where
    F: FileOperations + ?Sized,
{
    let mut written = 0;
    while written < data.len() {
        let mut pos = file.pos;
        let n = ops.write(file, &data[written..], &mut pos).await?;
        file.pos = pos;
        if n == 0 {
            break;
        }
        written += n;
    }
    Ok(written)
}

/// Largest buffer handed to a single `read` call by [`read_to_end`].
const READ_CHUNK: usize = 64 * 1024;

/// Reads up to `max` bytes from the file position, stopping early at end of
/// data or at a hole. Advances the file position.
///
/// Memory grows with the bytes actually returned, not with `max`.
pub async fn read_to_end<F>(ops: &F, file: &mut OpenFile, max: usize) -> Result<Bytes>
where
    F: FileOperations + ?Sized,
{
    let mut out = BytesMut::new();
    let mut chunk = vec![0u8; max.min(READ_CHUNK)];
    while out.len() < max {
        let want = (max - out.len()).min(chunk.len());
        let mut pos = file.pos;
        let n = ops.read(file, &mut chunk[..want], &mut pos).await?;
        file.pos = pos;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out.freeze())
}
