//! 以宿主机上的镜像文件模拟块设备。

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use block_dev::{sanity_check, BlockDevice, DeviceError};
use simple_fs::BLOCK_SIZE;

#[derive(Debug)]
pub struct Disk {
    file: Mutex<File>,
    blocks: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl Disk {
    /// 打开（必要时创建）镜像文件，并把它截断或扩展到`blocks`块
    pub fn open(path: impl AsRef<Path>, blocks: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        fd.set_len((blocks * BLOCK_SIZE) as u64)?;
        log::info!("open {:?}: {blocks} blocks", path.as_ref());

        Ok(Self::new(fd, blocks))
    }

    /// 打开已有的镜像文件，块数由文件大小决定
    pub fn open_existing(path: impl AsRef<Path>) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        let blocks = (fd.metadata()?.len() / BLOCK_SIZE as u64) as usize;
        log::info!("open {:?}: {blocks} blocks", path.as_ref());

        Ok(Self::new(fd, blocks))
    }

    fn new(fd: File, blocks: usize) -> Self {
        Self {
            file: Mutex::new(fd),
            blocks,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// 关闭镜像，报告累计的读写块数
    pub fn close(self) -> io::Result<()> {
        let file = self
            .file
            .into_inner()
            .map_err(|_| io::Error::other("poisoned disk lock"))?;
        file.sync_all()?;
        log::info!(
            "{} disk block reads, {} disk block writes",
            self.reads.load(Ordering::Relaxed),
            self.writes.load(Ordering::Relaxed)
        );

        Ok(())
    }
}

impl BlockDevice for Disk {
    #[inline]
    fn block_count(&self) -> usize {
        self.blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        sanity_check(block_id, buf.len(), self.blocks)?;

        let mut file = self.file.lock().map_err(|_| DeviceError::Io(block_id))?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(|err| {
                log::error!("reading block {block_id}: {err}");
                match err.kind() {
                    io::ErrorKind::UnexpectedEof => DeviceError::ShortTransfer(block_id),
                    _ => DeviceError::Io(block_id),
                }
            })?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        sanity_check(block_id, buf.len(), self.blocks)?;

        let mut file = self.file.lock().map_err(|_| DeviceError::Io(block_id))?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.write_all(buf))
            .map_err(|err| {
                log::error!("writing block {block_id}: {err}");
                match err.kind() {
                    io::ErrorKind::WriteZero => DeviceError::ShortTransfer(block_id),
                    _ => DeviceError::Io(block_id),
                }
            })?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}
