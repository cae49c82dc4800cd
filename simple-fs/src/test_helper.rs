pub use block_dev::{BlockDevice, DeviceError, RamDisk};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::SimpleFileSystem;

/// 可以让指定块的读或写失败的内存盘
pub struct FaultyDisk {
    pub inner: RamDisk,
    fail_read: AtomicUsize,
    fail_write: AtomicUsize,
}

impl FaultyDisk {
    const NONE: usize = usize::MAX;

    pub fn new(blocks: usize) -> Self {
        Self {
            inner: RamDisk::new(blocks),
            fail_read: AtomicUsize::new(Self::NONE),
            fail_write: AtomicUsize::new(Self::NONE),
        }
    }

    pub fn fail_read_of(&self, block_id: Option<u32>) {
        self.fail_read
            .store(block_id.map_or(Self::NONE, |id| id as usize), Ordering::Relaxed);
    }

    pub fn fail_write_of(&self, block_id: Option<u32>) {
        self.fail_write
            .store(block_id.map_or(Self::NONE, |id| id as usize), Ordering::Relaxed);
    }
}

impl BlockDevice for FaultyDisk {
    fn block_count(&self) -> usize {
        self.inner.block_count()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if self.fail_read.load(Ordering::Relaxed) == block_id {
            return Err(DeviceError::Io(block_id));
        }
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        if self.fail_write.load(Ordering::Relaxed) == block_id {
            return Err(DeviceError::Io(block_id));
        }
        self.inner.write_block(block_id, buf)
    }
}

/// 格式化并挂载一个内存盘
pub fn mounted_ram_disk(blocks: usize) -> (Arc<RamDisk>, SimpleFileSystem) {
    let disk = Arc::new(RamDisk::new(blocks));
    let mut sfs = SimpleFileSystem::new();
    sfs.format(&*disk).unwrap();
    sfs.mount(disk.clone()).unwrap();

    (disk, sfs)
}

pub fn mounted_faulty_disk(blocks: usize) -> (Arc<FaultyDisk>, SimpleFileSystem) {
    let disk = Arc::new(FaultyDisk::new(blocks));
    let mut sfs = SimpleFileSystem::new();
    sfs.format(&*disk).unwrap();
    sfs.mount(disk.clone()).unwrap();

    (disk, sfs)
}

/// 由位置决定的字节序列
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
