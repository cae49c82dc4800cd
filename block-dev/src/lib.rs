//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、U盘、镜像文件等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 所有读写都按块号做越界检查，不合法的请求不会触发任何I/O。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod error;
mod ram_disk;

pub use self::{error::DeviceError, ram_disk::RamDisk};

/// 块大小，构建期固定
pub const BLOCK_SIZE: usize = 4096;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync {
    /// 设备的总块数
    fn block_count(&self) -> usize;

    /// 读出第`block_id`块，`buf`必须恰好为一块大小
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 写入第`block_id`块，`buf`必须恰好为一块大小
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;
}

/// 读写前的合法性检查：块号不越界，缓冲区恰为一块
pub fn sanity_check(block_id: usize, buf_len: usize, blocks: usize) -> Result<(), DeviceError> {
    if block_id >= blocks {
        return Err(DeviceError::OutOfRange { block_id, blocks });
    }
    if buf_len != BLOCK_SIZE {
        return Err(DeviceError::BadBuffer(buf_len));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanity() {
        assert_eq!(sanity_check(0, BLOCK_SIZE, 1), Ok(()));
        assert_eq!(
            sanity_check(1, BLOCK_SIZE, 1),
            Err(DeviceError::OutOfRange {
                block_id: 1,
                blocks: 1
            })
        );
        assert_eq!(
            sanity_check(0, BLOCK_SIZE - 1, 1),
            Err(DeviceError::BadBuffer(BLOCK_SIZE - 1))
        );
    }
}
