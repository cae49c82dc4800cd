#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* simplefs 的整体架构，自上而下 */

// 文件系统层：挂载状态以及 inode 的创建、删除、读写
mod sfs;

// 只读的磁盘检视报告
mod debug;

// 空闲块位图：挂载时由 inode 表重建，仅存在于内存
mod bitmap;

// 磁盘数据结构层：表示磁盘文件系统的数据结构及其编解码
mod layout;

// 块读写层：以块为单位加载、修改、写回
mod block_io;

mod error;

#[cfg(test)]
mod test_helper;

pub use block_dev::{BlockDevice, DeviceError, BLOCK_SIZE};

pub use self::{
    bitmap::Bitmap,
    debug::{IndirectReport, InodeReport, Report},
    error::Error,
    layout::{compute_layout, Block, BlockCodec, Inode, InodeTable, PointerTable, SuperBlock},
    sfs::SimpleFileSystem,
};

pub const MAGIC: u32 = 0xf0f03410;
/// 每个 inode 的直接索引个数
pub const POINTERS_PER_INODE: usize = 5;
/// 每个 inode 表块容纳的 inode 个数
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / Inode::SIZE;
/// 间接索引块的编号容量
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = (POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE;

pub type Result<T> = core::result::Result<T, Error>;

type DataBlock = [u8; BLOCK_SIZE];
