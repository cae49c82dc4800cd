//! # 磁盘数据结构层
//!
//! simplefs 的磁盘布局：
//! 超级块 | inode 表（`inode_blocks`块） | 数据块区域
//!
//! 块的内容从不原地重解释为别的类型，
//! 而是经由 [`BlockCodec`] 在固定大小的字节缓冲区上显式编解码，
//! 每种视图的解码都直接得到其自身类型；
//! [`Block`] 则是四种视图的带标签联合，用于整块写出。

mod super_block;
pub use super_block::{compute_layout, SuperBlock};

mod inode;
pub use inode::{Inode, InodeTable};

mod indirect;
pub use indirect::PointerTable;

use alloc::boxed::Box;

use derive_more::From;

use crate::{DataBlock, BLOCK_SIZE};

/// 可与一整块互相转换的磁盘结构
pub trait BlockCodec: Sized {
    fn decode(raw: &DataBlock) -> Self;
    fn encode(&self, raw: &mut DataBlock);
}

/// 一块的内容，按用途解释
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Block {
    Raw(Box<DataBlock>),
    SuperBlock(SuperBlock),
    Inodes(InodeTable),
    Pointers(PointerTable),
}

impl Block {
    /// 全零的原始块
    #[inline]
    pub fn zeroed() -> Self {
        Self::Raw(Box::new([0; BLOCK_SIZE]))
    }

    pub fn encode(&self, raw: &mut DataBlock) {
        match self {
            Self::Raw(data) => raw.copy_from_slice(&data[..]),
            Self::SuperBlock(super_block) => super_block.encode(raw),
            Self::Inodes(table) => table.encode(raw),
            Self::Pointers(table) => table.encode(raw),
        }
    }
}

/// 小端读出`raw[at..at + 4]`
#[inline]
fn get_u32(raw: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

#[inline]
fn put_u32(raw: &mut [u8], at: usize, value: u32) {
    raw[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{INODES_PER_BLOCK, MAGIC, POINTERS_PER_BLOCK};

    #[test]
    fn static_size() {
        assert_eq!(Inode::SIZE * INODES_PER_BLOCK, BLOCK_SIZE);
        assert_eq!(INODES_PER_BLOCK, 128);
        assert_eq!(POINTERS_PER_BLOCK, 1024);
    }

    #[test]
    fn super_block_bytes() {
        let mut raw = [0xffu8; BLOCK_SIZE];
        Block::from(SuperBlock::new(100).unwrap()).encode(&mut raw);

        assert_eq!(raw[0..4], MAGIC.to_le_bytes());
        assert_eq!(raw[4..8], 100u32.to_le_bytes());
        assert_eq!(raw[8..12], 10u32.to_le_bytes());
        assert_eq!(raw[12..16], 1280u32.to_le_bytes());
        // 剩余部分为填充
        assert!(raw[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn inode_bytes() {
        let mut table = InodeTable::EMPTY;
        table[1] = Inode {
            valid: true,
            size: 5000,
            direct: [11, 12, 0, 0, 0],
            indirect: 13,
        };

        let mut raw = [0u8; BLOCK_SIZE];
        table.encode(&mut raw);

        // 第0个槽位保持全零
        assert!(raw[..Inode::SIZE].iter().all(|&b| b == 0));
        let slot = &raw[Inode::SIZE..2 * Inode::SIZE];
        assert_eq!(slot[0..4], 1u32.to_le_bytes());
        assert_eq!(slot[4..8], 5000u32.to_le_bytes());
        assert_eq!(slot[8..12], 11u32.to_le_bytes());
        assert_eq!(slot[12..16], 12u32.to_le_bytes());
        assert_eq!(slot[28..32], 13u32.to_le_bytes());

        assert_eq!(InodeTable::decode(&raw), table);
    }

    #[test]
    fn tagged_views() {
        let mut pointers = PointerTable::EMPTY;
        pointers[7] = 42;

        let mut raw = [0xffu8; BLOCK_SIZE];
        Block::from(pointers.clone()).encode(&mut raw);
        assert_eq!(raw[4 * 7..4 * 8], 42u32.to_le_bytes());
        assert_eq!(get_u32(&raw, 4 * 7), 42);
        assert_eq!(PointerTable::decode(&raw), pointers);
        assert_eq!(PointerTable::decode(&raw).blocks().collect::<Vec<_>>(), [42]);

        // 原始块按字节写出
        Block::zeroed().encode(&mut raw);
        assert!(raw.iter().all(|&b| b == 0));
        let mut data = Box::new([0u8; BLOCK_SIZE]);
        data[BLOCK_SIZE - 1] = 7;
        Block::from(data).encode(&mut raw);
        assert_eq!(raw[BLOCK_SIZE - 1], 7);
    }
}
