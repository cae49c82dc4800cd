use core::ops::{Deref, DerefMut};

use super::{get_u32, put_u32, BlockCodec};
use crate::{DataBlock, INODES_PER_BLOCK, POINTERS_PER_INODE};

/// 磁盘上的 inode：
/// - 无效的 inode 所有指针与大小均为0；
/// - 指针为0表示未分配（0号块恒为超级块）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    /// 是否在使用
    pub valid: bool,
    /// 文件字节数
    pub size: u32,
    /// 直接索引块
    pub direct: [u32; POINTERS_PER_INODE],
    /// 指向一个间接索引块
    pub indirect: u32,
}

/// 一个 inode 表块，连续存放 [`INODES_PER_BLOCK`] 个 inode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTable([Inode; INODES_PER_BLOCK]);

impl Inode {
    /// 磁盘上占据的字节数：`valid`, `size`, `direct`, `indirect`各为u32
    pub const SIZE: usize = (3 + POINTERS_PER_INODE) * 4;

    pub const EMPTY: Self = Self {
        valid: false,
        size: 0,
        direct: [0; POINTERS_PER_INODE],
        indirect: 0,
    };

    /// 新建的空文件
    #[inline]
    pub fn new_file() -> Self {
        Self {
            valid: true,
            ..Self::EMPTY
        }
    }

    /// 所有非零的直接索引
    pub fn direct_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&block_id| block_id != 0)
    }

    fn decode(raw: &[u8]) -> Self {
        let mut direct = [0; POINTERS_PER_INODE];
        for (i, block_id) in direct.iter_mut().enumerate() {
            *block_id = get_u32(raw, 8 + i * 4);
        }

        Self {
            valid: get_u32(raw, 0) != 0,
            size: get_u32(raw, 4),
            direct,
            indirect: get_u32(raw, 8 + POINTERS_PER_INODE * 4),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_u32(raw, 0, self.valid as u32);
        put_u32(raw, 4, self.size);
        for (i, &block_id) in self.direct.iter().enumerate() {
            put_u32(raw, 8 + i * 4, block_id);
        }
        put_u32(raw, 8 + POINTERS_PER_INODE * 4, self.indirect);
    }
}

impl InodeTable {
    pub const EMPTY: Self = Self([Inode::EMPTY; INODES_PER_BLOCK]);
}

impl Deref for InodeTable {
    type Target = [Inode; INODES_PER_BLOCK];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for InodeTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl BlockCodec for InodeTable {
    fn decode(raw: &DataBlock) -> Self {
        let mut table = Self::EMPTY;
        for (inode, raw) in table.iter_mut().zip(raw.chunks_exact(Inode::SIZE)) {
            *inode = Inode::decode(raw);
        }

        table
    }

    fn encode(&self, raw: &mut DataBlock) {
        for (inode, raw) in self.iter().zip(raw.chunks_exact_mut(Inode::SIZE)) {
            inode.encode(raw);
        }
    }
}
