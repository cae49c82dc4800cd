//! 间接索引块：整个块连续存储**块编号**，每个编号都指向一个**数据块**，
//! 0 表示该项尚未分配。

use core::ops::{Deref, DerefMut};

use super::{get_u32, put_u32, BlockCodec};
use crate::{DataBlock, POINTERS_PER_BLOCK};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerTable([u32; POINTERS_PER_BLOCK]);

impl PointerTable {
    pub const EMPTY: Self = Self([0; POINTERS_PER_BLOCK]);

    /// 所有非零项
    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied().filter(|&block_id| block_id != 0)
    }
}

impl Deref for PointerTable {
    type Target = [u32; POINTERS_PER_BLOCK];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PointerTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl BlockCodec for PointerTable {
    fn decode(raw: &DataBlock) -> Self {
        let mut table = Self::EMPTY;
        for (i, block_id) in table.iter_mut().enumerate() {
            *block_id = get_u32(raw, i * 4);
        }

        table
    }

    fn encode(&self, raw: &mut DataBlock) {
        for (i, &block_id) in self.iter().enumerate() {
            put_u32(raw, i * 4, block_id);
        }
    }
}
