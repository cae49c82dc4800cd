//! # 空闲块位图
//!
//! 每块一位，置1表示已占用。位图从不落盘：
//! 每次挂载都扫描整个 inode 表重建，卸载时随挂载状态一并释放，
//! 因此它始终与 inode 表中记录的指针保持一致。

use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::block_io;
use crate::layout::{InodeTable, PointerTable, SuperBlock};
use crate::{Error, Result, MAX_FILE_SIZE};

/// 位图内的一组
type BitGroup = u64;

const GROUP_BITS: usize = BitGroup::BITS as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    groups: Vec<BitGroup>,
    /// 位图所指示的总块数
    blocks: usize,
}

impl Bitmap {
    /// 所有块均空闲的位图
    pub fn new(blocks: usize) -> Self {
        let mut groups = vec![0; blocks.div_ceil(GROUP_BITS)];

        // 末组中超出总块数的位视作已占用，永远不会被分配
        let tail = blocks % GROUP_BITS;
        if tail != 0 {
            if let Some(last) = groups.last_mut() {
                *last = BitGroup::MAX << tail;
            }
        }

        Self { groups, blocks }
    }

    /// 扫描 inode 表，重建空闲块位图：
    /// 超级块与 inode 表块恒占用，
    /// 有效 inode 直接或经间接索引块引用的块均占用，其余块空闲。
    /// 有效 inode 的大小也不能超出文件上限。
    pub fn rebuild(block_device: &dyn BlockDevice, super_block: &SuperBlock) -> Result<Self> {
        let mut bitmap = Self::new(super_block.blocks as usize);
        bitmap.set(0);

        for table_block in 1..=super_block.inode_blocks {
            bitmap.set(table_block as usize);

            let table: InodeTable = block_io::read(block_device, table_block)?;
            for inode in table.iter().filter(|inode| inode.valid) {
                if inode.size as usize > MAX_FILE_SIZE {
                    log::warn!("inode size {} exceeds {MAX_FILE_SIZE} bytes", inode.size);
                    return Err(Error::DataConsistency);
                }

                for block_id in inode.direct_blocks() {
                    bitmap.claim(block_id, super_block)?;
                }

                if inode.indirect != 0 {
                    bitmap.claim(inode.indirect, super_block)?;
                    let pointers: PointerTable = block_io::read(block_device, inode.indirect)?;
                    for block_id in pointers.blocks() {
                        bitmap.claim(block_id, super_block)?;
                    }
                }
            }
        }

        Ok(bitmap)
    }

    /// 首次适配：分配编号最小的空闲块。
    /// 若无空闲块，则返回空。
    pub fn alloc(&mut self) -> Option<u32> {
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != BitGroup::MAX).then_some((group_index, bits.trailing_ones()))
                })?;

        self.groups[group_index] |= 1 << ingroup_index;
        Some((group_index * GROUP_BITS + ingroup_index as usize) as u32)
    }

    pub fn release(&mut self, block_id: u32) {
        if block_id as usize >= self.blocks {
            log::warn!("releasing block {block_id} beyond {} blocks", self.blocks);
            return;
        }

        let (group_index, ingroup_index) = Self::decode(block_id as usize);
        // 编号一定得有对应的位
        debug_assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "releasing free block {block_id}"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    #[inline]
    pub fn is_free(&self, block_id: u32) -> bool {
        let block_id = block_id as usize;
        let (group_index, ingroup_index) = Self::decode(block_id);
        block_id < self.blocks && self.groups[group_index] & (1 << ingroup_index) == 0
    }

    /// 空闲块个数
    pub fn free_count(&self) -> usize {
        self.groups
            .iter()
            .map(|bits| bits.count_zeros() as usize)
            .sum()
    }

    #[inline]
    fn set(&mut self, block_id: usize) {
        let (group_index, ingroup_index) = Self::decode(block_id);
        self.groups[group_index] |= 1 << ingroup_index;
    }

    /// 登记一个被 inode 引用的块。
    /// 引用越界、指向保留区或被重复引用时，说明 inode 表已损坏。
    fn claim(&mut self, block_id: u32, super_block: &SuperBlock) -> Result<()> {
        if block_id <= super_block.inode_blocks || !self.is_free(block_id) {
            log::warn!("block {block_id} can't be referenced by an inode");
            return Err(Error::DataConsistency);
        }

        self.set(block_id as usize);
        Ok(())
    }

    #[inline]
    fn decode(block_id: usize) -> (usize, usize) {
        (block_id / GROUP_BITS, block_id % GROUP_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit() {
        let mut bitmap = Bitmap::new(130);
        assert_eq!(bitmap.free_count(), 130);

        for i in 0..130 {
            assert_eq!(bitmap.alloc(), Some(i));
        }
        assert_eq!(bitmap.alloc(), None);
        assert_eq!(bitmap.free_count(), 0);

        bitmap.release(70);
        bitmap.release(3);
        assert!(bitmap.is_free(3));
        assert!(!bitmap.is_free(4));
        // 编号最小者优先
        assert_eq!(bitmap.alloc(), Some(3));
        assert_eq!(bitmap.alloc(), Some(70));
        assert_eq!(bitmap.alloc(), None);
    }

    #[test]
    fn tail_never_allocated() {
        let mut bitmap = Bitmap::new(3);
        assert_eq!(bitmap.free_count(), 3);
        assert!(!bitmap.is_free(3));
        assert!(!bitmap.is_free(64));

        bitmap.set(1);
        assert_eq!(bitmap.alloc(), Some(0));
        assert_eq!(bitmap.alloc(), Some(2));
        assert_eq!(bitmap.alloc(), None);
    }
}
