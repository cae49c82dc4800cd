use super::{get_u32, put_u32, BlockCodec};
use crate::{DataBlock, Error, INODES_PER_BLOCK, MAGIC};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录 inode 表的位置与容量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u32,
    /// 文件系统占据块数
    pub blocks: u32,
    /// inode 表占据块数
    pub inode_blocks: u32,
    /// inode 容量
    pub inodes: u32,
}

/// 由总块数算出 inode 表块数以及 inode 容量：
/// 十分之一（向上取整）的块留给 inode 表。
///
/// 调用者须保证`total_blocks >= 3`（超级块、至少一个 inode 表块与数据块）。
/// inode 容量超出 u32 时返回空。
pub fn compute_layout(total_blocks: u32) -> Option<(u32, u32)> {
    debug_assert!(total_blocks >= 3);

    let inode_blocks = total_blocks.div_ceil(10);
    let inodes = inode_blocks.checked_mul(INODES_PER_BLOCK as u32)?;
    Some((inode_blocks, inodes))
}

impl SuperBlock {
    pub fn new(blocks: u32) -> Option<Self> {
        let (inode_blocks, inodes) = compute_layout(blocks)?;

        Some(Self {
            magic: MAGIC,
            blocks,
            inode_blocks,
            inodes,
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// 挂载前检查几何信息是否自洽，`device_blocks`为设备实际块数
    pub fn verify(&self, device_blocks: usize) -> Result<(), Error> {
        let reason = if !self.is_valid() {
            "bad magic number"
        } else if self.inode_blocks as u64 * INODES_PER_BLOCK as u64 > self.inodes as u64 {
            "inode capacity is smaller than the inode table"
        } else if self.blocks < 3 {
            "too few blocks"
        } else if self.inode_blocks < self.blocks / 10 {
            "inode table is too small"
        } else if self.inode_blocks >= self.blocks {
            "no room for data blocks"
        } else if self.blocks as usize > device_blocks {
            "larger than the device"
        } else {
            return Ok(());
        };

        log::warn!("reject super block {self:?}: {reason}");
        Err(Error::CorruptSuperBlock)
    }
}

impl BlockCodec for SuperBlock {
    fn decode(raw: &DataBlock) -> Self {
        Self {
            magic: get_u32(raw, 0),
            blocks: get_u32(raw, 4),
            inode_blocks: get_u32(raw, 8),
            inodes: get_u32(raw, 12),
        }
    }

    fn encode(&self, raw: &mut DataBlock) {
        raw.fill(0);
        put_u32(raw, 0, self.magic);
        put_u32(raw, 4, self.blocks);
        put_u32(raw, 8, self.inode_blocks);
        put_u32(raw, 12, self.inodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(compute_layout(100), Some((10, 1280)));
        assert_eq!(compute_layout(3), Some((1, 128)));
        assert_eq!(compute_layout(101), Some((11, 11 * 128)));
        assert_eq!(compute_layout(200), Some((20, 20 * 128)));

        // inode 容量恰好不超过 u32
        assert_eq!(
            compute_layout(335_544_310),
            Some((33_554_431, 33_554_431 * 128))
        );
        assert_eq!(compute_layout(335_544_311), None);
        assert_eq!(compute_layout(u32::MAX), None);
    }

    #[test]
    fn verify() {
        assert_eq!(SuperBlock::new(100).unwrap().verify(100), Ok(()));
        // 镜像比设备大
        assert_eq!(
            SuperBlock::new(100).unwrap().verify(99),
            Err(Error::CorruptSuperBlock)
        );

        let mut super_block = SuperBlock::new(100).unwrap();
        super_block.magic = 0;
        assert_eq!(super_block.verify(100), Err(Error::CorruptSuperBlock));

        let mut super_block = SuperBlock::new(100).unwrap();
        super_block.inodes -= 1;
        assert_eq!(super_block.verify(100), Err(Error::CorruptSuperBlock));

        let mut super_block = SuperBlock::new(100).unwrap();
        super_block.inode_blocks = 9;
        super_block.inodes = 9 * INODES_PER_BLOCK as u32;
        assert_eq!(super_block.verify(100), Err(Error::CorruptSuperBlock));

        let mut super_block = SuperBlock::new(100).unwrap();
        super_block.blocks = 2;
        assert_eq!(super_block.verify(100), Err(Error::CorruptSuperBlock));

        // inode 表占满整个文件系统，没有数据块
        let mut super_block = SuperBlock::new(10).unwrap();
        super_block.inode_blocks = 10;
        super_block.inodes = 10 * INODES_PER_BLOCK as u32;
        assert_eq!(super_block.verify(10), Err(Error::CorruptSuperBlock));
        super_block.inode_blocks = 9;
        super_block.inodes = 9 * INODES_PER_BLOCK as u32;
        assert_eq!(super_block.verify(10), Ok(()));
    }
}
