//! 只读的磁盘检视：报告超级块以及每个有效 inode 的大小与块指针。
//! 不要求挂载，也不修改任何块。

use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;

use crate::block_io;
use crate::layout::{InodeTable, PointerTable, SuperBlock};
use crate::{Result, INODES_PER_BLOCK};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub super_block: SuperBlock,
    /// 按编号升序排列的有效 inode
    pub inodes: Vec<InodeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeReport {
    pub id: u32,
    pub size: u32,
    /// 非零的直接索引
    pub direct: Vec<u32>,
    pub indirect: Option<IndirectReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectReport {
    /// 间接索引块自身
    pub block: u32,
    /// 其中非零的项
    pub entries: Vec<u32>,
}

impl Report {
    pub fn inspect(block_device: &dyn BlockDevice) -> Result<Self> {
        let super_block: SuperBlock = block_io::read(block_device, 0)?;

        let mut inodes = Vec::new();
        if !super_block.is_valid() {
            return Ok(Self {
                super_block,
                inodes,
            });
        }

        // 损坏的超级块可能声称比设备更大的 inode 表
        let table_end = super_block
            .inode_blocks
            .min(block_device.block_count().saturating_sub(1) as u32);
        for table_block in 1..=table_end {
            let table: InodeTable = block_io::read(block_device, table_block)?;

            for (slot, inode) in table.iter().enumerate().filter(|(_, inode)| inode.valid) {
                let indirect = match inode.indirect {
                    0 => None,
                    block => {
                        let pointers: PointerTable = block_io::read(block_device, block)?;
                        Some(IndirectReport {
                            block,
                            entries: pointers.blocks().collect(),
                        })
                    }
                };

                inodes.push(InodeReport {
                    id: (table_block - 1) * INODES_PER_BLOCK as u32 + slot as u32,
                    size: inode.size,
                    direct: inode.direct_blocks().collect(),
                    indirect,
                });
            }
        }

        Ok(Self {
            super_block,
            inodes,
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let super_block = &self.super_block;
        writeln!(f, "SuperBlock:")?;
        writeln!(
            f,
            "    magic number is {}",
            if super_block.is_valid() { "valid" } else { "invalid" }
        )?;
        writeln!(f, "    {} blocks", super_block.blocks)?;
        writeln!(f, "    {} inode blocks", super_block.inode_blocks)?;
        writeln!(f, "    {} inodes", super_block.inodes)?;

        for inode in &self.inodes {
            writeln!(f, "Inode {}:", inode.id)?;
            writeln!(f, "    size: {} bytes", inode.size)?;
            write!(f, "    direct blocks:")?;
            for block in &inode.direct {
                write!(f, " {block}")?;
            }
            writeln!(f)?;

            if let Some(indirect) = &inode.indirect {
                writeln!(f, "    indirect block: {}", indirect.block)?;
                write!(f, "    indirect data blocks:")?;
                for block in &indirect.entries {
                    write!(f, " {block}")?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}
