//! # 文件系统层
//!
//! 持有挂载状态：块设备的引用、超级块的拷贝以及空闲块位图。
//! 文件仅以 inode 编号寻址，每次修改 inode 后立即写回其所在的 inode 表块。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::bitmap::Bitmap;
use crate::block_io;
use crate::debug::Report;
use crate::layout::{Block, Inode, InodeTable, PointerTable, SuperBlock};
use crate::{DataBlock, Error, Result};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, MAX_FILE_SIZE, POINTERS_PER_INODE};

const SUPER_BLOCK_ID: u32 = 0;

/// simplefs 的句柄，同一时刻至多挂载一个设备
#[derive(Debug, Default)]
pub struct SimpleFileSystem {
    mounted: Option<Mounted>,
}

/// 挂载期间才存在的状态，卸载时整体丢弃
struct Mounted {
    block_device: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
    free_blocks: Bitmap,
}

impl SimpleFileSystem {
    pub const fn new() -> Self {
        Self { mounted: None }
    }

    /// 在设备上建立文件系统：写入超级块，其余块全部清零。
    /// 总块数取自设备本身；不会挂载。
    pub fn format(&self, block_device: &dyn BlockDevice) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        let super_block = u32::try_from(block_device.block_count())
            .ok()
            .filter(|&blocks| blocks >= 3)
            .and_then(SuperBlock::new)
            .ok_or(Error::InvalidArgument)?;
        let blocks = super_block.blocks;
        log::debug!("format: {super_block:?}");

        block_io::store(block_device, SUPER_BLOCK_ID, &Block::from(super_block))?;
        let zeroed = Block::zeroed();
        for block_id in 1..blocks {
            block_io::store(block_device, block_id, &zeroed)?;
        }

        Ok(())
    }

    /// 校验超级块并挂载设备，随后重建空闲块位图。
    /// 任一步失败都不会挂载。
    pub fn mount(&mut self, block_device: Arc<dyn BlockDevice>) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        let super_block: SuperBlock = block_io::read(&*block_device, SUPER_BLOCK_ID)?;
        super_block.verify(block_device.block_count())?;
        let free_blocks = Bitmap::rebuild(&*block_device, &super_block)?;
        log::debug!(
            "mount: {super_block:?}, {} free blocks",
            free_blocks.free_count()
        );

        self.mounted = Some(Mounted {
            block_device,
            super_block,
            free_blocks,
        });

        Ok(())
    }

    /// 卸载设备并释放位图，未挂载时什么也不做
    pub fn unmount(&mut self) {
        if self.mounted.take().is_some() {
            log::debug!("unmount");
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// 已挂载的超级块
    pub fn super_block(&self) -> Result<&SuperBlock> {
        Ok(&self.mounted()?.super_block)
    }

    /// 当前可分配的数据块个数
    pub fn free_block_count(&self) -> Result<usize> {
        Ok(self.mounted()?.free_blocks.free_count())
    }

    /// 占用编号最小的空闲 inode，返回其编号
    pub fn create(&mut self) -> Result<u32> {
        self.mounted_mut()?.create()
    }

    /// 释放 inode 及其所有数据块与间接索引块
    pub fn remove(&mut self, inode_id: u32) -> Result<()> {
        self.mounted_mut()?.remove(inode_id)
    }

    /// 文件字节数
    pub fn stat(&self, inode_id: u32) -> Result<u32> {
        let mounted = self.mounted()?;
        let inode = mounted.load_valid_inode(mounted.inode_pos(inode_id)?)?;
        Ok(inode.size)
    }

    /// 从`offset`处读出数据填充`buf`，不超过文件末尾，返回读出的字节数
    pub fn read(&self, inode_id: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
        self.mounted()?.read(inode_id, buf, offset)
    }

    /// 把`buf`写到`offset`处，按需分配数据块，返回写入的字节数。
    /// 中途块耗尽时返回已写入的字节数，不回滚。
    pub fn write(&mut self, inode_id: u32, buf: &[u8], offset: usize) -> Result<usize> {
        self.mounted_mut()?.write(inode_id, buf, offset)
    }

    /// 已挂载设备的检视报告
    pub fn debug_report(&self) -> Result<Report> {
        Report::inspect(&*self.mounted()?.block_device)
    }

    #[inline]
    fn mounted(&self) -> Result<&Mounted> {
        self.mounted.as_ref().ok_or(Error::NotMounted)
    }

    #[inline]
    fn mounted_mut(&mut self) -> Result<&mut Mounted> {
        self.mounted.as_mut().ok_or(Error::NotMounted)
    }
}

/// inode 在磁盘上的位置：**表块ID**以及**块内槽位**
#[derive(Debug, Clone, Copy)]
struct InodePos {
    block_id: u32,
    slot: usize,
}

impl Mounted {
    fn inode_pos(&self, inode_id: u32) -> Result<InodePos> {
        let capacity = self.super_block.inode_blocks as usize * INODES_PER_BLOCK;
        if inode_id as usize >= capacity {
            return Err(Error::InvalidArgument);
        }

        Ok(InodePos {
            block_id: 1 + inode_id / INODES_PER_BLOCK as u32,
            slot: inode_id as usize % INODES_PER_BLOCK,
        })
    }

    fn load_valid_inode(&self, pos: InodePos) -> Result<Inode> {
        let inode = block_io::map(&*self.block_device, pos.block_id, |table: &InodeTable| {
            table[pos.slot]
        })?;

        if inode.valid {
            Ok(inode)
        } else {
            Err(Error::InvalidInode)
        }
    }

    /// 只替换表块中的一个槽位，同块的其它 inode 原样写回
    fn store_inode(&self, pos: InodePos, inode: &Inode) -> Result<()> {
        block_io::modify(&*self.block_device, pos.block_id, |table: &mut InodeTable| {
            table[pos.slot] = *inode;
        })
    }

    fn create(&mut self) -> Result<u32> {
        for table_block in 1..=self.super_block.inode_blocks {
            let mut table: InodeTable = block_io::read(&*self.block_device, table_block)?;
            let Some(slot) = table.iter().position(|inode| !inode.valid) else {
                continue;
            };

            table[slot] = Inode::new_file();
            block_io::write(&*self.block_device, table_block, &table)?;

            let inode_id = (table_block - 1) * INODES_PER_BLOCK as u32 + slot as u32;
            log::debug!("create: inode {inode_id}");
            return Ok(inode_id);
        }

        Err(Error::OutOfSpace)
    }

    fn remove(&mut self, inode_id: u32) -> Result<()> {
        let pos = self.inode_pos(inode_id)?;
        let inode = self.load_valid_inode(pos)?;

        let mut released: Vec<u32> = inode.direct_blocks().collect();
        if inode.indirect != 0 {
            block_io::map(
                &*self.block_device,
                inode.indirect,
                |pointers: &PointerTable| released.extend(pointers.blocks()),
            )?;
            released.push(inode.indirect);
        }

        // inode 落盘之后才归还位图，失败时文件保持原样
        self.store_inode(pos, &Inode::EMPTY)?;
        for &block_id in &released {
            self.free_blocks.release(block_id);
        }
        log::debug!("remove: inode {inode_id}, {} blocks released", released.len());

        Ok(())
    }

    fn read(&self, inode_id: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
        let inode = self.load_valid_inode(self.inode_pos(inode_id)?)?;

        let size = inode.size as usize;
        if offset >= size {
            return Ok(0);
        }

        let mut start = offset;
        let end = offset.saturating_add(buf.len()).min(size);
        // 间接索引块至多加载一次
        let mut pointers: Option<PointerTable> = None;

        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            // 当前块的逻辑索引
            let block_index = start / BLOCK_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;

            let block_id = if block_index < POINTERS_PER_INODE {
                inode.direct[block_index]
            } else if inode.indirect == 0 {
                0
            } else {
                if pointers.is_none() {
                    pointers = Some(block_io::read(&*self.block_device, inode.indirect)?);
                }
                // 记录的大小可能越过间接索引块的容量
                pointers
                    .as_ref()
                    .and_then(|pointers| pointers.get(block_index - POINTERS_PER_INODE))
                    .copied()
                    .unwrap_or(0)
            };

            // 记录的大小之内不应有未分配的块
            if block_id == 0 {
                log::warn!("inode {inode_id}: logical block {block_index} isn't allocated");
                return Err(Error::DataConsistency);
            }

            let mut data_block: DataBlock = [0; BLOCK_SIZE];
            block_io::read_raw(&*self.block_device, block_id, &mut data_block)?;
            // 绝对地址 % 块大小 = 块内偏移
            let src = &data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
            buf[read_size..read_size + block_read_size].copy_from_slice(src);

            read_size += block_read_size;
            start = current_block_end;
        }

        Ok(read_size)
    }

    fn write(&mut self, inode_id: u32, buf: &[u8], offset: usize) -> Result<usize> {
        let pos = self.inode_pos(inode_id)?;
        let mut inode = self.load_valid_inode(pos)?;

        let end = offset
            .checked_add(buf.len())
            .filter(|&end| end <= MAX_FILE_SIZE)
            .ok_or(Error::InvalidArgument)?;

        let mut start = offset;
        let mut written_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;
            let src = &buf[written_size..written_size + block_write_size];

            // 本轮新分配、且引用尚未落盘的块
            let mut fresh = Vec::new();
            let committed = self
                .write_block(&mut inode, block_index, start % BLOCK_SIZE, src, &mut fresh)
                .and_then(|()| {
                    inode.size = inode.size.max(current_block_end as u32);
                    self.store_inode(pos, &inode)
                });

            if let Err(err) = committed {
                for &block_id in &fresh {
                    self.free_blocks.release(block_id);
                }

                return match err {
                    Error::OutOfSpace if written_size > 0 => {
                        log::warn!(
                            "inode {inode_id}: out of space, {written_size} of {} bytes written",
                            buf.len()
                        );
                        Ok(written_size)
                    }
                    err => Err(err),
                };
            }

            written_size += block_write_size;
            start = current_block_end;
        }

        Ok(written_size)
    }

    /// 写入一个逻辑块内的一段数据，沿途为值为0的索引分配新块。
    ///
    /// 写入顺序为 数据块 → 间接索引块 → (调用者)inode，
    /// 任何一块的引用落盘之前，它都留在`fresh`中，供失败时归还位图。
    fn write_block(
        &mut self,
        inode: &mut Inode,
        block_index: usize,
        inner_offset: usize,
        src: &[u8],
        fresh: &mut Vec<u32>,
    ) -> Result<()> {
        let mut dirty_pointers = None;

        let block_id = if block_index < POINTERS_PER_INODE {
            match inode.direct[block_index] {
                0 => {
                    let block_id = self.alloc(fresh)?;
                    inode.direct[block_index] = block_id;
                    block_id
                }
                block_id => block_id,
            }
        } else {
            let mut pointers = match inode.indirect {
                0 => {
                    // 新的间接索引块不沿用旧内容
                    inode.indirect = self.alloc(fresh)?;
                    PointerTable::EMPTY
                }
                indirect => block_io::read(&*self.block_device, indirect)?,
            };

            let index = block_index - POINTERS_PER_INODE;
            match pointers[index] {
                0 => {
                    let block_id = self.alloc(fresh)?;
                    pointers[index] = block_id;
                    dirty_pointers = Some(pointers);
                    block_id
                }
                block_id => block_id,
            }
        };

        // 读-改-写：部分写入不能覆盖块内其余字节；新分配的块从全零开始
        let mut data_block: DataBlock = [0; BLOCK_SIZE];
        if !fresh.contains(&block_id) {
            block_io::read_raw(&*self.block_device, block_id, &mut data_block)?;
        }
        data_block[inner_offset..inner_offset + src.len()].copy_from_slice(src);
        block_io::write_raw(&*self.block_device, block_id, &data_block)?;

        if let Some(pointers) = dirty_pointers {
            block_io::write(&*self.block_device, inode.indirect, &pointers)?;
            // 已有的间接索引块落盘后，新数据块即被有效 inode 引用
            if !fresh.contains(&inode.indirect) {
                fresh.retain(|&fresh_id| fresh_id != block_id);
            }
        }

        Ok(())
    }

    #[inline]
    fn alloc(&mut self, fresh: &mut Vec<u32>) -> Result<u32> {
        let block_id = self.free_blocks.alloc().ok_or(Error::OutOfSpace)?;
        fresh.push(block_id);
        Ok(block_id)
    }
}

impl core::fmt::Debug for Mounted {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mounted")
            .field("super_block", &self.super_block)
            .field("free_blocks", &self.free_blocks.free_count())
            .finish_non_exhaustive()
    }
}
