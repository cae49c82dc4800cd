//! # 块读写层
//!
//! 对块设备的每次访问都以整块为单位：加载到栈上的缓冲区，解码、修改、编码后写回。
//! 加载出的结构只在一次操作内有效，不在多个操作之间共享，
//! 从而不会出现同一块的多份过期拷贝。

use block_dev::BlockDevice;

use crate::layout::{Block, BlockCodec};
use crate::{DataBlock, Result, BLOCK_SIZE};

#[inline]
pub fn read_raw(block_device: &dyn BlockDevice, block_id: u32, raw: &mut DataBlock) -> Result<()> {
    block_device.read_block(block_id as usize, raw)?;
    Ok(())
}

#[inline]
pub fn write_raw(block_device: &dyn BlockDevice, block_id: u32, raw: &DataBlock) -> Result<()> {
    block_device.write_block(block_id as usize, raw)?;
    Ok(())
}

pub fn read<T: BlockCodec>(block_device: &dyn BlockDevice, block_id: u32) -> Result<T> {
    let mut raw = [0; BLOCK_SIZE];
    read_raw(block_device, block_id, &mut raw)?;
    Ok(T::decode(&raw))
}

pub fn write<T: BlockCodec>(block_device: &dyn BlockDevice, block_id: u32, value: &T) -> Result<()> {
    let mut raw = [0; BLOCK_SIZE];
    value.encode(&mut raw);
    write_raw(block_device, block_id, &raw)
}

#[inline]
pub fn map<T: BlockCodec, V>(
    block_device: &dyn BlockDevice,
    block_id: u32,
    f: impl FnOnce(&T) -> V,
) -> Result<V> {
    read(block_device, block_id).map(|value| f(&value))
}

/// 加载、修改并写回，写回失败时修改不生效
pub fn modify<T: BlockCodec, V>(
    block_device: &dyn BlockDevice,
    block_id: u32,
    f: impl FnOnce(&mut T) -> V,
) -> Result<V> {
    let mut value = read(block_device, block_id)?;
    let ret = f(&mut value);
    write(block_device, block_id, &value)?;

    Ok(ret)
}

pub fn store(block_device: &dyn BlockDevice, block_id: u32, block: &Block) -> Result<()> {
    let mut raw = [0; BLOCK_SIZE];
    block.encode(&mut raw);
    write_raw(block_device, block_id, &raw)
}
