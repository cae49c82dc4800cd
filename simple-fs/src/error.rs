use block_dev::DeviceError;
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 块号、inode 编号越界，或设备尺寸不可用
    #[display(fmt = "invalid argument")]
    InvalidArgument,
    #[display(fmt = "file system isn't mounted")]
    NotMounted,
    #[display(fmt = "file system is already mounted")]
    AlreadyMounted,
    /// 魔数不符或几何信息自相矛盾
    #[display(fmt = "corrupt super block")]
    CorruptSuperBlock,
    #[display(fmt = "device I/O error: {}", _0)]
    DeviceIo(DeviceError),
    /// inode 表或数据块耗尽
    #[display(fmt = "out of space")]
    OutOfSpace,
    /// 目标 inode 未被使用
    #[display(fmt = "invalid inode")]
    InvalidInode,
    /// 记录的大小范围内出现未分配的块，或指针指向非法位置
    #[display(fmt = "data consistency error")]
    DataConsistency,
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Self::DeviceIo(err)
    }
}
