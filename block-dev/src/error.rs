use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[display(fmt = "block {} is out of range ({} blocks)", block_id, blocks)]
    OutOfRange { block_id: usize, blocks: usize },
    #[display(fmt = "buffer of {} bytes isn't a whole block", _0)]
    BadBuffer(usize),
    /// 传输的字节数不足一块
    #[display(fmt = "short transfer on block {}", _0)]
    ShortTransfer(usize),
    /// 底层介质报错
    #[display(fmt = "I/O failure on block {}", _0)]
    Io(usize),
}
