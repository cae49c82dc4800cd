use clap::{Parser, Subcommand};
use simple_fs::BLOCK_SIZE;
use std::path::PathBuf;
use typed_bytesize::ByteSizeIec;

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    #[arg(long, short)]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create (or resize) the image and format it
    Format {
        /// Total blocks of the image
        #[arg(long, short, default_value_t = default_blocks())]
        blocks: usize,
    },
    /// Report the super block and every valid inode
    Debug,
    /// Copy host files into new inodes
    Pack {
        /// Host files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write the content of an inode to stdout
    Cat {
        #[arg(long, short = 'n')]
        inode: u32,
    },
    /// Print the size of an inode
    Stat {
        #[arg(long, short = 'n')]
        inode: u32,
    },
    /// Remove an inode and release its blocks
    Remove {
        #[arg(long, short = 'n')]
        inode: u32,
    },
}

/// 默认 4MiB 的镜像
fn default_blocks() -> usize {
    ByteSizeIec::mib(4).0 as usize / BLOCK_SIZE
}
