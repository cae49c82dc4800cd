mod cli;

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command};
use simple_fs::{Report, SimpleFileSystem};
use simple_fs_fuse::Disk;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let disk = Arc::new(match cli.command {
        Command::Format { blocks } => Disk::open(&cli.image, blocks)?,
        _ => Disk::open_existing(&cli.image)?,
    });

    let result = run(cli.command, &disk);
    Arc::try_unwrap(disk)
        .map_err(|_| io::Error::other("disk is still mounted"))?
        .close()?;

    result
}

fn run(command: Command, disk: &Arc<Disk>) -> io::Result<()> {
    match command {
        Command::Format { blocks } => {
            SimpleFileSystem::new().format(&**disk).map_err(fs_error)?;
            println!("formatted {blocks} blocks");
        }
        Command::Debug => {
            print!("{}", Report::inspect(&**disk).map_err(fs_error)?);
        }
        Command::Pack { files } => {
            let mut sfs = mount(disk)?;
            for path in files {
                let data = fs::read(&path)?;
                let inode = sfs.create().map_err(fs_error)?;
                let written = sfs.write(inode, &data, 0).map_err(fs_error)?;
                if written < data.len() {
                    log::warn!("{path:?}: only {written} of {} bytes packed", data.len());
                }
                println!("{path:?} -> inode {inode} ({written} bytes)");
            }
        }
        Command::Cat { inode } => {
            let sfs = mount(disk)?;
            let mut data = vec![0; sfs.stat(inode).map_err(fs_error)? as usize];
            let read = sfs.read(inode, &mut data, 0).map_err(fs_error)?;
            io::stdout().write_all(&data[..read])?;
        }
        Command::Stat { inode } => {
            let sfs = mount(disk)?;
            println!("inode {inode}: {} bytes", sfs.stat(inode).map_err(fs_error)?);
        }
        Command::Remove { inode } => {
            let mut sfs = mount(disk)?;
            sfs.remove(inode).map_err(fs_error)?;
            println!("inode {inode} removed");
        }
    }

    Ok(())
}

fn mount(disk: &Arc<Disk>) -> io::Result<SimpleFileSystem> {
    let mut sfs = SimpleFileSystem::new();
    sfs.mount(disk.clone()).map_err(fs_error)?;
    Ok(sfs)
}

fn fs_error(err: simple_fs::Error) -> io::Error {
    io::Error::other(err.to_string())
}
