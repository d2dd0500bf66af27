//! `statfs`
//!
//! Prints the superblock geometry and allocation counters of the mounted
//! filesystem.
use anyhow::bail;
use colored::Colorize;

use crate::context::Context;

pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    if !argv.is_empty() {
        bail!("usage: statfs");
    }
    let fs = context.fs_mut()?;
    let sb = *fs.superblock();
    let st = fs.statfs();
    println!("{}", "superblock".bold());
    println!("  magic            {}", st.magic);
    println!("  block size       {}", st.block_size);
    println!("  blocks           {}", sb.zone_count);
    println!("  imap blocks      {}", sb.imap_blocks);
    println!("  zmap blocks      {}", sb.zmap_blocks);
    println!("  inode table      {}", sb.inode_table_blocks());
    println!("  first data zone  {}", sb.first_data_zone);
    println!("{}", "usage".bold());
    println!(
        "  data blocks      {} used / {} free / {} total",
        st.total_blocks - st.free_blocks,
        st.free_blocks,
        st.total_blocks
    );
    println!(
        "  inodes           {} used / {} free / {} total",
        st.total_inodes - st.free_inodes,
        st.free_inodes,
        st.total_inodes
    );
    println!("  max name length  {}", st.max_name_len);
    Ok(())
}
