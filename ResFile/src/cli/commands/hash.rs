//! CLI command for printing the identity hash

use crate::ResourceFile;

pub fn execute(archive: &ResourceFile) -> anyhow::Result<()> {
    println!("{}", archive.hash());
    Ok(())
}
