use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::{FilterInfo, MessageSink, OpenOptions, ResourceFile};

pub mod extract;
pub mod hash;
pub mod info;
pub mod list;

/// Options shared by every command that opens an archive
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Active filter rule, e.g. "doom.id.doom2" (repeatable)
    #[arg(long = "filter", value_name = "RULE")]
    pub filters: Vec<String>,

    /// TOML file with filter rules and embedded-archive hints
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Refuse to treat loose files as one-entry archives
    #[arg(long)]
    pub container_only: bool,
}

impl FilterArgs {
    fn open_options(&self) -> anyhow::Result<OpenOptions> {
        let mut info = match &self.config {
            Some(path) => FilterInfo::load(path)
                .with_context(|| format!("reading filter config {}", path.display()))?,
            None => FilterInfo::new(),
        };
        info.game_type_filters.extend(self.filters.iter().cloned());

        Ok(OpenOptions::new()
            .filter(info)
            .container_only(self.container_only)
            .sink(MessageSink::tracing()))
    }

    /// Open `path` as a directory or as an archive file.
    pub fn open(&self, path: &Path) -> anyhow::Result<ResourceFile> {
        let options = self.open_options()?;
        if path.is_dir() {
            return Ok(ResourceFile::open_directory(path, &options)?);
        }
        ResourceFile::open_with(path, &options)?
            .with_context(|| format!("{} is not a recognised archive", path.display()))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List archive entries
    List {
        /// Archive file or directory
        archive: PathBuf,

        /// Show sizes, compression and flags
        #[arg(short, long)]
        detailed: bool,

        /// Print the listing as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the directory identity hash
    Hash {
        /// Archive file or directory
        archive: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Extract entries to a directory
    Extract {
        /// Archive file or directory
        archive: PathBuf,

        /// Output directory
        destination: PathBuf,

        /// Extract a single entry by name
        #[arg(long)]
        entry: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show format, entry count and embedded archives
    Info {
        /// Archive file or directory
        archive: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::List {
                archive,
                detailed,
                json,
                filter,
            } => list::execute(&filter.open(archive)?, *detailed, *json),
            Commands::Hash { archive, filter } => hash::execute(&filter.open(archive)?),
            Commands::Extract {
                archive,
                destination,
                entry,
                filter,
            } => extract::execute(&mut filter.open(archive)?, destination, entry.as_deref()),
            Commands::Info { archive, filter } => info::execute(&filter.open(archive)?),
        }
    }
}
