//! XP3 CLI library
//!
//! This library provides the core functionality for the xp3 CLI tool.

pub mod commands;
pub mod output;

// Re-export command handlers
pub use crate::commands::{
    create::handle as handle_create, extract::handle as handle_extract,
    list::handle as handle_list,
};

use std::path::PathBuf;

use clap::{Args, Subcommand};
use xp3_crypto::{KeyService, XorKey, parse_key_hex, parse_title};

#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of an archive
    List {
        /// Archive path
        archive: PathBuf,

        /// Show sizes, flags and timestamps as a table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Extract an archive into a directory
    Extract {
        /// Archive path
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Pack files and directories into a new archive
    Create {
        /// Archive to write
        archive: PathBuf,

        /// Files and directories to pack; directories are walked
        /// recursively and their contents named relative to them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Store payloads verbatim instead of deflating them
        #[arg(long)]
        no_compress: bool,

        #[command(flatten)]
        keys: KeyArgs,
    },
}

/// Key selection shared by commands that touch protected archives.
#[derive(Args, Clone, Debug)]
pub struct KeyArgs {
    /// Game title whose key to use (e.g. nekopara-vol1)
    #[arg(short, long)]
    pub game: Option<String>,

    /// Explicit key as two hex bytes, primary then initial (e.g. 9c2f)
    #[arg(short, long, conflicts_with = "game")]
    pub key: Option<String>,

    /// Extra key file or directory to load (csv, tsv or txt)
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

impl KeyArgs {
    /// Resolve the selected key, if any.
    ///
    /// An explicit `--key` wins; otherwise `--game` is looked up in the
    /// built-in keys plus whatever `--key-file` and the environment
    /// provide. No selection at all resolves to `None`.
    pub fn resolve(&self) -> anyhow::Result<Option<XorKey>> {
        if let Some(hex) = &self.key {
            return parse_key_hex(hex).map(Some).map_err(anyhow::Error::msg);
        }

        let Some(game) = &self.game else {
            return Ok(None);
        };

        let mut service = KeyService::new();
        service.load_from_env()?;
        if let Some(path) = &self.key_file {
            service.load_key_file(path)?;
        }

        let title = parse_title(game).map_err(anyhow::Error::msg)?;
        Ok(Some(service.require_key(&title)?))
    }
}
