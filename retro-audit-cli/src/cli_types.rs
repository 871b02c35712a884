//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use retro_audit_lib::{DisplayMode, StatusFilter};

#[derive(Parser)]
#[command(name = "retro-audit")]
#[command(about = "Audit ROM collections against No-Intro/Redump DAT files", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (defaults to ~/.config/retro-audit/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the local ROM records come from.
#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
pub(crate) struct RomSourceArgs {
    /// Folder containing ROM files
    #[arg(short, long)]
    pub roms: Option<PathBuf>,

    /// JSON file of previously saved ROM records
    #[arg(long)]
    pub roms_json: Option<PathBuf>,
}

/// Options for the `audit` command.
#[derive(Args, Clone)]
pub(crate) struct AuditArgs {
    /// DAT file to audit against (Logiqx XML or ClrMamePro)
    #[arg(short, long)]
    pub dat: PathBuf,

    #[command(flatten)]
    pub source: RomSourceArgs,

    /// Display mode: flat, pclone or 1g1r
    #[arg(short, long)]
    pub mode: Option<DisplayMode>,

    /// Statuses to show, comma-separated (e.g., have,miss) or "all"
    #[arg(short, long)]
    pub filter: Option<StatusFilter>,

    /// Ignore file extensions when comparing filenames
    #[arg(long)]
    pub no_ext: bool,

    /// Compute CRC32 for every file so renamed dumps still match
    #[arg(long)]
    pub hash: bool,

    /// Never match by checksum
    #[arg(long, conflicts_with = "hash")]
    pub no_checksums: bool,

    /// Only print the summary, not the ROM list
    #[arg(short, long)]
    pub summary: bool,

    /// Save the ROM records and the audit as JSON into this folder
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Base file name used with --save
    #[arg(long, default_value = "romset")]
    pub set_name: String,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Audit a ROM folder against a DAT file
    Audit(AuditArgs),

    /// Show the header and parent/clone statistics of a DAT file
    DatInfo {
        /// DAT file to inspect
        dat: PathBuf,
    },

    /// Show the effective audit settings
    Config,
}
