use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tessera_types::ContentKind;

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera: content-addressed blob storage for imaging archives",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Identifier of this server instance
    #[arg(long, global = true, default_value = "default")]
    pub node_id: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the deletion worker and the HTTP endpoints
    Serve(ServeArgs),
    /// Store a file under an identifier
    Put(PutArgs),
    /// Read a blob
    Get(GetArgs),
    /// Remove a blob (queued when delayed deletion is enabled)
    Rm(RmArgs),
    /// Show the mount path used for unrecognised content
    Path(PathArgs),
    /// Show deletion statistics
    Status,
    /// Print the effective settings
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8043")]
    pub bind: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub id: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    #[arg(long, requires = "length")]
    pub offset: Option<u64>,
    #[arg(long)]
    pub length: Option<u64>,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct RmArgs {
    pub id: String,
    #[arg(long, default_value = "primary")]
    pub kind: KindArg,
}

#[derive(Args)]
pub struct PathArgs {
    pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    Primary,
    Metadata,
    Partial,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Primary => ContentKind::Primary,
            KindArg::Metadata => ContentKind::DerivedMetadata,
            KindArg::Partial => ContentKind::Partial,
        }
    }
}
