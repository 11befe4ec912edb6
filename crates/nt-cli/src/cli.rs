use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ntops",
    about = "NoteWriter operation log: record operations and compact them into packs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file listing repositories and log settings
    #[arg(short, long, global = true, default_value = "ntops.toml")]
    pub config: PathBuf,

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
    /// Record an operation in a repository's log
    Append(AppendArgs),
    /// Compact pending operations into pack files
    Flush(FlushArgs),
    /// Show pending operations and packs per repository
    Status(StatusArgs),
    /// Decode and print the operations stored in a pack file
    Inspect(InspectArgs),
    /// Generate an object identifier
    Oid(OidArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    /// Repository slug
    #[arg(short, long)]
    pub repo: String,
    /// Operation kind, e.g. review-flashcard
    #[arg(short, long)]
    pub name: String,
    /// Identifier of the object the operation applies to
    #[arg(short, long)]
    pub object: String,
    /// Extra payload as a JSON document
    #[arg(long)]
    pub extras: Option<String>,
}

#[derive(Args)]
pub struct FlushArgs {
    /// Repository slug; every repository when omitted
    #[arg(short, long)]
    pub repo: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct InspectArgs {
    pub pack: PathBuf,
}

#[derive(Args)]
pub struct OidArgs {
    /// Derive the identifier from this text instead of generating a random one
    #[arg(long)]
    pub from: Option<String>,
}
