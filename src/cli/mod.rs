pub mod doctor;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gallery")]
#[command(version)]
#[command(about = "A small media gallery backed by S3-compatible storage", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "gallery.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Keep uploads in memory instead of object storage
        #[arg(long)]
        memory: bool,
    },
    /// Check configuration and storage access
    Doctor,
}
