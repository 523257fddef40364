use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidforge")]
#[command(author, version, about = "Video upload and transcoding service")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides shared by the server roles.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Host to bind the HTTP server to
    #[arg(long)]
    pub host: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address of the coordinator's dispatch listener
    #[arg(long)]
    pub dispatch_addr: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the coordinating process: HTTP, job queue and worker pool
    Coordinator(ServerArgs),

    /// Run an HTTP-only process that forwards jobs to the coordinator
    Serve(ServerArgs),

    /// Mark work interrupted by a coordinator crash as failed
    ///
    /// Only run this while no coordinator is running.
    Reconcile,

    /// Create a session token for a user
    IssueSession {
        /// User id (a new one is generated when omitted)
        #[arg(long)]
        user: Option<String>,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (falls back to --config, then defaults)
        file: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
