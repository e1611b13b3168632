//! CLI module for Pageflow
//!
//! Provides command-line interface parsing for the `pageflow` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod commands;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pageflow - client-side navigation engine
///
/// Inspect the route table derived from a pageflow.toml and replay
/// navigations against a headless runtime.
#[derive(Parser, Debug)]
#[command(
    name = "pageflow",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Pageflow - client-side navigation engine",
    long_about = "Inspect the route table derived from pageflow.toml and replay navigations\n\
                  against a headless runtime, without a browser.",
    after_help = "EXAMPLES:\n    \
                  pageflow init                              # Write a starter pageflow.toml\n    \
                  pageflow routes                            # List the derived route table\n    \
                  pageflow check                             # Validate the configuration\n    \
                  pageflow simulate /chat.html @back         # Replay navigations\n    \
                  pageflow simulate --authenticated /files.html\n    \
                  pageflow simulate --redirect-file .pageflow/redirect.json /chat.html"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "pageflow.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter pageflow.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing pageflow.toml
        #[arg(short, long)]
        force: bool,

        /// Application title for the generated configuration
        #[arg(long, default_value = "Pageflow")]
        title: String,
    },

    /// List the route table derived from the navigation entries
    Routes {
        /// Print the routes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and report warnings
    Check,

    /// Boot the engine on a headless runtime and replay navigations
    ///
    /// Each step is a path to navigate to, `@back`, `@forward`, or
    /// `@click:<href>` to activate a link.
    Simulate {
        /// Navigation steps, in order
        steps: Vec<String>,

        /// Treat the visitor as signed in
        #[arg(short, long)]
        authenticated: bool,

        /// Replace history entries instead of pushing them
        #[arg(short, long)]
        replace: bool,

        /// Path saved before a login redirect, resumed on start
        #[arg(long)]
        saved_redirect: Option<String>,

        /// Initial document location (defaults to the home path)
        #[arg(long)]
        start_at: Option<String>,

        /// Persist the redirect-after-login slot in this JSON file across runs
        #[arg(long)]
        redirect_file: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
