//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::teams::DEFAULT_MESSAGE_COUNT;

/// Recent messages shown by `run`.
pub const RUN_MESSAGE_COUNT: usize = 5;

/// Microsoft Teams from the terminal.
///
/// Lists teams, channels and channel messages through Microsoft Graph as the
/// app registration, and posts messages as the signed-in user.
#[derive(Parser, Debug)]
#[command(name = "graphteams")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the config file.
    #[arg(short, long, global = true, env = "GRAPHTEAMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Team and channel selection, overriding `TARGET_TEAM_ID` / `TARGET_CHANNEL_ID`.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Team ID.
    #[arg(long)]
    pub team: Option<String>,

    /// Channel ID.
    #[arg(long)]
    pub channel: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List teams, then channels and recent messages of the target, then
    /// start an interactive send prompt.
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of recent messages to show.
        #[arg(long, default_value_t = RUN_MESSAGE_COUNT)]
        top: usize,
    },

    /// List teams visible to the application.
    Teams,

    /// List channels of the target team.
    Channels {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the most recent messages of the target channel.
    Messages {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of messages to show.
        #[arg(short = 'n', long, default_value_t = DEFAULT_MESSAGE_COUNT)]
        top: usize,
    },

    /// Post a message to the target channel.
    Send {
        /// Message text.
        text: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Post messages interactively. Type `exit` or `quit` to stop.
    Chat {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Sign in as a user with a device code.
    Login {
        /// Don't open the browser automatically.
        #[arg(long)]
        no_browser: bool,
    },

    /// Serve the local OAuth redirect page until interrupted.
    CallbackServer {
        /// Port to listen on. Defaults to the configured port.
        #[arg(short, long)]
        port: Option<u16>,
    },
}
