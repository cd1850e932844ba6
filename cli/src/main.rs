//! graphteams - Microsoft Teams through Microsoft Graph
//!
//! Signs in as the app registration (client credentials) or as a user
//! (device code) and lists teams, channels and messages or posts messages.

mod auth;
mod cli;
mod client;
mod config;
mod error;
mod teams;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::RUN_MESSAGE_COUNT;
use crate::cli::commands::{self, AppContext};
use crate::cli::{Cli, Commands, TargetArgs};
use crate::config::settings::env;
use crate::error::{GraphTeamsError, Result};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_LEVEL)
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;

    let open_browser = !matches!(cli.command, Some(Commands::Login { no_browser: true }));
    let ctx = AppContext::new(config, open_browser);

    match cli.command {
        None => commands::handle_run(&ctx, &TargetArgs::default(), RUN_MESSAGE_COUNT).await,
        Some(Commands::Run { target, top }) => commands::handle_run(&ctx, &target, top).await,
        Some(Commands::Teams) => commands::handle_teams(&ctx).await,
        Some(Commands::Channels { target }) => commands::handle_channels(&ctx, &target).await,
        Some(Commands::Messages { target, top }) => {
            commands::handle_messages(&ctx, &target, top).await
        },
        Some(Commands::Send { text, target }) => commands::handle_send(&ctx, &target, &text).await,
        Some(Commands::Chat { target }) => commands::handle_chat(&ctx, &target).await,
        Some(Commands::Login { .. }) => commands::handle_login(&ctx).await,
        Some(Commands::CallbackServer { port }) => {
            commands::handle_callback_server(&ctx, port).await
        },
    }
}

fn report(err: &GraphTeamsError) {
    eprintln!("Error: {err}");

    if err.is_permission_missing() {
        eprintln!();
        eprintln!("The app registration may lack a Microsoft Graph permission for this call.");
        eprintln!("Check its API permissions (for example Team.ReadBasic.All,");
        eprintln!("Channel.ReadBasic.All, ChannelMessage.Read.All) and that admin consent");
        eprintln!("has been granted.");
    }
}
