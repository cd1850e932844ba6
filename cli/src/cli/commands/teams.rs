//! Teams, channel and message command handlers.
//!
//! - [`handle_run`] - the end-to-end walk-through (`graphteams run`)
//! - [`handle_teams`] - list teams (`graphteams teams`)
//! - [`handle_channels`] - list channels (`graphteams channels`)
//! - [`handle_messages`] - recent messages (`graphteams messages`)
//! - [`handle_send`] - post one message (`graphteams send`)

use chrono::Local;

use crate::auth::AuthMode;
use crate::cli::commands::{chat, print_skip, AppContext};
use crate::cli::TargetArgs;
use crate::error::Result;
use crate::teams::{Channel, ChannelMessage, Delivery, Dispatch, Team};

/// Handle `graphteams run`.
///
/// Lists teams, then the target team's channels, then the target channel's
/// recent messages, and finally opens the interactive send prompt. Steps
/// whose target is not configured are skipped.
pub async fn handle_run(ctx: &AppContext, target: &TargetArgs, top: usize) -> Result<()> {
    handle_teams(ctx).await?;

    let (team_id, channel_id) = ctx.target(target);
    if team_id.trim().is_empty() {
        println!();
        println!("TARGET_TEAM_ID is not set. Skipping channels, messages and sending.");
        return Ok(());
    }

    println!();
    handle_channels(ctx, target).await?;

    if channel_id.trim().is_empty() {
        println!();
        println!("TARGET_CHANNEL_ID is not set. Skipping messages and sending.");
        return Ok(());
    }

    println!();
    handle_messages(ctx, target, top).await?;

    println!();
    chat::handle_chat(ctx, target).await
}

/// Handle `graphteams teams`.
pub async fn handle_teams(ctx: &AppContext) -> Result<()> {
    let teams = ctx.dispatcher.list_teams().await?;

    if teams.is_empty() {
        println!("No teams are visible to the application.");
        return Ok(());
    }

    println!("Teams:");
    for team in &teams {
        print_team(team);
    }
    Ok(())
}

/// Handle `graphteams channels`.
pub async fn handle_channels(ctx: &AppContext, target: &TargetArgs) -> Result<()> {
    let (team_id, _) = ctx.target(target);

    match ctx.dispatcher.list_channels(&team_id).await? {
        Dispatch::Skipped(reason) => print_skip("channel listing", reason),
        Dispatch::Completed(channels) if channels.is_empty() => {
            println!("Team '{team_id}' has no channels.");
        },
        Dispatch::Completed(channels) => {
            println!("Channels of team '{team_id}':");
            for channel in &channels {
                print_channel(channel);
            }
        },
    }
    Ok(())
}

/// Handle `graphteams messages`.
pub async fn handle_messages(ctx: &AppContext, target: &TargetArgs, top: usize) -> Result<()> {
    let (team_id, channel_id) = ctx.target(target);

    match ctx
        .dispatcher
        .list_channel_messages(&team_id, &channel_id, top)
        .await?
    {
        Dispatch::Skipped(reason) => print_skip("message listing", reason),
        Dispatch::Completed(messages) if messages.is_empty() => {
            println!("Channel '{channel_id}' has no messages.");
        },
        Dispatch::Completed(messages) => {
            println!(
                "Latest {} messages of channel '{channel_id}':",
                messages.len()
            );
            for message in &messages {
                println!("  {}", format_message(message));
            }
        },
    }
    Ok(())
}

/// Handle `graphteams send`.
pub async fn handle_send(ctx: &AppContext, target: &TargetArgs, text: &str) -> Result<()> {
    let (team_id, channel_id) = ctx.target(target);

    match ctx
        .dispatcher
        .send_message(&team_id, &channel_id, text)
        .await?
    {
        Dispatch::Skipped(reason) => print_skip("message send", reason),
        Dispatch::Completed(delivery) => print_delivery(&delivery),
    }
    Ok(())
}

pub(crate) fn print_delivery(delivery: &Delivery) {
    match delivery.mode {
        AuthMode::UserDelegated => println!("Message sent (ID: {}).", delivery.message_id),
        AuthMode::ServiceIdentity => println!(
            "Message posted as an import by the application (ID: {}).",
            delivery.message_id
        ),
    }
}

fn print_team(team: &Team) {
    println!("  - {} (ID: {})", team.display_name, team.id);
    if let Some(description) = team.description.as_deref().filter(|d| !d.is_empty()) {
        println!("    {description}");
    }
}

fn print_channel(channel: &Channel) {
    println!("  - {} (ID: {})", channel.display_name, channel.id);
    if let Some(description) = channel.description.as_deref().filter(|d| !d.is_empty()) {
        println!("    {description}");
    }
}

fn format_message(message: &ChannelMessage) -> String {
    let timestamp = message.created_at.map_or_else(
        || "unknown time".to_string(),
        |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    );
    format!(
        "[{timestamp}] {}: {}",
        message.sender, message.plain_text_body
    )
}
