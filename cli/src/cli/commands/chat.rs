//! Interactive send prompt.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::commands::teams::print_delivery;
use crate::cli::commands::{print_skip, AppContext};
use crate::cli::TargetArgs;
use crate::error::Result;
use crate::teams::Dispatch;

/// What a line typed at the prompt means.
#[derive(Debug, PartialEq, Eq)]
pub enum PromptInput<'a> {
    /// `exit` or `quit`, in any case.
    Exit,
    /// Nothing but whitespace.
    Blank,
    /// Text to send.
    Message(&'a str),
}

/// Classify one line of prompt input.
pub fn classify_input(line: &str) -> PromptInput<'_> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        PromptInput::Exit
    } else if trimmed.is_empty() {
        PromptInput::Blank
    } else {
        PromptInput::Message(line.trim_end_matches(['\r', '\n']))
    }
}

/// Handle `graphteams chat`.
///
/// Reads messages from stdin until `exit`, `quit` or end of input. A failed
/// send is reported and the prompt continues; if the failure means the
/// sign-in is no longer valid, the cached sessions are dropped so the next
/// send signs in again.
pub async fn handle_chat(ctx: &AppContext, target: &TargetArgs) -> Result<()> {
    let (team_id, channel_id) = ctx.target(target);

    println!("Interactive send.");
    println!("  Type \"exit\" or \"quit\" to stop.");
    println!("  Blank lines are not sent.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Message: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let text = match classify_input(&line) {
            PromptInput::Exit => break,
            PromptInput::Blank => {
                println!("Empty message skipped.");
                println!();
                continue;
            },
            PromptInput::Message(text) => text,
        };

        match ctx.dispatcher.send_message(&team_id, &channel_id, text).await {
            Ok(Dispatch::Completed(delivery)) => print_delivery(&delivery),
            Ok(Dispatch::Skipped(reason)) => print_skip("message send", reason),
            Err(e) => {
                eprintln!("Error: {e}");
                if e.requires_reauth() {
                    ctx.manager.reset().await;
                    println!("You will be asked to sign in again on the next message.");
                }
                println!("Enter the next message.");
            },
        }
        println!();
    }

    println!("Leaving interactive send.");
    Ok(())
}
