//! Authentication command handlers.

use std::sync::Arc;

use crate::auth::{open_browser, AuthMode, VerificationCallback, VerificationPrompt};
use crate::cli::commands::AppContext;
use crate::error::Result;

/// Build the callback that shows the device code to the user.
pub fn verification_printer(launch_browser: bool) -> VerificationCallback {
    Arc::new(move |prompt: &VerificationPrompt| {
        println!();
        println!("To sign in, please visit:");
        println!();
        println!("  {}", prompt.verification_uri);
        println!();
        println!("And enter code: {}", prompt.user_code);
        println!();
        println!(
            "The code expires in {} minutes.",
            prompt.expires_in.as_secs().div_ceil(60)
        );

        if launch_browser {
            if open_browser(prompt) {
                println!("Browser opened automatically.");
            } else {
                println!("Could not open browser. Please visit the URL manually.");
            }
        }
        println!();
        println!("Waiting for sign-in...");
    })
}

/// Handle the `graphteams login` command.
///
/// Forces the user delegated session so later commands in this process do
/// not prompt again.
pub async fn handle_login(ctx: &AppContext) -> Result<()> {
    println!("Signing in as a user...");

    ctx.manager.user_delegated_session().await?;

    if ctx.manager.is_ready(AuthMode::UserDelegated).await {
        println!();
        println!("Successfully signed in.");
    }
    Ok(())
}
