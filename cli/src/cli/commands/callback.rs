//! Callback listener command handler.

use crate::auth::callback;
use crate::cli::commands::AppContext;
use crate::error::Result;

/// Handle the `graphteams callback-server` command.
///
/// Runs until Ctrl-C.
pub async fn handle_callback_server(ctx: &AppContext, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(ctx.config.callback.port);

    println!(
        "Listening for sign-in redirects on http://localhost:{port}{}",
        callback::CALLBACK_PATH
    );
    println!("Press Ctrl-C to stop.");

    callback::serve(port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
}
