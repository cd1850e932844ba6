//! Command implementations.

pub mod auth;
pub mod callback;
pub mod chat;
pub mod teams;

use std::sync::Arc;

pub use auth::handle_login;
pub use callback::handle_callback_server;
pub use chat::handle_chat;
pub use teams::{handle_channels, handle_messages, handle_run, handle_send, handle_teams};

use crate::auth::AuthManager;
use crate::cli::TargetArgs;
use crate::config::GraphTeamsConfig;
use crate::teams::{RequestDispatcher, SkipReason};

/// Everything a command needs: configuration, sessions and the dispatcher.
pub struct AppContext {
    /// Loaded configuration.
    pub config: GraphTeamsConfig,
    /// Session owner shared with the dispatcher.
    pub manager: Arc<AuthManager>,
    /// Teams operations.
    pub dispatcher: RequestDispatcher,
}

impl AppContext {
    /// Wire up the manager and dispatcher. Performs no I/O.
    ///
    /// `open_browser` controls whether the device code prompt also launches
    /// the verification page.
    pub fn new(config: GraphTeamsConfig, open_browser: bool) -> Self {
        let manager = Arc::new(AuthManager::new(
            &config,
            auth::verification_printer(open_browser),
        ));
        let dispatcher = RequestDispatcher::new(
            Arc::clone(&manager) as Arc<dyn crate::auth::SessionSource>,
            config.send.import_sender_name.clone(),
        );

        Self {
            config,
            manager,
            dispatcher,
        }
    }

    /// Team and channel IDs, preferring command-line values over configuration.
    ///
    /// Unset values come back empty; the dispatcher turns them into skips.
    pub fn target(&self, args: &TargetArgs) -> (String, String) {
        let team = args
            .team
            .clone()
            .or_else(|| self.config.target.team_id.clone())
            .unwrap_or_default();
        let channel = args
            .channel
            .clone()
            .or_else(|| self.config.target.channel_id.clone())
            .unwrap_or_default();
        (team, channel)
    }
}

/// Tell the user why an operation did not run.
pub(crate) fn print_skip(operation: &str, reason: SkipReason) {
    println!("Skipped {operation}: {reason}.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_target_overrides_configuration() {
        let mut config = GraphTeamsConfig::default();
        config.target.team_id = Some("config-team".to_string());
        config.target.channel_id = Some("config-channel".to_string());
        let ctx = AppContext::new(config, false);

        let args = TargetArgs {
            team: Some("cli-team".to_string()),
            channel: None,
        };
        assert_eq!(
            ctx.target(&args),
            ("cli-team".to_string(), "config-channel".to_string())
        );
    }

    #[test]
    fn unset_target_is_empty() {
        let ctx = AppContext::new(GraphTeamsConfig::default(), false);
        assert_eq!(ctx.target(&TargetArgs::default()), (String::new(), String::new()));
    }
}
