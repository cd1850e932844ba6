//! Authentication module for graphteams.
//!
//! This module provides the two Microsoft identity platform flows graphteams
//! acts under (client credentials for the app itself, device code for a
//! signed-in user) and the [`AuthManager`] that turns them into memoized
//! Graph sessions.

pub mod authority;
pub mod callback;
pub mod credentials;
pub mod device_flow;
pub mod manager;
pub mod provider;
pub mod scopes;
pub mod tokens;

pub use device_flow::{open_browser, VerificationCallback, VerificationPrompt};
pub use manager::{AuthManager, SessionSource};
pub use provider::TokenAuthProvider;
pub use tokens::{AuthMode, TokenSet};
