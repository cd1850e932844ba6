//! HTTP client for Microsoft Graph.

pub mod graph;
pub mod middleware;

pub use graph::{GraphClient, TeamsApi};
