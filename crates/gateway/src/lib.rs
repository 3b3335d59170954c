//! HTTP API over the collector: channel management, statistics history and
//! scheduler control.

pub mod channel_routes;
pub mod collector_routes;
pub mod error;
pub mod server;
pub mod state;
pub mod stats_routes;

pub use {
    error::ApiError,
    server::{build_app, serve},
    state::AppState,
};
