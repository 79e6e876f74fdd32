pub mod app;
pub mod client;
pub mod config;
pub mod report;

pub use client::LayerHubClient;
pub use report::MonadStatsSchema;
