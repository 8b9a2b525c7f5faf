// agent: Library entry point.
// Exposes modules for integration testing.

pub mod config;
pub mod dedup;
pub mod gateway;
pub mod poll;
pub mod scheduler;
pub mod status_http;
pub mod sync;
