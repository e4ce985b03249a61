pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod rate_limiter;
pub mod scrapers;
pub mod storage;
pub mod types;

// Ports the pipeline depends on, and their real implementations
pub mod app;
pub mod infra;
