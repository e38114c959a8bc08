pub mod closure;
pub mod config;
pub mod db;
pub mod filter;
pub mod graph;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod store;
pub mod tui;
pub mod watch;
