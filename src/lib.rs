pub mod client;
pub mod config;
pub mod feed;
pub mod logging;
pub mod model;
pub mod persisted;
pub mod storage;
pub mod tasks;
pub mod theme;

#[cfg(feature = "tui")]
pub mod tui;
