#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod comments;
pub mod config;
pub mod data;
pub mod format;
pub mod markdown;
pub mod navigator;
pub mod reddit;
pub mod screen;
pub mod session;
pub mod storage;
pub mod template;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
