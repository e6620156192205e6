pub mod app;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod report;
pub mod retrieve;
pub mod runtime;
pub mod source;
pub mod version;
