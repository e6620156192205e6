//! HTTP client module with status classification and streamed downloads.

mod client;
mod status;

pub use client::{HttpClient, HttpSettings};
