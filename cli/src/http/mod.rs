//! HTTP client for the management service

pub mod api;
pub mod client;
pub mod progress;
pub mod releases;

pub use api::ManagementApi;
pub use client::{ClientOptions, HttpClient};
pub use progress::ProgressFn;
