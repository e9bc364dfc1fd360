//! HTTP plumbing shared by outbound clients.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
