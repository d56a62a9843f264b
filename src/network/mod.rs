//! HTTP networking module
//!
//! Provides HTTP client functionality for calling marketplace APIs.

mod client;

pub use client::{HttpClient, HttpResponse};
