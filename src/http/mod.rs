//! HTTP client module
//!
//! Provides HTTP client functionality for talking to engine containers.

mod client;

pub use client::{HttpClient, HttpError, HttpResponse};
