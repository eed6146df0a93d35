//! Backend API module for the upload queue.
//!
//! Provides the HTTP client with auth header injection, the upload
//! operation the queue replays against, and the request/response types of
//! the upload endpoint.

pub mod client;
pub mod types;
pub mod upload;

pub use client::ApiClient;
pub use types::{PhotoUploadOptions, UploadedFile};
pub use upload::HttpUploader;
