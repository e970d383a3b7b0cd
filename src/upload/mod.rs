//! Multipart upload with progress reporting
//!
//! This module builds the multipart body for one upload, drives it through a
//! transport and normalizes the response.

pub mod multipart;
pub mod operations;
pub mod response;
pub mod types;

pub use multipart::{MultipartForm, Part};
pub use operations::{request, upload, UploadClient};
pub use response::normalize_body;
pub use types::{
    UploadConfig, UploadFile, UploadOutcome, UploadProgress, UploadResponse, UploadState,
};
