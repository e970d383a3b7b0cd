//! Response body normalization
//!
//! A text body that parses as JSON is delivered parsed; any other text is
//! delivered unchanged. Bodies that are not text pass through as bytes.
//! A parse failure is never an error.

use crate::upload::types::UploadResponse;

pub fn normalize_body(body: Vec<u8>) -> UploadResponse {
    match String::from_utf8(body) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(value) => UploadResponse::Parsed(value),
            Err(_) => UploadResponse::Raw(text),
        },
        Err(err) => UploadResponse::Passthrough(err.into_bytes()),
    }
}
