//! multipart/form-data encoding
//!
//! The form keeps its parts in insertion order: the file part is appended
//! first, then every extra field in the order the caller supplied them.

use crate::upload::types::{UploadFile, DEFAULT_MIME_TYPE};

/// File name used for a binary part that carries no name of its own
pub const ANONYMOUS_FILE_NAME: &str = "blob";

const CRLF: &[u8] = b"\r\n";

/// A single named part of the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn file(name: impl Into<String>, file: UploadFile) -> Self {
        Self {
            name: name.into(),
            file_name: Some(
                file.file_name
                    .unwrap_or_else(|| ANONYMOUS_FILE_NAME.to_string()),
            ),
            content_type: Some(
                file.mime_type
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            ),
            data: file.data,
        }
    }

    fn write_headers(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"Content-Disposition: form-data; name=\"");
        out.extend_from_slice(escape_header_value(&self.name).as_bytes());
        out.push(b'"');
        if let Some(file_name) = &self.file_name {
            out.extend_from_slice(b"; filename=\"");
            out.extend_from_slice(escape_header_value(file_name).as_bytes());
            out.push(b'"');
        }
        out.extend_from_slice(CRLF);
        if let Some(content_type) = &self.content_type {
            out.extend_from_slice(b"Content-Type: ");
            out.extend_from_slice(content_type.as_bytes());
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(CRLF);
    }
}

/// Ordered multipart form with its boundary
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(gen_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn file(mut self, name: impl Into<String>, file: UploadFile) -> Self {
        self.parts.push(Part::file(name, file));
        self
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::text(name, value));
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact length of the encoded body
    pub fn encoded_len(&self) -> usize {
        let delimiter = 2 + self.boundary.len() + CRLF.len();
        let parts: usize = self
            .parts
            .iter()
            .map(|part| {
                let mut headers = Vec::new();
                part.write_headers(&mut headers);
                delimiter + headers.len() + part.data.len() + CRLF.len()
            })
            .sum();
        parts + 2 + self.boundary.len() + 2 + CRLF.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(CRLF);
            part.write_headers(&mut out);
            out.extend_from_slice(&part.data);
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--");
        out.extend_from_slice(CRLF);
        out
    }
}

fn gen_boundary() -> String {
    format!(
        "----upload-request-{:016x}{:016x}",
        fastrand::u64(..),
        fastrand::u64(..)
    )
}

// Quotes, CR and LF would terminate the quoted header value early.
fn escape_header_value(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
