//! Response compression.
//!
//! # Responsibilities
//! - Pick a preset (level, size threshold) from the request path
//! - Negotiate gzip or deflate from `Accept-Encoding`
//! - Skip media that is already compressed
//!
//! # Design Decisions
//! - `x-no-compression` on the request disables compression for that response
//! - Responses that already carry `Content-Encoding` pass through untouched
//! - Bodies are buffered before compressing; this layer sits on API-sized
//!   responses, not streaming downloads

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use std::io::Write;

use crate::security::headers::{classify_path, PathClass};

pub const NO_COMPRESSION_HEADER: &str = "x-no-compression";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPreset {
    pub level: u32,
    /// Bodies smaller than this many bytes are sent as-is.
    pub threshold: usize,
}

pub const API_PRESET: CompressionPreset = CompressionPreset { level: 6, threshold: 1024 };
pub const STATIC_PRESET: CompressionPreset = CompressionPreset { level: 9, threshold: 0 };
pub const DEFAULT_PRESET: CompressionPreset = CompressionPreset { level: 6, threshold: 1024 };

pub fn preset_for(path: &str) -> CompressionPreset {
    match classify_path(path) {
        PathClass::Api => API_PRESET,
        PathClass::StaticAsset => STATIC_PRESET,
        PathClass::Other => DEFAULT_PRESET,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

/// Pick an encoding from `Accept-Encoding`, preferring gzip.
///
/// Codings with `q=0` are refused; `*` covers only codings not named explicitly.
pub fn negotiate(headers: &HeaderMap) -> Option<Encoding> {
    let mut gzip = Preference::Unlisted;
    let mut deflate = Preference::Unlisted;
    let mut wildcard = Preference::Unlisted;

    for value in headers.get_all(header::ACCEPT_ENCODING) {
        let Ok(value) = value.to_str() else { continue };
        for item in value.split(',') {
            let mut parts = item.split(';');
            let coding = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let refused = parts.any(|p| {
                let p = p.trim();
                p.strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            let preference = if refused { Preference::Refused } else { Preference::Accepted };
            match coding.as_str() {
                "gzip" | "x-gzip" => gzip = preference,
                "deflate" => deflate = preference,
                "*" => wildcard = preference,
                _ => {}
            }
        }
    }

    // `*` only speaks for codings the client did not name.
    let allowed = |preference: Preference| match preference {
        Preference::Accepted => true,
        Preference::Refused => false,
        Preference::Unlisted => wildcard == Preference::Accepted,
    };

    if allowed(gzip) {
        Some(Encoding::Gzip)
    } else if allowed(deflate) {
        Some(Encoding::Deflate)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preference {
    Unlisted,
    Accepted,
    Refused,
}

/// Whether a response content type is worth compressing.
pub fn is_compressible(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    if mime == "image/svg+xml" {
        return true;
    }
    if mime.starts_with("image/") || mime.starts_with("video/") || mime.starts_with("audio/") || mime.starts_with("font/") {
        return false;
    }
    !matches!(
        mime.as_str(),
        "application/zip"
            | "application/gzip"
            | "application/x-gzip"
            | "application/x-rar-compressed"
            | "application/vnd.rar"
            | "application/x-7z-compressed"
            | "application/pdf"
            | "application/font-woff"
            | "application/font-woff2"
            | "application/vnd.ms-fontobject"
    )
}

pub fn encode(encoding: Encoding, level: u32, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let level = Compression::new(level.min(9));
    match encoding {
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
        Encoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}

/// Middleware compressing eligible responses.
pub async fn compress_response(request: Request<Body>, next: Next) -> Response {
    let opted_out = request.headers().contains_key(NO_COMPRESSION_HEADER);
    let encoding = negotiate(request.headers());
    let preset = preset_for(request.uri().path());
    let is_head = request.method() == Method::HEAD;

    let response = next.run(request).await;

    let Some(encoding) = encoding else {
        return response;
    };
    if opted_out || is_head || !should_compress(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body for compression");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if bytes.len() < preset.threshold.max(1) {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let compressed = match encode(encoding, preset.level, &bytes) {
        Ok(compressed) => compressed,
        Err(e) => {
            tracing::warn!(error = %e, encoding = encoding.as_str(), "Compression failed, sending identity");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .append(header::VARY, HeaderValue::from_static("accept-encoding"));

    Response::from_parts(parts, Body::from(compressed))
}

fn should_compress(response: &Response) -> bool {
    let status = response.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED || status.is_informational() {
        return false;
    }
    if response.headers().contains_key(header::CONTENT_ENCODING) {
        return false;
    }
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    is_compressible(content_type)
}
