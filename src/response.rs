// File: response.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use reqwest::header::{HeaderMap, AGE, CACHE_CONTROL, CONTENT_LENGTH};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;

pub const X_CACHE: &str = "x-cache";

/// Headers copied into reports.
pub const CACHE_HEADER_SUBSET: &[&str] = &[
    "x-cache",
    "x-cache-hits",
    "cf-cache-status",
    "x-cache-status",
    "x-served-by",
    "cache-control",
    "age",
    "expires",
    "vary",
    "content-length",
];

#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    url: String,
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(url: String, status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        ResponseSnapshot {
            url,
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes as received.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded for pattern matching; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Header value, with non-ASCII (obs-text) bytes decoded lossily.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// `X-Cache` value, `None` when absent or empty.
    pub fn x_cache(&self) -> Option<Cow<'_, str>> {
        self.header(X_CACHE).filter(|v| !v.trim().is_empty())
    }

    pub fn has_cache_control(&self) -> bool {
        self.has_header(CACHE_CONTROL.as_str())
    }

    pub fn has_age(&self) -> bool {
        self.has_header(AGE.as_str())
    }

    /// Declared length, falling back to the body size.
    pub fn content_length(&self) -> usize {
        self.header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.body.len())
    }

    pub fn cache_headers(&self) -> BTreeMap<String, String> {
        CACHE_HEADER_SUBSET
            .iter()
            .filter_map(|name| self.header(name).map(|v| (name.to_string(), v.to_string())))
            .collect()
    }

    pub fn body_sha256(&self) -> String {
        let digest = Sha256::digest(&self.body);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
