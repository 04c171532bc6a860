// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems detected before any request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid header format '{0}'. Use 'Name: Value' format")]
    InvalidHeader(String),

    #[error("Wordlist file not found: {}", .0.display())]
    WordlistNotFound(PathBuf),

    #[error("Error reading wordlist {}: {source}", path.display())]
    WordlistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Wordlist {} contains no delimiters", .0.display())]
    EmptyWordlist(PathBuf),

    #[error("Extension list is empty")]
    EmptyExtensions,

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Worker count must be at least 1")]
    InvalidWorkers,
}

/// Outcome of a single failed GET.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timeout: {url}")]
    Timeout { url: String },

    #[error("Error requesting {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}
