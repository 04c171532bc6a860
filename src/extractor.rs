// File: extractor.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Harvests directories that look like static-asset locations from markup.
//!
//! The keyword check is a heuristic: `/static/css` is kept because it names
//! a typical cacheable asset folder, not because anything proves it is one.

use crate::http::Http;
use crate::target::TargetUrl;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

pub type StaticDirectories = BTreeSet<String>;

pub const STATIC_KEYWORDS: &[&str] = &["static", "css", "js", "images", "img", "assets"];

static ATTRIBUTE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:href|src|action|data-src|poster|srcset)\s*=\s*["']?(/[^"'\s>]*)"#)
        .expect("attribute regex")
});

pub fn extract_from_html(body: &str) -> StaticDirectories {
    let mut directories = StaticDirectories::new();
    for capture in ATTRIBUTE_PATH.captures_iter(body) {
        if let Some(path) = capture.get(1) {
            collect_directories(path.as_str(), &mut directories);
        }
    }
    directories
}

fn collect_directories(raw: &str, out: &mut StaticDirectories) {
    // Protocol-relative links point at another host.
    if raw.starts_with("//") {
        return;
    }
    let path = raw.split(['?', '#']).next().unwrap_or_default();

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if !path.ends_with('/') && segments.last().is_some_and(|last| last.contains('.')) {
        segments.pop();
    }

    let mut prefix = String::new();
    for segment in segments {
        if segment == "." || segment == ".." {
            break;
        }
        prefix.push('/');
        prefix.push_str(segment);
        if is_static_like(&prefix) {
            out.insert(prefix.clone());
        }
    }
}

fn is_static_like(prefix: &str) -> bool {
    let lower = prefix.to_ascii_lowercase();
    STATIC_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Extraction over an already fetched body plus the site root.
pub struct StaticExtractor<'a> {
    http: &'a Http,
}

impl<'a> StaticExtractor<'a> {
    pub fn new(http: &'a Http) -> Self {
        StaticExtractor { http }
    }

    /// Never fails; an unreachable root only costs the root's directories.
    pub async fn extract(&self, body: &str, target: &TargetUrl) -> StaticDirectories {
        let mut directories = extract_from_html(body);
        debug!("{} static directories found in target body", directories.len());

        let root = target.root_url();
        match self.http.get(&root, self.http.authenticated_headers()).await {
            Ok(response) => {
                let from_root = extract_from_html(&response.text());
                debug!("{} static directories found at {}", from_root.len(), root);
                directories.extend(from_root);
            }
            Err(e) => warn!("Could not fetch root path (/): {}", e),
        }
        directories
    }

    /// Fetches the target page first, then delegates to [`extract`](Self::extract).
    pub async fn discover(&self, target: &TargetUrl) -> StaticDirectories {
        let body = match self
            .http
            .get(target.as_str(), self.http.authenticated_headers())
            .await
        {
            Ok(response) => response.text().into_owned(),
            Err(e) => {
                warn!("Initial request to {} failed: {}", target, e);
                String::new()
            }
        };
        self.extract(&body, target).await
    }
}
