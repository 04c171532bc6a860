// File: oracle.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Differential cache oracle.
//!
//! Request 1 carries the full header set, request 2 the same headers
//! without `Cookie` and the authentication header. A positive verdict means
//! the anonymous request observably got the authenticated response out of a
//! cache.

use crate::error::FetchError;
use crate::http::Http;
use crate::response::ResponseSnapshot;
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Vulnerable,
    NotVulnerable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFault {
    Timeout,
    NetworkError,
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSignal {
    /// Identical 200 bodies, `X-Cache` went from miss to hit.
    MissThenHit,
    /// `Cache-Control` only showed up on the anonymous 200.
    CacheControlAppeared,
    /// `Age` only showed up on the anonymous 200.
    AgeAppeared,
}

impl std::fmt::Display for CacheSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheSignal::MissThenHit => write!(f, "X-Cache miss -> hit"),
            CacheSignal::CacheControlAppeared => write!(f, "Cache-Control appeared"),
            CacheSignal::AgeAppeared => write!(f, "Age appeared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub signals: Vec<CacheSignal>,
    /// Advisory only, never part of the verdict.
    pub content_length_match: bool,
}

pub fn classify(first: &ResponseSnapshot, second: &ResponseSnapshot) -> Classification {
    let mut signals = Vec::new();
    let second_ok = second.status() == 200;

    if let (Some(first_cache), Some(second_cache)) = (first.x_cache(), second.x_cache()) {
        if first.status() == 200
            && second_ok
            && first_cache.to_lowercase().contains("miss")
            && second_cache.to_lowercase().contains("hit")
            && first.body() == second.body()
        {
            signals.push(CacheSignal::MissThenHit);
        }
    }

    if !first.has_cache_control() && second_ok && second.has_cache_control() {
        signals.push(CacheSignal::CacheControlAppeared);
    }

    if !first.has_age() && second_ok && second.has_age() {
        signals.push(CacheSignal::AgeAppeared);
    }

    let verdict = if signals.is_empty() {
        Verdict::NotVulnerable
    } else {
        Verdict::Vulnerable
    };

    Classification {
        verdict,
        signals,
        content_length_match: first.content_length() == second.content_length(),
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub url: String,
    pub first: Option<ResponseSnapshot>,
    pub second: Option<ResponseSnapshot>,
    pub verdict: Verdict,
    pub fault: Option<ProbeFault>,
    pub signals: Vec<CacheSignal>,
    pub content_length_match: Option<bool>,
    pub error: Option<String>,
}

impl ProbeResult {
    fn failed(url: &str, first: Option<ResponseSnapshot>, error: FetchError) -> Self {
        let fault = if error.is_timeout() {
            ProbeFault::Timeout
        } else {
            ProbeFault::NetworkError
        };
        ProbeResult {
            url: url.to_string(),
            first,
            second: None,
            verdict: Verdict::NotVulnerable,
            fault: Some(fault),
            signals: Vec::new(),
            content_length_match: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_vulnerable(&self) -> bool {
        self.verdict == Verdict::Vulnerable
    }

    pub fn timed_out(&self) -> bool {
        self.fault == Some(ProbeFault::Timeout)
    }

    /// `first -> second` X-Cache values for display.
    pub fn cache_transition(&self) -> String {
        let value = |snapshot: &Option<ResponseSnapshot>| {
            snapshot
                .as_ref()
                .and_then(|s| s.x_cache())
                .map(|v| v.into_owned())
                .unwrap_or_else(|| "-".to_string())
        };
        format!("{} -> {}", value(&self.first), value(&self.second))
    }
}

pub struct CacheOracle {
    http: Http,
}

impl CacheOracle {
    pub fn new(http: Http) -> Self {
        CacheOracle { http }
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    /// Never fails: faults become a `NotVulnerable` result.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        let first = match self.http.get(url, self.http.authenticated_headers()).await {
            Ok(response) => response,
            Err(e) => {
                debug!("First request failed: {}", e);
                return ProbeResult::failed(url, None, e);
            }
        };

        let second = match self.http.get(url, self.http.anonymous_headers()).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Second request failed: {}", e);
                return ProbeResult::failed(url, Some(first), e);
            }
        };

        let classification = classify(&first, &second);
        if classification.verdict == Verdict::Vulnerable {
            info!("{} classified vulnerable: {:?}", url, classification.signals);
        }

        ProbeResult {
            url: url.to_string(),
            first: Some(first),
            second: Some(second),
            verdict: classification.verdict,
            fault: None,
            signals: classification.signals,
            content_length_match: Some(classification.content_length_match),
            error: None,
        }
    }
}
