// File: http.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ConfigParameter;
use crate::error::{ConfigError, FetchError};
use crate::response::ResponseSnapshot;
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use log::trace;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared GET client for extraction and probing.
#[derive(Debug, Clone)]
pub struct Http {
    config: ConfigParameter,
    client: reqwest::Client,
    rate_limiter: Option<Arc<DirectLimiter>>,
    authenticated: HeaderMap,
    anonymous: HeaderMap,
}

impl Http {
    pub fn new(config: ConfigParameter) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_url) = config.proxy() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|source| ConfigError::InvalidProxy {
                url: proxy_url.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        if config.insecure() {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(ConfigError::ClientBuild)?;

        let rate_limiter = NonZeroU32::new(config.rate_limit())
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));

        let authenticated = build_authenticated_headers(&config)?;
        let anonymous = strip_credentials(&authenticated, &config);

        Ok(Http {
            config,
            client,
            rate_limiter,
            authenticated,
            anonymous,
        })
    }

    pub fn config(&self) -> &ConfigParameter {
        &self.config
    }

    /// Headers for the first request of a probe.
    pub fn authenticated_headers(&self) -> &HeaderMap {
        &self.authenticated
    }

    /// First-request headers without `Cookie` and the authentication header.
    pub fn anonymous_headers(&self) -> &HeaderMap {
        &self.anonymous
    }

    pub async fn get(&self, url: &str, headers: &HeaderMap) -> Result<ResponseSnapshot, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
        trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(Duration::from_secs(self.config.timeout()))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(ResponseSnapshot::new(
            final_url,
            status,
            response_headers,
            body.to_vec(),
        ))
    }
}

fn build_authenticated_headers(config: &ConfigParameter) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(config.user_agent())
        .map_err(|_| ConfigError::InvalidHeader(format!("User-Agent: {}", config.user_agent())))?;
    headers.insert(USER_AGENT, agent);

    if let Some(auth) = config.auth_header() {
        let raw = format!("{}: {}", auth.name, auth.value);
        let name = HeaderName::from_bytes(auth.name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(raw.clone()))?;
        let value = HeaderValue::from_str(&auth.value).map_err(|_| ConfigError::InvalidHeader(raw))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn strip_credentials(headers: &HeaderMap, config: &ConfigParameter) -> HeaderMap {
    let mut anonymous = headers.clone();
    anonymous.remove(COOKIE);
    if let Some(auth) = config.auth_header() {
        if let Ok(name) = HeaderName::from_bytes(auth.name.as_bytes()) {
            anonymous.remove(name);
        }
    }
    anonymous
}
