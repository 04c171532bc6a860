// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use cdhound::config::{AuthHeader, ScanSettings};
use cdhound::target::TargetUrl;
use std::collections::HashMap;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PRIVATE_BODY: &str = "<html><body>Welcome back, alice. Balance: 1337</body></html>";

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn create_mock_response(status: u16, body: &str, headers: HashMap<&str, &str>) -> ResponseTemplate {
    let mut response = ResponseTemplate::new(status).set_body_string(body);
    for (key, value) in headers {
        response = response.append_header(key, value);
    }
    response
}

pub fn create_html_response(content: &str) -> ResponseTemplate {
    let mut headers = HashMap::new();
    headers.insert("content-type", "text/html");
    create_mock_response(200, content, headers)
}

pub fn sample_home_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <link rel="stylesheet" href="/static/css/site.css">
    <script src="/static/js/app.js"></script>
</head>
<body>
    <img src="/images/logo.png">
    <a href="/account">Account</a>
</body>
</html>"#
        .to_string()
}

/// Serves the home page on `/` and the same private body everywhere else.
/// Anonymous requests additionally get `Cache-Control`, which the oracle
/// reads as the response becoming cacheable.
pub async fn mount_cookie_sensitive_origin(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(create_html_response(&sample_home_page()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(header_exists("cookie"))
        .respond_with(create_html_response(PRIVATE_BODY))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .respond_with(
            create_html_response(PRIVATE_BODY).append_header("cache-control", "public, max-age=3600"),
        )
        .mount(server)
        .await;
}

/// Same body and headers for every request, no cache in front.
pub async fn mount_plain_origin(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(create_html_response(&sample_home_page()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .respond_with(create_html_response(PRIVATE_BODY))
        .mount(server)
        .await;
}

pub fn scan_settings(base: &str, target_path: &str) -> ScanSettings {
    let target = TargetUrl::parse(&format!("{}{}", base, target_path)).unwrap();
    let mut settings = ScanSettings::new(target);
    settings.config.set_timeout(5);
    settings.config.set_workers(4);
    settings.config.set_auth_header(Some(AuthHeader {
        name: "Cookie".to_string(),
        value: "session=alice".to_string(),
    }));
    settings
}
