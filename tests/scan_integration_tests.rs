// File: scan_integration_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

mod common;

use cdhound::config::{ConfigParameter, Wordlists};
use cdhound::extractor::StaticExtractor;
use cdhound::http::Http;
use cdhound::mutation::Technique;
use cdhound::oracle::{CacheOracle, CacheSignal, ProbeFault, Verdict};
use cdhound::report::SilentReporter;
use cdhound::scanner::{Scanner, TechniquePhase};
use cdhound::target::TargetUrl;
use common::*;
use serial_test::serial;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

fn oracle(settings: &cdhound::config::ScanSettings) -> CacheOracle {
    CacheOracle::new(Http::new(settings.config.clone()).unwrap())
}

#[tokio::test]
#[serial]
async fn test_probe_detects_miss_then_hit() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/account"))
        .respond_with(ResponseTemplate::new(200).set_body_string("A").append_header("x-cache", "Miss from cloudfront"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/account"))
        .respond_with(ResponseTemplate::new(200).set_body_string("A").append_header("x-cache", "Hit from cloudfront"))
        .mount(&server)
        .await;

    let settings = scan_settings(&server.uri(), "/account");
    let result = oracle(&settings)
        .probe(&format!("{}/account;x1z.css", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::Vulnerable);
    assert_eq!(result.signals, vec![CacheSignal::MissThenHit]);
    assert_eq!(result.fault, None);
    assert_eq!(result.content_length_match, Some(true));
    assert_eq!(result.cache_transition(), "Miss from cloudfront -> Hit from cloudfront");
}

#[tokio::test]
#[serial]
async fn test_probe_body_mismatch_is_not_vulnerable() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("A").append_header("x-cache", "miss"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("B").append_header("x-cache", "hit"))
        .mount(&server)
        .await;

    let settings = scan_settings(&server.uri(), "/account");
    let result = oracle(&settings)
        .probe(&format!("{}/account!abc.js", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::NotVulnerable);
    assert!(result.signals.is_empty());
}

#[tokio::test]
#[serial]
async fn test_second_request_drops_credentials() {
    let server = setup_mock_server().await;
    mount_cookie_sensitive_origin(&server).await;

    let settings = scan_settings(&server.uri(), "/account");
    let result = oracle(&settings)
        .probe(&format!("{}/account;abc.png", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::Vulnerable);
    assert!(result.signals.contains(&CacheSignal::CacheControlAppeared));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].headers.get("cookie").unwrap(), "session=alice");
    assert!(requests[1].headers.get("cookie").is_none());
    assert!(requests[0].headers.get("user-agent").is_some());
    assert!(requests[1].headers.get("user-agent").is_some());
}

#[tokio::test]
#[serial]
async fn test_timeout_yields_not_vulnerable() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut settings = scan_settings(&server.uri(), "/account");
    settings.config.set_timeout(1);
    let result = oracle(&settings)
        .probe(&format!("{}/account;abc.js", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::NotVulnerable);
    assert_eq!(result.fault, Some(ProbeFault::Timeout));
    assert!(result.first.is_none());
}

#[tokio::test]
#[serial]
async fn test_extractor_merges_target_and_root() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(create_html_response(&sample_home_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(create_html_response(r#"<script src="/assets/app.js"></script>"#))
        .mount(&server)
        .await;

    let settings = scan_settings(&server.uri(), "/account");
    let http = Http::new(settings.config.clone()).unwrap();
    let directories = StaticExtractor::new(&http).discover(&settings.target).await;

    let expected: BTreeSet<String> = ["/assets", "/images", "/static", "/static/css", "/static/js"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(directories, expected);
}

#[tokio::test]
#[serial]
async fn test_extractor_survives_unreachable_root() {
    let target = TargetUrl::parse("http://127.0.0.1:9/account").unwrap();
    let mut config = ConfigParameter::new();
    config.set_timeout(2);
    let http = Http::new(config).unwrap();

    let directories = StaticExtractor::new(&http)
        .extract(r#"<link href="/css/a.css">"#, &target)
        .await;
    assert_eq!(directories.len(), 1);
    assert!(directories.contains("/css"));
}

#[tokio::test]
#[serial]
async fn test_full_scan_against_cookie_sensitive_origin() {
    let server = setup_mock_server().await;
    mount_cookie_sensitive_origin(&server).await;

    let settings = scan_settings(&server.uri(), "/account");
    let mut scanner = Scanner::new(&settings).unwrap();
    let report = scanner.run(&Technique::ALL, &SilentReporter).await;

    assert_eq!(report.techniques.len(), 4);
    let wordlists = Wordlists::default();

    let pd = report.summary(Technique::PathDelimiter).unwrap();
    assert_eq!(pd.stats.tested(), wordlists.delimiters.len() * wordlists.extensions.len());

    // Root probe plus the "static" and "images" top-level directories.
    let osn = report.summary(Technique::OriginNormalization).unwrap();
    assert_eq!(osn.stats.tested(), 3);

    let csn = report.summary(Technique::CacheNormalization).unwrap();
    assert_eq!(csn.stats.tested(), 2 * wordlists.delimiters.len());

    let fncr = report.summary(Technique::FileNameCacheRule).unwrap();
    assert_eq!(fncr.stats.tested(), wordlists.file_names.len() * wordlists.delimiters.len());

    for summary in &report.techniques {
        assert_eq!(summary.phase, TechniquePhase::Done);
        assert_eq!(summary.stats.vulnerable(), summary.stats.tested());
        assert_eq!(summary.stats.timed_out(), 0);
        assert_eq!(summary.findings.len(), summary.stats.vulnerable());
    }
    assert!(report.static_directories.as_ref().unwrap().contains("/static/css"));
}

#[tokio::test]
#[serial]
async fn test_repeated_scans_agree() {
    async fn verdicts(uri: &str) -> BTreeMap<Technique, (usize, usize)> {
        let settings = scan_settings(uri, "/account");
        let mut scanner = Scanner::new(&settings).unwrap();
        let report = scanner.run(&Technique::ALL, &SilentReporter).await;
        report
            .techniques
            .iter()
            .map(|t| (t.technique, (t.stats.tested(), t.stats.vulnerable())))
            .collect()
    }

    let plain = setup_mock_server().await;
    mount_plain_origin(&plain).await;
    let first = verdicts(&plain.uri()).await;
    let second = verdicts(&plain.uri()).await;
    assert_eq!(first, second);
    assert!(first.values().all(|(tested, vulnerable)| *tested > 0 && *vulnerable == 0));

    let caching = setup_mock_server().await;
    mount_cookie_sensitive_origin(&caching).await;
    let first = verdicts(&caching.uri()).await;
    let second = verdicts(&caching.uri()).await;
    assert_eq!(first, second);
    assert!(first.values().all(|(tested, vulnerable)| tested == vulnerable));
}

#[tokio::test]
#[serial]
async fn test_directories_extracted_once_per_scanner() {
    let server = setup_mock_server().await;
    mount_plain_origin(&server).await;

    let settings = scan_settings(&server.uri(), "/account");
    let mut scanner = Scanner::new(&settings).unwrap();
    scanner
        .run(
            &[Technique::OriginNormalization, Technique::CacheNormalization],
            &SilentReporter,
        )
        .await;

    let requests = server.received_requests().await.unwrap();
    let root_fetches = requests.iter().filter(|r| r.url.path() == "/").count();
    assert_eq!(root_fetches, 1);
    assert_eq!(scanner.static_directories().unwrap().len(), 4);
}

#[tokio::test]
#[serial]
async fn test_probe_compares_raw_body_bytes() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xffu8]).append_header("x-cache", "miss"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xfeu8]).append_header("x-cache", "hit"))
        .mount(&server)
        .await;

    let settings = scan_settings(&server.uri(), "/account");
    let result = oracle(&settings)
        .probe(&format!("{}/account;abc.css", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::NotVulnerable);
    assert!(result.signals.is_empty());
    assert_eq!(result.first.as_ref().unwrap().body(), &[0xffu8][..]);
    assert_eq!(result.second.as_ref().unwrap().body(), &[0xfeu8][..]);
}

#[tokio::test]
#[serial]
async fn test_second_request_timeout_yields_not_vulnerable() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("A").append_header("x-cache", "miss"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("A")
                .append_header("x-cache", "hit")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut settings = scan_settings(&server.uri(), "/account");
    settings.config.set_timeout(1);
    let result = oracle(&settings)
        .probe(&format!("{}/account;abc.js", server.uri()))
        .await;

    assert_eq!(result.verdict, Verdict::NotVulnerable);
    assert_eq!(result.fault, Some(ProbeFault::Timeout));
    assert!(result.first.is_some());
    assert!(result.second.is_none());
    assert!(result.signals.is_empty());
}

#[tokio::test]
#[serial]
async fn test_extraction_and_probes_go_through_proxy() {
    let proxy = setup_mock_server().await;
    mount_cookie_sensitive_origin(&proxy).await;

    let mut settings = scan_settings("http://shop.cdhound.test", "/account");
    settings.config.set_proxy(Some(proxy.uri()));
    let mut scanner = Scanner::new(&settings).unwrap();
    let report = scanner
        .run(&[Technique::OriginNormalization], &SilentReporter)
        .await;

    let osn = report.summary(Technique::OriginNormalization).unwrap();
    assert_eq!(osn.stats.tested(), 3);
    assert_eq!(osn.stats.vulnerable(), 3);
    assert_eq!(osn.stats.network_errors(), 0);

    let requests = proxy.received_requests().await.unwrap();
    // Target page and site root, then two requests per candidate.
    assert_eq!(requests.len(), 2 + 2 * 3);
    assert!(requests
        .iter()
        .all(|r| r.url.host_str() == Some("shop.cdhound.test")));
    assert!(requests.iter().any(|r| r.url.path() == "/"));
    assert!(requests.iter().any(|r| r.url.path() == "/account"));
}
