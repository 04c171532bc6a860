// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ConfigError;
use crate::mutation::Technique;
use crate::target::TargetUrl;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_DELIMITERS: &[&str] = &["/", "!", ";", ",", ":", "|", "#", "?"];
pub const DEFAULT_EXTENSIONS: &str = ".js,.css,.png";
pub const FNCR_FILE_NAMES: &[&str] = &[
    "robots.txt",
    "index.html",
    "index.php",
    "sitemap.xml",
    "favicon.ico",
    "404.html",
];
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT: u64 = 15;
pub const DEFAULT_RECURSION_DEPTH: u8 = 1;
pub const MAX_RECURSION_DEPTH: u8 = 3;

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ConfigParameter {
    timeout: u64,
    workers: usize,
    recursion_depth: u8,
    proxy: Option<String>,
    user_agent: String,
    auth_header: Option<AuthHeader>,
    rate_limit: u32,
    insecure: bool,
    verbose: bool,
}

impl Default for ConfigParameter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParameter {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            workers: DEFAULT_WORKERS,
            recursion_depth: DEFAULT_RECURSION_DEPTH,
            proxy: None,
            user_agent: default_user_agent(),
            auth_header: None,
            rate_limit: 0,
            insecure: false,
            verbose: false,
        }
    }

    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers;
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn set_recursion_depth(&mut self, depth: u8) {
        self.recursion_depth = depth.clamp(1, MAX_RECURSION_DEPTH);
    }

    pub fn recursion_depth(&self) -> u8 {
        self.recursion_depth
    }

    pub fn set_proxy(&mut self, proxy: Option<String>) {
        self.proxy = proxy;
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = user_agent;
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_auth_header(&mut self, auth_header: Option<AuthHeader>) {
        self.auth_header = auth_header;
    }

    pub fn auth_header(&self) -> Option<&AuthHeader> {
        self.auth_header.as_ref()
    }

    pub fn set_rate_limit(&mut self, rate_limit: u32) {
        self.rate_limit = rate_limit;
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn set_insecure(&mut self, insecure: bool) {
        self.insecure = insecure;
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Read-only word tables handed to the mutation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wordlists {
    pub delimiters: Vec<String>,
    pub extensions: Vec<String>,
    pub file_names: Vec<String>,
}

impl Default for Wordlists {
    fn default() -> Self {
        Wordlists {
            delimiters: DEFAULT_DELIMITERS.iter().map(|d| d.to_string()).collect(),
            extensions: parse_extensions(DEFAULT_EXTENSIONS).unwrap_or_default(),
            file_names: FNCR_FILE_NAMES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl Wordlists {
    pub fn new(delimiters: Vec<String>, extensions: Vec<String>) -> Self {
        Wordlists {
            delimiters,
            extensions,
            ..Wordlists::default()
        }
    }
}

/// Everything a scan needs, validated up front.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub target: TargetUrl,
    pub config: ConfigParameter,
    pub wordlists: Wordlists,
    pub techniques: Vec<Technique>,
}

impl ScanSettings {
    pub fn new(target: TargetUrl) -> Self {
        ScanSettings {
            target,
            config: ConfigParameter::new(),
            wordlists: Wordlists::default(),
            techniques: Technique::ALL.to_vec(),
        }
    }
}

pub fn parse_header(header: &str) -> Result<AuthHeader, ConfigError> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidHeader(header.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidHeader(header.to_string()));
    }
    Ok(AuthHeader {
        name: name.to_string(),
        value: value.trim().to_string(),
    })
}

pub fn read_delimiters(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::WordlistNotFound(path.to_path_buf()),
        _ => ConfigError::WordlistRead {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let delimiters: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if delimiters.is_empty() {
        return Err(ConfigError::EmptyWordlist(path.to_path_buf()));
    }
    Ok(delimiters)
}

pub fn parse_extensions(list: &str) -> Result<Vec<String>, ConfigError> {
    let extensions: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect();
    if extensions.is_empty() {
        return Err(ConfigError::EmptyExtensions);
    }
    Ok(extensions)
}
