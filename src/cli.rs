// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::{
    parse_extensions, parse_header, read_delimiters, ConfigParameter, ScanSettings, Wordlists,
    DEFAULT_EXTENSIONS, DEFAULT_TIMEOUT, DEFAULT_WORKERS,
};
use crate::error::ConfigError;
use crate::mutation::Technique;
use crate::report::ReportFormat;
use crate::target::TargetUrl;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[arg(help = "Target URL")]
    pub url: String,

    #[arg(
        short = 'H',
        long = "header",
        help = "Header in format \"Name: Value\" used to authenticate the first request"
    )]
    pub header: Option<String>,

    #[arg(
        short = 'w',
        long = "wordlist",
        help = "Delimiter wordlist, one per line (built-in set if omitted)"
    )]
    pub wordlist: Option<PathBuf>,

    #[arg(
        short = 'e',
        long = "extensions",
        default_value = DEFAULT_EXTENSIONS,
        help = "Comma-separated list of extensions to test"
    )]
    pub extensions: String,

    #[arg(
        short = 'T',
        long = "technique",
        value_parser = parse_technique,
        help = "Run a single technique: pd (alias default), osn, csn, fncr. All four by default"
    )]
    pub technique: Option<Technique>,

    #[arg(
        short = 'r',
        long = "recursion",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=3),
        help = "Recursion depth for OSN/CSN testing (1, 2 or 3)"
    )]
    pub recursion: u8,

    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    #[arg(short = 'p', long = "proxy", help = "HTTP/HTTPS proxy URL")]
    pub proxy: Option<String>,

    #[arg(
        long = "timeout",
        default_value_t = DEFAULT_TIMEOUT,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(short = 'A', long = "user-agent")]
    pub user_agent: Option<String>,

    #[arg(
        long = "rate-limit",
        default_value_t = 0,
        help = "Maximum requests per second, 0 for unlimited"
    )]
    pub rate_limit: u32,

    #[arg(short = 'k', long = "insecure", help = "Accept invalid TLS certificates")]
    pub insecure: bool,

    #[arg(short = 'o', long = "output", help = "Write findings to this file")]
    pub output: Option<PathBuf>,

    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: ReportFormat,

    #[arg(short = 'v', long = "verbose", help = "Show every tested URL")]
    pub verbose: bool,

    #[arg(
        long = "log-level",
        default_value = "warn",
        value_parser = parse_log_level,
        help = "Log filter: off, error, warn, info, debug or trace"
    )]
    pub log_level: LevelFilter,

    #[arg(long = "no-color", help = "Disable colored output")]
    pub no_color: bool,
}

fn parse_technique(value: &str) -> Result<Technique, String> {
    value.parse()
}

fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("Unknown log level '{}'", value))
}

impl Cli {
    pub fn techniques(&self) -> Vec<Technique> {
        match self.technique {
            Some(technique) => vec![technique],
            None => Technique::ALL.to_vec(),
        }
    }

    /// `-v` never logs less than `info`.
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            self.log_level.max(LevelFilter::Info)
        } else {
            self.log_level
        }
    }

    pub fn to_settings(&self) -> Result<ScanSettings, ConfigError> {
        let target = TargetUrl::parse(&self.url)?;

        let mut config = ConfigParameter::new();
        if let Some(header) = &self.header {
            config.set_auth_header(Some(parse_header(header)?));
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        config.set_workers(self.threads);
        config.set_recursion_depth(self.recursion);
        config.set_timeout(self.timeout);
        config.set_proxy(self.proxy.clone());
        if let Some(agent) = &self.user_agent {
            config.set_user_agent(agent.clone());
        }
        config.set_rate_limit(self.rate_limit);
        config.set_insecure(self.insecure);
        config.set_verbose(self.verbose);

        let defaults = Wordlists::default();
        let delimiters = match &self.wordlist {
            Some(path) => read_delimiters(path)?,
            None => defaults.delimiters,
        };
        let extensions = parse_extensions(&self.extensions)?;

        Ok(ScanSettings {
            target,
            config,
            wordlists: Wordlists::new(delimiters, extensions),
            techniques: self.techniques(),
        })
    }
}
