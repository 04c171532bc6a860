// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::extractor::StaticDirectories;
use crate::mutation::{Technique, TechniqueDescriptor};
use crate::oracle::{CacheSignal, ProbeFault, ProbeResult};
use crate::scanner::{ScanReport, TechniqueSummary};
use crate::target::TargetUrl;
use chrono::Utc;
use clap::ValueEnum;
use colored::*;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{Result, Write};
use std::path::Path;
use std::sync::Mutex;

/// Receives scan progress. Called from the collecting loop, one event at a time.
pub trait Reporter: Send + Sync {
    fn scan_started(&self, _target: &TargetUrl, _techniques: &[Technique]) {}
    fn static_directories(&self, _directories: &StaticDirectories) {}
    fn technique_started(&self, _descriptor: &TechniqueDescriptor, _candidates: usize) {}
    fn probe_finished(&self, _result: &ProbeResult) {}
    fn technique_finished(&self, _summary: &TechniqueSummary) {}
    fn scan_finished(&self, _report: &ScanReport) {}
}

pub struct SilentReporter;

impl Reporter for SilentReporter {}

pub struct ConsoleReporter {
    verbose: bool,
    timeout: u64,
    progress: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, timeout: u64) -> Self {
        ConsoleReporter {
            verbose,
            timeout,
            progress: Mutex::new(None),
        }
    }

    fn emit(&self, line: String) {
        let guard = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    fn progress_bar(len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("█▉▊▋▌▍▎▏  ");
        pb.set_style(style);
        pb
    }

    fn finding_lines(result: &ProbeResult) -> Vec<String> {
        let signals: Vec<String> = result.signals.iter().map(|s| s.to_string()).collect();
        let length = match result.content_length_match {
            Some(true) => "match",
            Some(false) => "differ",
            None => "unknown",
        };
        vec![
            format!("{}", "[!] VULNERABLE URL FOUND!".green().bold()),
            format!("{}", format!("[!] URL: {}", result.url).green()),
            format!("[!] Cache behavior: {}", result.cache_transition()),
            format!("[!] Signals: {}", signals.join(", ")),
            format!("[!] Content-Length: {} (advisory)", length),
            "[!] Authenticated content leaked to unauthenticated user!".to_string(),
        ]
    }
}

impl Reporter for ConsoleReporter {
    fn scan_started(&self, target: &TargetUrl, techniques: &[Technique]) {
        let ids: Vec<&str> = techniques.iter().map(|t| t.id()).collect();
        println!("\n[*] Testing cache behavior for: {}", target.to_string().bold());
        println!("[*] Techniques: {}", ids.join(", "));
    }

    fn static_directories(&self, directories: &StaticDirectories) {
        if directories.is_empty() {
            self.emit(format!("{}", "[!] No static resource directories found".yellow()));
            return;
        }
        self.emit(format!(
            "{}",
            format!("[*] Found {} static resource directories:", directories.len()).green()
        ));
        for directory in directories {
            self.emit(format!("   - {}", directory));
        }
    }

    fn technique_started(&self, descriptor: &TechniqueDescriptor, candidates: usize) {
        println!("{}", "-".repeat(60));
        println!(
            "[*] {} ({}): {}",
            descriptor.name.bold(),
            descriptor.id,
            descriptor.description
        );
        println!(
            "{}",
            format!("[*] Generated {} test URLs", candidates).green()
        );
        let mut guard = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Self::progress_bar(candidates as u64));
    }

    fn probe_finished(&self, result: &ProbeResult) {
        if result.is_vulnerable() {
            for line in Self::finding_lines(result) {
                self.emit(line);
            }
        } else if self.verbose {
            let line = match result.fault {
                Some(ProbeFault::Timeout) => format!(
                    "{}",
                    format!(
                        "[!] Timeout: {} took longer than {} seconds and was ignored.",
                        result.url, self.timeout
                    )
                    .yellow()
                ),
                Some(ProbeFault::NetworkError) => format!(
                    "[!] Error testing {}: {}",
                    result.url,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                None => format!("[+] Tested: {} | Not vulnerable", result.url),
            };
            self.emit(line);
        }

        let guard = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.as_ref() {
            pb.inc(1);
        }
    }

    fn technique_finished(&self, summary: &TechniqueSummary) {
        let mut guard = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
        drop(guard);

        let stats = &summary.stats;
        let vulnerable = if stats.vulnerable() > 0 {
            stats.vulnerable().to_string().red().bold()
        } else {
            stats.vulnerable().to_string().green()
        };
        println!(
            "[*] {} done: {} tested, {} vulnerable, {} timed out, {} network errors ({:.1}s)",
            summary.technique,
            stats.tested(),
            vulnerable,
            stats.timed_out().to_string().yellow(),
            stats.network_errors(),
            stats.elapsed().as_secs_f64()
        );
    }

    fn scan_finished(&self, report: &ScanReport) {
        println!("{}", "=".repeat(60));
        let total = report.total_vulnerable();
        if total == 0 {
            println!("{}", "No cache deception vectors detected".green());
        } else {
            println!(
                "{}",
                format!("{} vulnerable URL(s) found", total).red().bold()
            );
            for finding in report.findings() {
                println!("  {} {}", "-".bright_yellow(), finding.url);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub technique: Technique,
    pub url: String,
    pub signals: Vec<CacheSignal>,
    pub first_status: Option<u16>,
    pub second_status: Option<u16>,
    pub first_cache_headers: BTreeMap<String, String>,
    pub second_cache_headers: BTreeMap<String, String>,
    pub content_length_match: Option<bool>,
    pub first_body_sha256: Option<String>,
    pub second_body_sha256: Option<String>,
}

impl ReportEntry {
    pub fn from_result(technique: Technique, result: &ProbeResult) -> Self {
        ReportEntry {
            technique,
            url: result.url.clone(),
            signals: result.signals.clone(),
            first_status: result.first.as_ref().map(|r| r.status()),
            second_status: result.second.as_ref().map(|r| r.status()),
            first_cache_headers: result
                .first
                .as_ref()
                .map(|r| r.cache_headers())
                .unwrap_or_default(),
            second_cache_headers: result
                .second
                .as_ref()
                .map(|r| r.cache_headers())
                .unwrap_or_default(),
            content_length_match: result.content_length_match,
            first_body_sha256: result.first.as_ref().map(|r| r.body_sha256()),
            second_body_sha256: result.second.as_ref().map(|r| r.body_sha256()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TechniqueEntry {
    pub technique: Technique,
    pub name: String,
    pub candidates: usize,
    pub tested: usize,
    pub vulnerable: usize,
    pub timed_out: usize,
    pub network_errors: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub target: String,
    pub generated_at: String,
    pub static_directories: Vec<String>,
    pub techniques: Vec<TechniqueEntry>,
    pub findings: Vec<ReportEntry>,
}

impl ReportDocument {
    pub fn from_report(report: &ScanReport) -> Self {
        let techniques = report
            .techniques
            .iter()
            .map(|summary| TechniqueEntry {
                technique: summary.technique,
                name: summary.technique.descriptor().name.to_string(),
                candidates: summary.stats.total_candidates(),
                tested: summary.stats.tested(),
                vulnerable: summary.stats.vulnerable(),
                timed_out: summary.stats.timed_out(),
                network_errors: summary.stats.network_errors(),
                elapsed_ms: summary.stats.elapsed().as_millis(),
            })
            .collect();
        let findings = report
            .techniques
            .iter()
            .flat_map(|summary| {
                summary
                    .findings
                    .iter()
                    .map(move |result| ReportEntry::from_result(summary.technique, result))
            })
            .collect();

        ReportDocument {
            target: report.target.clone(),
            generated_at: Utc::now().to_rfc3339(),
            static_directories: report
                .static_directories
                .as_ref()
                .map(|dirs| dirs.iter().cloned().collect())
                .unwrap_or_default(),
            techniques,
            findings,
        }
    }
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate_report(report: &ScanReport, output_path: &Path, format: ReportFormat) -> Result<()> {
        let document = ReportDocument::from_report(report);
        match format {
            ReportFormat::Text => Self::generate_text_report(&document, output_path),
            ReportFormat::Json => Self::generate_json_report(&document, output_path),
        }
    }

    pub fn generate_text_report(document: &ReportDocument, output_path: &Path) -> Result<()> {
        let mut file = File::create(output_path)?;
        writeln!(file, "# {} {}", document.target, document.generated_at)?;
        for entry in &document.findings {
            let signals: Vec<String> = entry.signals.iter().map(|s| s.to_string()).collect();
            writeln!(
                file,
                "{} {} [{}] x-cache: {} -> {}",
                entry.technique.id(),
                entry.url,
                signals.join(", "),
                entry.first_cache_headers.get("x-cache").map_or("-", String::as_str),
                entry.second_cache_headers.get("x-cache").map_or("-", String::as_str),
            )?;
        }
        Ok(())
    }

    pub fn generate_json_report(document: &ReportDocument, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        let mut file = File::create(output_path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}
