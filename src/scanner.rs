// File: scanner.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Scan coordinator.
//!
//! Techniques run one after another; the candidates of a single technique
//! are probed concurrently by at most `workers` tasks. Static directories
//! are extracted at most once per scanner and shared by OSN and CSN.

use crate::config::{ScanSettings, Wordlists};
use crate::error::ConfigError;
use crate::extractor::{StaticDirectories, StaticExtractor};
use crate::getstate::GetState;
use crate::http::Http;
use crate::mutation::{CandidateSet, MutationEngine, Technique};
use crate::oracle::{CacheOracle, ProbeResult};
use crate::report::Reporter;
use crate::target::TargetUrl;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, trace, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechniquePhase {
    Pending,
    GeneratingCandidates,
    Dispatching,
    Collecting,
    Done,
}

#[derive(Debug, Clone)]
pub struct TechniqueSummary {
    pub technique: Technique,
    pub phase: TechniquePhase,
    pub stats: GetState,
    /// Vulnerable results only.
    pub findings: Vec<ProbeResult>,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub target: String,
    pub static_directories: Option<StaticDirectories>,
    pub techniques: Vec<TechniqueSummary>,
}

impl ScanReport {
    pub fn total_vulnerable(&self) -> usize {
        self.techniques.iter().map(|t| t.stats.vulnerable()).sum()
    }

    pub fn findings(&self) -> impl Iterator<Item = &ProbeResult> {
        self.techniques.iter().flat_map(|t| t.findings.iter())
    }

    pub fn summary(&self, technique: Technique) -> Option<&TechniqueSummary> {
        self.techniques.iter().find(|t| t.technique == technique)
    }
}

pub struct Scanner {
    oracle: Arc<CacheOracle>,
    target: TargetUrl,
    wordlists: Wordlists,
    recursion_depth: u8,
    workers: usize,
    static_directories: Option<StaticDirectories>,
}

impl Scanner {
    pub fn new(settings: &ScanSettings) -> Result<Self, ConfigError> {
        let workers = settings.config.workers();
        if workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        let http = Http::new(settings.config.clone())?;

        Ok(Scanner {
            oracle: Arc::new(CacheOracle::new(http)),
            target: settings.target.clone(),
            wordlists: settings.wordlists.clone(),
            recursion_depth: settings.config.recursion_depth(),
            workers,
            static_directories: None,
        })
    }

    /// Skips extraction by supplying directories up front.
    pub fn with_static_directories(mut self, directories: StaticDirectories) -> Self {
        self.static_directories = Some(directories);
        self
    }

    pub fn static_directories(&self) -> Option<&StaticDirectories> {
        self.static_directories.as_ref()
    }

    pub fn target(&self) -> &TargetUrl {
        &self.target
    }

    pub async fn run(&mut self, techniques: &[Technique], reporter: &dyn Reporter) -> ScanReport {
        reporter.scan_started(&self.target, techniques);

        let mut summaries = Vec::with_capacity(techniques.len());
        for &technique in techniques {
            let summary = self.run_technique(technique, reporter).await;
            reporter.technique_finished(&summary);
            summaries.push(summary);
        }

        let report = ScanReport {
            target: self.target.to_string(),
            static_directories: self.static_directories.clone(),
            techniques: summaries,
        };
        reporter.scan_finished(&report);
        report
    }

    pub async fn run_technique(
        &mut self,
        technique: Technique,
        reporter: &dyn Reporter,
    ) -> TechniqueSummary {
        let mut phase = TechniquePhase::Pending;
        advance(technique, &mut phase, TechniquePhase::GeneratingCandidates);

        let directories = if technique.needs_static_directories() {
            self.ensure_static_directories(reporter).await
        } else {
            StaticDirectories::new()
        };
        let candidates = MutationEngine::new(&self.target, &self.wordlists, self.recursion_depth)
            .generate(technique, &directories);

        let mut stats = GetState::new();
        stats.start(candidates.len());
        reporter.technique_started(technique.descriptor(), candidates.len());

        advance(technique, &mut phase, TechniquePhase::Dispatching);
        let findings = self
            .dispatch(technique, candidates, &mut phase, &mut stats, reporter)
            .await;
        stats.finish();
        advance(technique, &mut phase, TechniquePhase::Done);

        TechniqueSummary {
            technique,
            phase,
            stats,
            findings,
        }
    }

    async fn ensure_static_directories(&mut self, reporter: &dyn Reporter) -> StaticDirectories {
        if let Some(directories) = &self.static_directories {
            return directories.clone();
        }
        let directories = StaticExtractor::new(self.oracle.http())
            .discover(&self.target)
            .await;
        reporter.static_directories(&directories);
        self.static_directories = Some(directories.clone());
        directories
    }

    async fn dispatch(
        &self,
        technique: Technique,
        candidates: CandidateSet,
        phase: &mut TechniquePhase,
        stats: &mut GetState,
        reporter: &dyn Reporter,
    ) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut futures = FuturesUnordered::new();

        for candidate in candidates {
            let url = candidate.as_str().to_string();
            let oracle = Arc::clone(&self.oracle);
            let semaphore = Arc::clone(&semaphore);
            futures.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                trace!("Probing {}", url);
                oracle.probe(&url).await
            }));
        }

        advance(technique, phase, TechniquePhase::Collecting);
        let mut findings = Vec::new();
        while let Some(task) = futures.next().await {
            match task {
                Ok(result) => {
                    stats.record(&result);
                    reporter.probe_finished(&result);
                    if result.is_vulnerable() {
                        findings.push(result);
                    }
                }
                Err(e) => warn!("Probe task failed: {}", e),
            }
        }
        findings
    }
}

fn advance(technique: Technique, phase: &mut TechniquePhase, next: TechniquePhase) {
    debug!("{}: {:?} -> {:?}", technique, phase, next);
    *phase = next;
}
