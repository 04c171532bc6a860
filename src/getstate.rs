// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::oracle::{ProbeFault, ProbeResult};
use std::time::{Duration, Instant};

/// Counters for one technique run.
#[derive(Debug, Clone, Copy)]
pub struct GetState {
    total_candidates: usize,
    tested: usize,
    vulnerable: usize,
    timed_out: usize,
    network_errors: usize,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl Default for GetState {
    fn default() -> Self {
        Self::new()
    }
}

impl GetState {
    pub fn new() -> GetState {
        GetState {
            total_candidates: 0,
            tested: 0,
            vulnerable: 0,
            timed_out: 0,
            network_errors: 0,
            start_time: None,
            end_time: None,
        }
    }

    pub fn start(&mut self, total_candidates: usize) {
        self.total_candidates = total_candidates;
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    pub fn record(&mut self, result: &ProbeResult) {
        self.tested += 1;
        if result.is_vulnerable() {
            self.vulnerable += 1;
        }
        match result.fault {
            Some(ProbeFault::Timeout) => self.timed_out += 1,
            Some(ProbeFault::NetworkError) => self.network_errors += 1,
            None => {}
        }
    }

    pub fn total_candidates(&self) -> usize {
        self.total_candidates
    }

    pub fn tested(&self) -> usize {
        self.tested
    }

    pub fn vulnerable(&self) -> usize {
        self.vulnerable
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    pub fn network_errors(&self) -> usize {
        self.network_errors
    }

    pub fn elapsed(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}
