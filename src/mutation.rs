// File: mutation.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! URL mutation strategies.
//!
//! Every strategy is a pure string transformation of the target URL and the
//! already discovered static directories. Each candidate carries a fresh
//! random token so that no two probes share a cache key, and candidates are
//! deduplicated on their token-free form.

use crate::config::Wordlists;
use crate::extractor::StaticDirectories;
use crate::target::TargetUrl;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub const TOKEN_LENGTH: usize = 3;
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const ENCODED_PARENT: &str = "..%2f";
const ENCODED_TRAVERSAL: &str = "%2f%2e%2e%2f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Technique {
    #[serde(rename = "pd")]
    PathDelimiter,
    #[serde(rename = "osn")]
    OriginNormalization,
    #[serde(rename = "csn")]
    CacheNormalization,
    #[serde(rename = "fncr")]
    FileNameCacheRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechniqueDescriptor {
    pub technique: Technique,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub static TECHNIQUES: [TechniqueDescriptor; 4] = [
    TechniqueDescriptor {
        technique: Technique::PathDelimiter,
        id: "pd",
        name: "Path Delimiter",
        description: "Appends a delimiter, a random name and a static extension to the target path",
    },
    TechniqueDescriptor {
        technique: Technique::OriginNormalization,
        id: "osn",
        name: "Origin Server Normalization",
        description: "Prefixes the target path with a static directory and an encoded '../'",
    },
    TechniqueDescriptor {
        technique: Technique::CacheNormalization,
        id: "csn",
        name: "Cache Server Normalization",
        description: "Appends a delimiter and an encoded traversal into a static directory",
    },
    TechniqueDescriptor {
        technique: Technique::FileNameCacheRule,
        id: "fncr",
        name: "File Name Cache Rule",
        description: "Appends a delimiter and an encoded traversal to a well-known file name",
    },
];

impl Technique {
    pub const ALL: [Technique; 4] = [
        Technique::PathDelimiter,
        Technique::OriginNormalization,
        Technique::CacheNormalization,
        Technique::FileNameCacheRule,
    ];

    pub fn descriptor(&self) -> &'static TechniqueDescriptor {
        let index = match self {
            Technique::PathDelimiter => 0,
            Technique::OriginNormalization => 1,
            Technique::CacheNormalization => 2,
            Technique::FileNameCacheRule => 3,
        };
        &TECHNIQUES[index]
    }

    pub fn id(&self) -> &'static str {
        self.descriptor().id
    }

    /// OSN and CSN build on extracted static directories.
    pub fn needs_static_directories(&self) -> bool {
        matches!(
            self,
            Technique::OriginNormalization | Technique::CacheNormalization
        )
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id().to_uppercase())
    }
}

impl FromStr for Technique {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pd" | "default" => Ok(Technique::PathDelimiter),
            "osn" => Ok(Technique::OriginNormalization),
            "csn" => Ok(Technique::CacheNormalization),
            "fncr" => Ok(Technique::FileNameCacheRule),
            other => Err(format!(
                "unknown technique '{}', expected one of: pd, default, osn, csn, fncr",
                other
            )),
        }
    }
}

/// Random cache-busting token. Not security sensitive.
pub fn cache_buster(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// A test URL: `prefix + token + suffix`.
///
/// Equality and hashing ignore the token.
#[derive(Debug, Clone)]
pub struct CandidateUrl {
    prefix: String,
    suffix: String,
    url: String,
}

impl CandidateUrl {
    pub fn new(prefix: String, suffix: String) -> Self {
        let url = format!("{}{}{}", prefix, cache_buster(TOKEN_LENGTH), suffix);
        CandidateUrl {
            prefix,
            suffix,
            url,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn template(&self) -> String {
        format!("{}{{token}}{}", self.prefix, self.suffix)
    }
}

impl PartialEq for CandidateUrl {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.suffix == other.suffix
    }
}

impl Eq for CandidateUrl {}

impl Hash for CandidateUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.suffix.hash(state);
    }
}

impl std::fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

pub type CandidateSet = HashSet<CandidateUrl>;

pub struct MutationEngine<'a> {
    target: &'a TargetUrl,
    wordlists: &'a Wordlists,
    recursion_depth: u8,
}

impl<'a> MutationEngine<'a> {
    pub fn new(target: &'a TargetUrl, wordlists: &'a Wordlists, recursion_depth: u8) -> Self {
        MutationEngine {
            target,
            wordlists,
            recursion_depth,
        }
    }

    pub fn generate(&self, technique: Technique, directories: &StaticDirectories) -> CandidateSet {
        let candidates = match technique {
            Technique::PathDelimiter => self.path_delimiter(),
            Technique::OriginNormalization => self.origin_normalization(directories),
            Technique::CacheNormalization => self.cache_normalization(directories),
            Technique::FileNameCacheRule => self.file_name_cache_rule(),
        };
        candidates.into_iter().collect()
    }

    /// `<path><delimiter><token><extension>` for every delimiter/extension pair.
    pub fn path_delimiter(&self) -> Vec<CandidateUrl> {
        let origin = self.target.origin();
        let base = self.target.path().trim_end_matches('/');
        let query = self
            .target
            .query()
            .map(|q| format!("?{}", q))
            .unwrap_or_default();

        let mut candidates = Vec::with_capacity(
            self.wordlists.delimiters.len() * self.wordlists.extensions.len(),
        );
        for delimiter in &self.wordlists.delimiters {
            let prefix = if delimiter == "/" || base.is_empty() {
                format!("{}{}/{}", origin, base, delimiter.trim_start_matches('/'))
            } else {
                format!("{}{}{}", origin, base, delimiter)
            };
            for extension in &self.wordlists.extensions {
                candidates.push(CandidateUrl::new(
                    prefix.clone(),
                    format!("{}{}", extension, query),
                ));
            }
        }
        candidates
    }

    /// `/<dir prefix>/..%2f<path>?<token>`, plus one root-level probe.
    pub fn origin_normalization(&self, directories: &StaticDirectories) -> Vec<CandidateUrl> {
        let prefixes = self.directory_prefixes(directories);
        if prefixes.is_empty() {
            return Vec::new();
        }
        let origin = self.target.origin();
        let path = self.target.trimmed_path();

        let mut candidates = vec![CandidateUrl::new(
            format!("{}/{}{}?", origin, ENCODED_PARENT, path),
            String::new(),
        )];
        for prefix in prefixes {
            candidates.push(CandidateUrl::new(
                format!("{}/{}/{}{}?", origin, prefix, ENCODED_PARENT, path),
                String::new(),
            ));
        }
        candidates
    }

    /// `/<path><delimiter>%2f%2e%2e%2f<dir prefix>?<token>`.
    pub fn cache_normalization(&self, directories: &StaticDirectories) -> Vec<CandidateUrl> {
        let origin = self.target.origin();
        let path = self.target.trimmed_path();

        let mut candidates = Vec::new();
        for prefix in self.directory_prefixes(directories) {
            for delimiter in &self.wordlists.delimiters {
                candidates.push(CandidateUrl::new(
                    format!(
                        "{}/{}{}{}{}?",
                        origin, path, delimiter, ENCODED_TRAVERSAL, prefix
                    ),
                    String::new(),
                ));
            }
        }
        candidates
    }

    /// `/<path><delimiter>%2f%2e%2e%2f<file>?<token>` for well-known file names.
    pub fn file_name_cache_rule(&self) -> Vec<CandidateUrl> {
        let origin = self.target.origin();
        let path = self.target.trimmed_path();

        let mut candidates = Vec::new();
        for file in &self.wordlists.file_names {
            for delimiter in &self.wordlists.delimiters {
                candidates.push(CandidateUrl::new(
                    format!(
                        "{}/{}{}{}{}?",
                        origin, path, delimiter, ENCODED_TRAVERSAL, file
                    ),
                    String::new(),
                ));
            }
        }
        candidates
    }

    /// Segment prefixes of every directory, up to the recursion depth,
    /// without leading or trailing slashes.
    fn directory_prefixes(&self, directories: &StaticDirectories) -> BTreeSet<String> {
        let depth = usize::from(self.recursion_depth.max(1));
        let mut prefixes = BTreeSet::new();
        for directory in directories {
            let segments: Vec<&str> = directory.split('/').filter(|s| !s.is_empty()).collect();
            for level in 1..=depth.min(segments.len()) {
                prefixes.insert(segments[..level].join("/"));
            }
        }
        prefixes
    }
}
