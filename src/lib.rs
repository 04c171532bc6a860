// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::bool_assert_comparison)]

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod getstate;
pub mod http;
pub mod mutation;
pub mod oracle;
pub mod report;
pub mod response;
pub mod scanner;
pub mod target;
