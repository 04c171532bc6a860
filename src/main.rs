// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2025
// - Volker Schwaberow <volker@schwaberow.de>

use cdhound::cli::Cli;
use cdhound::report::{ConsoleReporter, ReportGenerator};
use cdhound::scanner::Scanner;
use clap::Parser;
use colored::*;
use log::{error, info};
use simple_logger::SimpleLogger;

fn print_banner() {
    println!(
        "{} {} - {}",
        env!("CARGO_PKG_NAME").bright_green().bold(),
        env!("CARGO_PKG_VERSION"),
        "Web Cache Deception & Poisoning Scanner".green()
    );
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "[!] Error:".red().bold(), message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = SimpleLogger::new()
        .with_level(cli.log_level())
        .with_colors(!cli.no_color)
        .init()
    {
        eprintln!("Failed to initialise logger: {}", e);
    }

    print_banner();

    let settings = match cli.to_settings() {
        Ok(settings) => settings,
        Err(e) => fail(e),
    };
    let mut scanner = match Scanner::new(&settings) {
        Ok(scanner) => scanner,
        Err(e) => fail(e),
    };
    info!(
        "Loaded {} delimiters and {} extensions",
        settings.wordlists.delimiters.len(),
        settings.wordlists.extensions.len()
    );

    let reporter = ConsoleReporter::new(settings.config.verbose(), settings.config.timeout());
    let report = scanner.run(&settings.techniques, &reporter).await;

    if let Some(path) = &cli.output {
        match ReportGenerator::generate_report(&report, path, cli.format) {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => {
                error!("Failed to write report {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }
}
