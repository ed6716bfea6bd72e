//! CLI module for Clipsmith
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Clipsmith highlight clipper
///
/// Analyzes long-form video for high-energy moments and exports the best
/// segments as short clips, optionally with burned-in karaoke subtitles.
#[derive(Parser)]
#[command(name = "clipsmith")]
#[command(about = "Clipsmith - Find and export the best moments of a video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CLIPSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a video and print suggested clip ranges
    Suggest(args::SuggestArgs),
    /// Export one clip range as a rendered video
    Export(args::ExportArgs),
    /// Suggest clips and export them all
    Run(args::RunArgs),
}
