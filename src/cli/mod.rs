//! CLI module for subtrim
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::AppConfig;

pub mod args;
pub mod commands;
pub mod render;

/// subtrim - trim videos and burn in subtitles with ffmpeg
#[derive(Parser, Debug)]
#[command(name = "subtrim")]
#[command(about = "Trim video segments and burn in subtitles using ffmpeg")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./subtrim.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that ffmpeg and ffprobe can be launched
    Check,
    /// Print the duration of a media file
    Probe(args::ProbeArgs),
    /// Trim a video and optionally burn in subtitles
    Process(args::ProcessArgs),
    /// Print the log file location
    LogPath,
    /// Append a timestamped line to the log file
    Log(args::LogArgs),
}

impl Cli {
    /// Command-line values take precedence over file and environment
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = Some(file.clone());
        }
        if let Commands::Process(ref args) = self.command {
            if let Some(policy) = args.policy {
                config.jobs.busy_policy = policy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BusyPolicy;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "subtrim",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/subtrim.log",
            "process",
            "--input",
            "a.mp4",
            "--output",
            "b.mp4",
            "--policy",
            "supersede",
        ]);

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/subtrim.log")));
        assert_eq!(config.jobs.busy_policy, BusyPolicy::Supersede);
    }

    #[test]
    fn test_process_verbose_flag() {
        let cli = Cli::parse_from(["subtrim", "process", "-i", "a.mp4", "-o", "b.mp4", "-v"]);
        match cli.command {
            Commands::Process(args) => assert!(args.verbose),
            other => panic!("expected process, got {other:?}"),
        }

        let cli = Cli::parse_from(["subtrim", "process", "-i", "a.mp4", "-o", "b.mp4"]);
        match cli.command {
            Commands::Process(args) => assert!(!args.verbose),
            other => panic!("expected process, got {other:?}"),
        }
    }

    #[test]
    fn test_log_joins_words_and_requires_a_message() {
        let cli = Cli::parse_from(["subtrim", "log", "render", "started"]);
        match cli.command {
            Commands::Log(args) => assert_eq!(args.line(), "render started"),
            other => panic!("expected log, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["subtrim", "log"]).is_err());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = Cli::try_parse_from([
            "subtrim", "process", "-i", "a.mp4", "-o", "b.mp4", "--policy", "queue",
        ]);
        assert!(result.is_err());
    }
}
