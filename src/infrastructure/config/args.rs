use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::app_config::LogLevel;
use crate::domain::entities::{SizePreset, TransformKey, TransformValue, parse_token};

#[derive(Debug, Parser)]
#[command(
    name = "folio-media",
    version,
    about = "Cached, responsive image delivery for the portfolio site",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Cache store directory.
    #[arg(long, value_name = "PATH", global = true, env = "FOLIO_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache entry time-to-live in days.
    #[arg(long, global = true)]
    pub ttl_days: Option<u32>,

    /// CDN cloud name.
    #[arg(long, global = true, env = "FOLIO_CLOUD_NAME")]
    pub cloud_name: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the address of an asset.
    Url {
        /// Asset public id.
        public_id: String,

        /// Size preset applied before custom transformations.
        #[arg(long, value_enum)]
        size: Option<SizePreset>,

        /// Custom transformation token (`key_value`), repeatable.
        #[arg(short = 't', long = "transform", value_parser = parse_transform_arg)]
        transforms: Vec<(TransformKey, TransformValue)>,
    },

    /// Print the primary, variant and placeholder addresses of an asset.
    Responsive {
        /// Asset public id.
        public_id: String,

        /// Size preset of the primary address.
        #[arg(long, value_enum, default_value_t = SizePreset::Medium)]
        size: SizePreset,

        /// Custom transformation token (`key_value`), repeatable.
        #[arg(short = 't', long = "transform", value_parser = parse_transform_arg)]
        transforms: Vec<(TransformKey, TransformValue)>,

        /// Layout hint for the variants.
        #[arg(long)]
        sizes: Option<String>,

        /// Print as JSON.
        #[arg(long)]
        json: bool,

        /// Fetch every address into the cache.
        #[arg(long)]
        prefetch: bool,
    },

    /// Fetch an address through the cache.
    Fetch {
        /// Full address.
        address: String,

        /// Write the payload to this file.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the cached entry for an address.
    Inspect {
        /// Full address.
        address: String,
    },

    /// Remove one address from the cache.
    Evict {
        /// Full address.
        address: String,
    },

    /// Remove every cached entry.
    Clear,
}

fn parse_transform_arg(s: &str) -> Result<(TransformKey, TransformValue), String> {
    parse_token(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_command() {
        let args = CliArgs::parse_from([
            "folio-media",
            "url",
            "logo.png",
            "--size",
            "small",
            "-t",
            "q_auto:low",
            "-t",
            "w_300",
        ]);

        let Command::Url {
            public_id,
            size,
            transforms,
        } = args.command
        else {
            panic!("expected url command");
        };
        assert_eq!(public_id, "logo.png");
        assert_eq!(size, Some(SizePreset::Small));
        assert_eq!(
            transforms,
            vec![
                (TransformKey::Quality, TransformValue::from("auto:low")),
                (TransformKey::Width, TransformValue::Number(300)),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_transform() {
        let result = CliArgs::try_parse_from(["folio-media", "url", "a.png", "-t", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["folio-media", "clear", "--ttl-days", "3"]);
        assert_eq!(args.ttl_days, Some(3));
        assert!(matches!(args.command, Command::Clear));
    }
}
