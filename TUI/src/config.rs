//! Application configuration and constants.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::selection::OverflowPolicy;

pub struct Config {
    /// Base URL of the embedding backend
    pub api_url: String,

    /// Per-request timeout for backend calls
    pub request_timeout: Duration,

    /// Main loop tick rate in milliseconds (target 60 FPS = ~16ms)
    pub tick_rate_ms: u64,

    /// How long success messages stay in the status line
    pub success_status_ttl: Duration,

    /// Modulo for animation frame counter
    pub animation_frame_mod: usize,

    /// Leading embedding components shown in the preview (10..=30)
    pub preview_components: usize,

    /// What selecting a third point does
    pub overflow_policy: OverflowPolicy,

    /// Where tracing output goes; stdout belongs to the terminal UI
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            tick_rate_ms: 16,
            success_status_ttl: Duration::from_secs(3),
            animation_frame_mod: 360,
            preview_components: 10,
            overflow_policy: OverflowPolicy::EvictOldest,
            log_file: PathBuf::from("embedviz.log"),
        }
    }
}

/// Command line flags. Anything left out keeps its `Config::default()` value.
#[derive(Debug, Parser)]
#[command(name = "embedviz", about = "Explore text embeddings as a scatter plot in the terminal")]
pub struct Cli {
    /// Base URL of the embedding backend
    #[arg(long, env = "EMBEDVIZ_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "EMBEDVIZ_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Number of embedding components to preview (10-30)
    #[arg(long, value_parser = clap::value_parser!(u16).range(10..=30))]
    pub preview: Option<u16>,

    /// Behaviour when a third point is clicked
    #[arg(long, value_enum)]
    pub on_third: Option<OverflowPolicy>,

    /// Log file path
    #[arg(long, env = "EMBEDVIZ_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.preview {
            config.preview_components = usize::from(n);
        }
        if let Some(policy) = self.on_third {
            config.overflow_policy = policy;
        }
        if let Some(path) = self.log_file {
            config.log_file = path;
        }
        config
    }
}

/// Global commands list
pub const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show keys and commands"),
    ("/refresh", "Reload all points"),
    ("/deselect", "Clear the selection"),
    ("/clear", "Delete all embeddings"),
    ("/health", "Check the backend"),
    ("/quit", "Exit"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_config() {
        let config = Cli::parse_from(["embedviz"]).into_config();
        let default = Config::default();
        assert_eq!(config.api_url, default.api_url);
        assert_eq!(config.preview_components, 10);
        assert_eq!(config.overflow_policy, OverflowPolicy::EvictOldest);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Cli::parse_from([
            "embedviz",
            "--api-url",
            "http://10.0.0.2:9000",
            "--preview",
            "20",
            "--on-third",
            "reject-new",
        ])
        .into_config();
        assert_eq!(config.api_url, "http://10.0.0.2:9000");
        assert_eq!(config.preview_components, 20);
        assert_eq!(config.overflow_policy, OverflowPolicy::RejectNew);
    }

    #[test]
    fn test_cli_rejects_preview_out_of_range() {
        assert!(Cli::try_parse_from(["embedviz", "--preview", "5"]).is_err());
    }
}
