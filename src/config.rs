use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CANDIDATES: [&str; 4] = [
    "consolefold.toml",
    "consolefold.json",
    "consolefold.yaml",
    "consolefold.yml",
];

/// Configuration file structure for consolefold.
///
/// Holds the server to talk to, polling cadence and output preferences so they
/// need not be repeated on every run. Command-line flags override these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Server base URL, e.g. `https://ci.example.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API access token
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollConfig {
    /// Delay between console polls while watching a job
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,

    /// Show bodies of collapsed sections in text output
    #[serde(default)]
    pub expand_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Cache consoles of completed jobs
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    #[default]
    Text,
    Json,
    Summary,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_base_url() -> String {
    "http://localhost:8153".to_string()
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./consolefold.toml
    /// 3. ./consolefold.json
    /// 4. ./consolefold.yaml
    /// 5. ./consolefold.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::discover(Path::new(".")),
        }
    }

    fn discover(dir: &Path) -> Result<Self> {
        for candidate in CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                log::debug!("Using config file {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
