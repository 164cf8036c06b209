use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::extractors::DEFAULT_STRATEGIES;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub extractors: ExtractorsConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP settings for page retrieval
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra attempts for timeouts, connection errors and 5xx responses
    #[serde(default)]
    pub retry_attempts: u32,
    /// Base delay between retries in milliseconds, multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            retry_attempts: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    /// Maximum number of pages fetched at once; 1 processes URLs one by one
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deadline for the whole run in seconds, none by default
    #[serde(default)]
    pub run_timeout: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            run_timeout: None,
        }
    }
}

/// Configuration for recipe extractors
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorsConfig {
    /// Order in which layout strategies should be tried
    #[serde(default = "default_extractors")]
    pub order: Vec<String>,
}

impl Default for ExtractorsConfig {
    fn default() -> Self {
        Self {
            order: default_extractors(),
        }
    }
}

/// Page break inserted between two recipes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBreak {
    #[default]
    NewPage,
    /// Start every recipe on the front of a new sheet when printing duplex
    ClearDoublePage,
}

/// Layout of the generated LaTeX document
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    /// Main font; requires XeLaTeX or LuaLaTeX
    #[serde(default = "default_font")]
    pub font: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: u8,
    #[serde(default = "default_ingredient_columns")]
    pub ingredient_columns: u8,
    #[serde(default = "default_true")]
    pub include_images: bool,
    #[serde(default)]
    pub page_break: PageBreak,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            font: default_font(),
            font_size: default_font_size(),
            ingredient_columns: default_ingredient_columns(),
            include_images: true,
            page_break: PageBreak::default(),
        }
    }
}

/// Where the binary writes its artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// `chrono` format string for the per-run directory name
    #[serde(default = "default_dir_format")]
    pub dir_format: String,
    #[serde(default = "default_recipes_file")]
    pub recipes_file: String,
    #[serde(default = "default_ingredients_file")]
    pub ingredients_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir_format: default_dir_format(),
            recipes_file: default_recipes_file(),
            ingredients_file: default_ingredients_file(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; Mealprint/1.0)".to_string()
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

fn default_extractors() -> Vec<String> {
    DEFAULT_STRATEGIES.iter().map(|s| s.to_string()).collect()
}

fn default_font() -> Option<String> {
    Some("Andika".to_string())
}

fn default_font_size() -> u8 {
    12
}

fn default_ingredient_columns() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

fn default_dir_format() -> String {
    "%Y%m%d".to_string()
}

fn default_recipes_file() -> String {
    "recipes.tex".to_string()
}

fn default_ingredients_file() -> String {
    "groceries.txt".to_string()
}

impl AppConfig {
    /// Load configuration from `mealprint.toml` and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        load_config(None)
    }
}

/// Load configuration from file and environment variables
///
/// Configuration is loaded with the following priority (highest to lowest):
/// 1. Environment variables with MEALPRINT__ prefix
/// 2. The given file, or mealprint.toml in the current directory if present
/// 3. Default values
///
/// Environment variable format: MEALPRINT__FETCH__TIMEOUT
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        // An explicitly requested file must exist
        Some(path) => File::from(path).required(true),
        None => File::with_name("mealprint").required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        // Use double underscore for nested: MEALPRINT__BATCH__CONCURRENCY
        .add_source(
            Environment::with_prefix("MEALPRINT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
