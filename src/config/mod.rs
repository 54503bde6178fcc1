//! Configuration management
//!
//! This module handles loading and parsing configuration for the ParkWise engine.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::models::{SpotCategory, MAX_HOURLY_RATE};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Facility and billing configuration
    #[serde(default)]
    pub parking: ParkingConfig,
    /// Admin gate configuration
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the entry/exit kiosk frontend)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/parkwise.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// How the allocator breaks ties between equally valid free spots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Uniform random choice among candidates (default)
    #[default]
    Random,
    /// Lowest spot id first, in natural order
    LowestId,
}

/// Facility and billing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingConfig {
    /// Plan durations (hours) a driver may choose at entry
    #[serde(default = "default_plan_hours")]
    pub plan_hours: Vec<u32>,
    /// Base hourly rate used when the schedule is initialized or reset
    #[serde(default = "default_base_rate")]
    pub default_base_rate: f64,
    /// Overtime hourly rate used when the schedule is initialized or reset
    #[serde(default = "default_overtime_rate")]
    pub default_overtime_rate: f64,
    /// Spot tie-break strategy
    #[serde(default)]
    pub selection: SelectionStrategy,
    /// Fixed seed for the random strategy (reproducible assignments)
    #[serde(default)]
    pub selection_seed: Option<u64>,
    /// Spots created when the inventory is empty at startup
    #[serde(default)]
    pub initial_spots: InitialSpots,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            plan_hours: default_plan_hours(),
            default_base_rate: default_base_rate(),
            default_overtime_rate: default_overtime_rate(),
            selection: SelectionStrategy::default(),
            selection_seed: None,
            initial_spots: InitialSpots::default(),
        }
    }
}

fn default_plan_hours() -> Vec<u32> {
    vec![4, 8]
}

fn default_base_rate() -> f64 {
    40.0
}

fn default_overtime_rate() -> f64 {
    60.0
}

/// Per-category spot counts for seeding an empty inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialSpots {
    #[serde(default = "default_regular_spots")]
    pub regular: u32,
    #[serde(default = "default_disability_spots")]
    pub disability: u32,
    #[serde(default)]
    pub electric: u32,
}

impl Default for InitialSpots {
    fn default() -> Self {
        Self {
            regular: default_regular_spots(),
            disability: default_disability_spots(),
            electric: 0,
        }
    }
}

fn default_regular_spots() -> u32 {
    2
}

fn default_disability_spots() -> u32 {
    1
}

impl InitialSpots {
    /// Counts paired with their category, in seeding order
    pub fn counts(&self) -> [(SpotCategory, u32); 3] {
        [
            (SpotCategory::Regular, self.regular),
            (SpotCategory::Disability, self.disability),
            (SpotCategory::Electric, self.electric),
        ]
    }
}

/// Admin gate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Shared token required on admin routes; admin routes are open when unset
    #[serde(default)]
    pub token: Option<String>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - PARKWISE_SERVER_HOST
    /// - PARKWISE_SERVER_PORT
    /// - PARKWISE_SERVER_CORS_ORIGIN
    /// - PARKWISE_DATABASE_DRIVER
    /// - PARKWISE_DATABASE_URL
    /// - PARKWISE_PARKING_SELECTION
    /// - PARKWISE_ADMIN_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parking.plan_hours.is_empty() {
            return Err(ConfigError::ValidationError(
                "parking.plan_hours must list at least one plan".to_string(),
            ));
        }
        if self.parking.plan_hours.contains(&0) {
            return Err(ConfigError::ValidationError(
                "parking.plan_hours must not contain 0".to_string(),
            ));
        }
        for (name, rate) in [
            ("default_base_rate", self.parking.default_base_rate),
            ("default_overtime_rate", self.parking.default_overtime_rate),
        ] {
            if !rate.is_finite() || !(0.0..=MAX_HOURLY_RATE).contains(&rate) {
                return Err(ConfigError::ValidationError(format!(
                    "parking.{} must be a number between 0 and {}",
                    name, MAX_HOURLY_RATE
                )));
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("PARKWISE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PARKWISE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("PARKWISE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("PARKWISE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("PARKWISE_DATABASE_URL") {
            self.database.url = url;
        }

        // Parking configuration
        if let Ok(selection) = std::env::var("PARKWISE_PARKING_SELECTION") {
            match selection.to_lowercase().as_str() {
                "random" => self.parking.selection = SelectionStrategy::Random,
                "lowest_id" => self.parking.selection = SelectionStrategy::LowestId,
                _ => {}
            }
        }

        // Admin configuration
        if let Ok(token) = std::env::var("PARKWISE_ADMIN_TOKEN") {
            self.admin.token = if token.is_empty() { None } else { Some(token) };
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
