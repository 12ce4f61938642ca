//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::{Amount, CommissionPolicy};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Emit JSON log lines instead of the pretty formatter
    pub log_json: bool,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,

    /// Commission rate charged to the sender (0.015 = 1.5%)
    pub commission_rate: Decimal,

    /// Largest amount a single transfer may move
    pub max_transfer_amount: Decimal,

    /// Row lock wait bound inside the transfer scope
    pub lock_timeout_ms: u64,

    /// Page size used when the client does not send `per_page`
    pub transactions_per_page: u32,

    /// Upper bound for a client supplied `per_page`
    pub max_per_page: u32,

    /// Capacity of the transfer notification queue
    pub notification_queue_capacity: usize,

    /// How often expired idempotency keys are purged
    pub idempotency_cleanup_interval_secs: u64,
}

/// Settings consumed by the transfer engine
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub commission: CommissionPolicy,
    pub max_amount: Decimal,
    pub lock_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            commission: CommissionPolicy::default(),
            max_amount: Amount::MAX,
            lock_timeout: Duration::from_millis(5000),
        }
    }
}

/// Settings consumed by the transaction query service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 15,
            max_per_page: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 3000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let log_json = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => true,
            Some("pretty") => false,
            Some(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
            None => environment == "production",
        };

        let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", true)?;

        let commission_rate = parse_or(&lookup, "COMMISSION_RATE", CommissionPolicy::DEFAULT_RATE)?;
        if CommissionPolicy::new(commission_rate).is_err() {
            return Err(ConfigError::InvalidValue("COMMISSION_RATE"));
        }

        let max_transfer_amount = parse_or(&lookup, "MAX_TRANSFER_AMOUNT", Amount::MAX)?;
        if max_transfer_amount < Amount::MIN || max_transfer_amount > Amount::MAX {
            return Err(ConfigError::InvalidValue("MAX_TRANSFER_AMOUNT"));
        }

        let lock_timeout_ms = parse_or(&lookup, "LOCK_TIMEOUT_MS", 5000)?;
        if lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("LOCK_TIMEOUT_MS"));
        }

        let transactions_per_page = parse_or(&lookup, "TRANSACTIONS_PER_PAGE", 15)?;
        let max_per_page = parse_or(&lookup, "MAX_PER_PAGE", 100)?;
        if transactions_per_page == 0 || transactions_per_page > max_per_page {
            return Err(ConfigError::InvalidValue("TRANSACTIONS_PER_PAGE"));
        }

        let notification_queue_capacity = parse_or(&lookup, "NOTIFICATION_QUEUE_CAPACITY", 1024)?;
        if notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("NOTIFICATION_QUEUE_CAPACITY"));
        }

        let idempotency_cleanup_interval_secs =
            parse_or(&lookup, "IDEMPOTENCY_CLEANUP_INTERVAL_SECS", 300)?;
        if idempotency_cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("IDEMPOTENCY_CLEANUP_INTERVAL_SECS"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            log_json,
            run_migrations,
            commission_rate,
            max_transfer_amount,
            lock_timeout_ms,
            transactions_per_page,
            max_per_page,
            notification_queue_capacity,
            idempotency_cleanup_interval_secs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Transfer engine settings
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            // Rate was range-checked during loading.
            commission: CommissionPolicy::new(self.commission_rate).unwrap_or_default(),
            max_amount: self.max_transfer_amount,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }

    /// Query service settings
    pub fn pagination_config(&self) -> PaginationConfig {
        PaginationConfig {
            default_per_page: self.transactions_per_page,
            max_per_page: self.max_per_page,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
