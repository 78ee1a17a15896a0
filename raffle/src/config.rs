//! Configuration management for the raffle desk.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::content::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::engine::DemoSeeding;
use crate::error::Result;
use crate::types::{Money, RaffleConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Raffle parameters
    pub raffle: RaffleSettings,
    /// Ticket store location
    pub storage: StorageConfig,
    /// Demo seeding of an empty store
    pub seeding: SeedingConfig,
    /// Simulated latencies and display durations
    pub timing: TimingConfig,
    /// Themed copy generation
    pub content: ContentConfig,
}

/// Raffle parameters as configured; validated by [`Config::raffle`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleSettings {
    /// Price of one ticket (decimal)
    pub ticket_price: f64,
    /// Number of tickets
    pub total_numbers: u32,
    /// Currency symbol shown next to prices
    pub currency_symbol: String,
}

/// Ticket store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding sold tickets; in-memory store when unset
    pub path: Option<PathBuf>,
}

/// Demo seeding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedingConfig {
    /// Seed an empty store with mock sales
    pub enabled: bool,
    /// Share of tickets to mark sold
    pub ratio: f64,
    /// Fixed RNG seed for repeatable demos
    pub seed: Option<u64>,
}

/// Timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Simulated reservation round trip in milliseconds
    pub reservation_latency_ms: u64,
    /// How long the success message stays up, in milliseconds
    pub success_display_ms: u64,
}

/// Themed copy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Anthropic API key; copy generation is skipped when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// API base URL
    pub api_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, one call per variable
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            raffle: RaffleSettings {
                ticket_price: parsed(&lookup, "RAFFLE_TICKET_PRICE").unwrap_or(10.0),
                total_numbers: parsed(&lookup, "RAFFLE_TOTAL_NUMBERS").unwrap_or(200),
                currency_symbol: lookup("RAFFLE_CURRENCY_SYMBOL")
                    .unwrap_or_else(|| "R$".to_string()),
            },
            storage: StorageConfig {
                path: lookup("RAFFLE_STORE_PATH")
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
            },
            seeding: SeedingConfig {
                enabled: parsed(&lookup, "RAFFLE_SEED_DEMO_DATA").unwrap_or(false),
                ratio: parsed(&lookup, "RAFFLE_SEED_RATIO").unwrap_or(0.1),
                seed: parsed(&lookup, "RAFFLE_SEED"),
            },
            timing: TimingConfig {
                reservation_latency_ms: parsed(&lookup, "RAFFLE_RESERVATION_LATENCY_MS")
                    .unwrap_or(800),
                success_display_ms: parsed(&lookup, "RAFFLE_SUCCESS_DISPLAY_MS")
                    .unwrap_or(2_500),
            },
            content: ContentConfig {
                api_key: lookup("ANTHROPIC_API_KEY").filter(|s| !s.trim().is_empty()),
                model: lookup("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                api_url: lookup("ANTHROPIC_API_URL")
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            },
        }
    }

    /// Validated raffle parameters
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::InvalidPrice`](crate::error::RaffleError::InvalidPrice)
    /// for a negative price and
    /// [`RaffleError::NoTickets`](crate::error::RaffleError::NoTickets) for zero tickets.
    pub fn raffle(&self) -> Result<RaffleConfig> {
        RaffleConfig::new(
            Money::from_decimal(self.raffle.ticket_price)?,
            self.raffle.total_numbers,
            self.raffle.currency_symbol.clone(),
        )
    }

    /// Seeding mode for the engine
    #[must_use]
    pub const fn seeding(&self) -> DemoSeeding {
        if self.seeding.enabled {
            DemoSeeding::Enabled {
                ratio: self.seeding.ratio,
                seed: self.seeding.seed,
            }
        } else {
            DemoSeeding::Disabled
        }
    }

    /// Simulated reservation latency
    #[must_use]
    pub const fn reservation_latency(&self) -> Duration {
        Duration::from_millis(self.timing.reservation_latency_ms)
    }

    /// Success display duration
    #[must_use]
    pub const fn success_display(&self) -> Duration {
        Duration::from_millis(self.timing.success_display_ms)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
