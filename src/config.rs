use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::models::FlowStage;

// ============================================================================
// Order Store Configuration
// ============================================================================
//
// Defaults match the reference booking system: GBP only, five minute leases
// granted at C2. Every value can be overridden from JSON or the environment.
//
// ============================================================================

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// The single currency this store accepts
    pub supported_currency: String,
    /// How long a lease holds the booking slot
    pub lease_duration_secs: u64,
    /// The only stage at which leases are granted
    pub lease_stage: FlowStage,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            supported_currency: "GBP".to_string(),
            lease_duration_secs: 300,
            lease_stage: FlowStage::C2,
        }
    }
}

impl StoreConfig {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }

    /// `now + lease_duration`, or None when the sum is not representable
    pub fn lease_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let duration = chrono::Duration::from_std(self.lease_duration()).ok()?;
        now.checked_add_signed(duration)
    }

    /// Leases must last a positive, representable amount of time
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lease_duration_secs == 0 || self.lease_expiry(Utc::now()).is_none() {
            anyhow::bail!("Lease duration out of range: {} seconds", self.lease_duration_secs);
        }
        Ok(())
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read overrides from BOOKING_SUPPORTED_CURRENCY, BOOKING_LEASE_DURATION_SECS
    /// and BOOKING_LEASE_STAGE
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(currency) = std::env::var("BOOKING_SUPPORTED_CURRENCY") {
            config.supported_currency = currency;
        }

        if let Ok(secs) = std::env::var("BOOKING_LEASE_DURATION_SECS") {
            config.lease_duration_secs = secs
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid BOOKING_LEASE_DURATION_SECS {:?}: {}", secs, e))?;
        }

        if let Ok(stage) = std::env::var("BOOKING_LEASE_STAGE") {
            config.lease_stage = stage.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }

        config.validate()?;
        Ok(config)
    }
}
