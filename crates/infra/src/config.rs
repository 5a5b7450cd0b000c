//! Environment-driven configuration.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use storefront_inventory::InventoryConfig;
use storefront_notifications::NotificationConfig;

pub const RATE_LIMIT_MAX_VAR: &str = "STOREFRONT_RATE_LIMIT_MAX";
pub const RATE_LIMIT_WINDOW_MS_VAR: &str = "STOREFRONT_RATE_LIMIT_WINDOW_MS";
pub const DEBOUNCE_MS_VAR: &str = "STOREFRONT_DEBOUNCE_MS";
pub const LOW_STOCK_THRESHOLD_VAR: &str = "STOREFRONT_LOW_STOCK_THRESHOLD";

/// Top-level storefront configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub notifications: NotificationConfig,
    pub inventory: InventoryConfig,
}

impl StorefrontConfig {
    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryConfig) -> Self {
        self.inventory = inventory;
        self
    }

    /// Load from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// Invalid values are logged at warn level and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let notif = &defaults.notifications;

        let max_per_window =
            parse_or(&lookup, RATE_LIMIT_MAX_VAR, notif.max_per_window, |v: &usize| {
                *v > 0
            });
        let window_ms = parse_or(
            &lookup,
            RATE_LIMIT_WINDOW_MS_VAR,
            millis(notif.window),
            |v: &u64| *v > 0,
        );
        let debounce_ms = parse_or(&lookup, DEBOUNCE_MS_VAR, millis(notif.debounce), |_| true);
        let low_stock_threshold = parse_or(
            &lookup,
            LOW_STOCK_THRESHOLD_VAR,
            defaults.inventory.low_stock_threshold,
            |_| true,
        );

        Self {
            notifications: NotificationConfig::default()
                .with_max_per_window(max_per_window)
                .with_window(Duration::from_millis(window_ms))
                .with_debounce(Duration::from_millis(debounce_ms)),
            inventory: InventoryConfig::default().with_low_stock_threshold(low_stock_threshold),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn parse_or<T, F, V>(lookup: &F, key: &str, default: T, valid: V) -> T
where
    T: FromStr + Copy + core::fmt::Debug,
    F: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(var = key, value = %raw, ?default, "invalid configuration value; using default");
            default
        }
    }
}
