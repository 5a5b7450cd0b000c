//! Notification payloads and their wire form.

use serde::{Deserialize, Serialize};

/// What an alert is about. Subscribers filter on this tag instead of on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    General,
    TransitionApplied,
    TransitionRejected,
    SaleFailed,
    LowStock,
    OutOfStock,
    StockNormalized,
}

impl AlertCategory {
    /// Low-stock and out-of-stock alerts (logistics' concern).
    pub fn is_shortage(self) -> bool {
        matches!(self, AlertCategory::LowStock | AlertCategory::OutOfStock)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertCategory::General => "general",
            AlertCategory::TransitionApplied => "transition_applied",
            AlertCategory::TransitionRejected => "transition_rejected",
            AlertCategory::SaleFailed => "sale_failed",
            AlertCategory::LowStock => "low_stock",
            AlertCategory::OutOfStock => "out_of_stock",
            AlertCategory::StockNormalized => "stock_normalized",
        }
    }
}

impl core::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel of a notification.
///
/// `Stock` alerts carry the product they refer to so that bursts can be
/// debounced per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Channel {
    General,
    Stock { subject: String },
}

/// A textual alert tagged by category and, for stock alerts, by subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: Channel,
    pub category: AlertCategory,
    pub title: String,
    pub text: String,
}

impl Notification {
    pub fn general(
        category: AlertCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: Channel::General,
            category,
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn stock(
        subject: impl Into<String>,
        category: AlertCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: Channel::Stock {
                subject: subject.into(),
            },
            category,
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn is_stock_alert(&self) -> bool {
        matches!(self.channel, Channel::Stock { .. })
    }

    pub fn subject(&self) -> Option<&str> {
        match &self.channel {
            Channel::Stock { subject } => Some(subject),
            Channel::General => None,
        }
    }

    /// Encode into the JSON wire form.
    pub fn encode(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode from the JSON wire form.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
