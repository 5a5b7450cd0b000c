//! Notification subscribers and the display surface they render into.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::notification::{AlertCategory, Channel, Notification};

/// Display surface (toast, status bar, log...).
pub trait NotificationSink: Send + Sync {
    fn display(&self, title: &str, text: &str);
}

impl<S> NotificationSink for Arc<S>
where
    S: NotificationSink + ?Sized,
{
    fn display(&self, title: &str, text: &str) {
        (**self).display(title, text)
    }
}

/// Receives alerts from the dispatcher.
///
/// Subscribers are registered once and live for the process lifetime.
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    /// Filter applied before [`Subscriber::receive`]. Defaults to "everything".
    fn interested_in(&self, _notification: &Notification) -> bool {
        true
    }

    fn receive(&self, notification: &Notification);

    /// Called when a wire payload could not be decoded. Defaults to ignoring it.
    fn receive_unparsed(&self, _raw: &str) {}

    /// Decode a wire payload and deliver it, falling back to
    /// [`Subscriber::receive_unparsed`] when it is malformed.
    fn receive_raw(&self, raw: &str) {
        match Notification::decode(raw) {
            Ok(notification) => {
                if self.interested_in(&notification) {
                    self.receive(&notification);
                }
            }
            Err(e) => {
                warn!(subscriber = self.name(), error = %e, "unparseable notification payload");
                self.receive_unparsed(raw);
            }
        }
    }
}

/// Logistics staff: only cares about shortages (low stock, out of stock).
pub struct LogisticsSubscriber {
    name: String,
    sink: Arc<dyn NotificationSink>,
}

impl LogisticsSubscriber {
    pub const FALLBACK_TITLE: &'static str = "Inventory alert";

    pub fn new(name: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

impl Subscriber for LogisticsSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn interested_in(&self, notification: &Notification) -> bool {
        notification.is_stock_alert() && notification.category.is_shortage()
    }

    fn receive(&self, notification: &Notification) {
        debug!(
            subscriber = %self.name,
            subject = notification.subject().unwrap_or_default(),
            category = %notification.category,
            "logistics alert received"
        );
        self.sink.display(&notification.title, &notification.text);
    }

    fn receive_unparsed(&self, raw: &str) {
        self.sink.display(Self::FALLBACK_TITLE, raw);
    }
}

/// Management: general alerts except failed sales, and stock recoveries.
///
/// Routine low/out-of-stock alerts are left to logistics.
pub struct ManagementSubscriber {
    name: String,
    sink: Arc<dyn NotificationSink>,
}

impl ManagementSubscriber {
    pub const FALLBACK_TITLE: &'static str = "General notification";

    pub fn new(name: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

impl Subscriber for ManagementSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn interested_in(&self, notification: &Notification) -> bool {
        match notification.channel {
            Channel::General => notification.category != AlertCategory::SaleFailed,
            Channel::Stock { .. } => notification.category == AlertCategory::StockNormalized,
        }
    }

    fn receive(&self, notification: &Notification) {
        debug!(
            subscriber = %self.name,
            category = %notification.category,
            "management notification received"
        );
        self.sink.display(&notification.title, &notification.text);
    }

    fn receive_unparsed(&self, raw: &str) {
        self.sink.display(Self::FALLBACK_TITLE, raw);
    }
}

/// A notification that reached a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displayed {
    pub title: String,
    pub text: String,
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct MemorySink {
    shown: Mutex<Vec<Displayed>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Displayed> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.shown().into_iter().map(|d| d.text).collect()
    }
}

impl NotificationSink for MemorySink {
    fn display(&self, title: &str, text: &str) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Displayed {
                title: title.to_string(),
                text: text.to_string(),
            });
    }
}

/// Sink that writes displayed notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn display(&self, title: &str, text: &str) {
        info!(title, text, "notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistics() -> (LogisticsSubscriber, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (LogisticsSubscriber::new("warehouse", sink.clone()), sink)
    }

    fn management() -> (ManagementSubscriber, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (ManagementSubscriber::new("manager", sink.clone()), sink)
    }

    fn stock(category: AlertCategory) -> Notification {
        Notification::stock("SKU-1", category, "Inventory alert", category.as_str())
    }

    #[test]
    fn logistics_reacts_only_to_shortages() {
        let (sub, _) = logistics();

        assert!(sub.interested_in(&stock(AlertCategory::LowStock)));
        assert!(sub.interested_in(&stock(AlertCategory::OutOfStock)));
        assert!(!sub.interested_in(&stock(AlertCategory::StockNormalized)));
        assert!(!sub.interested_in(&Notification::general(
            AlertCategory::General,
            "Order updated",
            "processed"
        )));
        // Shortage category on the general channel is still not a stock alert.
        assert!(!sub.interested_in(&Notification::general(
            AlertCategory::LowStock,
            "x",
            "y"
        )));
    }

    #[test]
    fn management_skips_failed_sales_and_routine_shortages() {
        let (sub, _) = management();

        assert!(sub.interested_in(&Notification::general(
            AlertCategory::TransitionApplied,
            "Order updated",
            "shipped"
        )));
        assert!(!sub.interested_in(&Notification::general(
            AlertCategory::SaleFailed,
            "Sale failed",
            "out of stock"
        )));
        assert!(sub.interested_in(&stock(AlertCategory::StockNormalized)));
        assert!(!sub.interested_in(&stock(AlertCategory::LowStock)));
        assert!(!sub.interested_in(&stock(AlertCategory::OutOfStock)));
    }

    #[test]
    fn raw_payloads_are_decoded_and_filtered() {
        let (sub, sink) = logistics();

        sub.receive_raw(&stock(AlertCategory::LowStock).encode());
        sub.receive_raw(&stock(AlertCategory::StockNormalized).encode());

        assert_eq!(sink.texts(), vec!["low_stock".to_string()]);
    }

    #[test]
    fn malformed_payload_falls_back_to_raw_text() {
        let (log_sub, log_sink) = logistics();
        let (mgmt_sub, mgmt_sink) = management();

        log_sub.receive_raw("STOCK_ALERT::17");
        mgmt_sub.receive_raw("not json at all");

        assert_eq!(
            log_sink.shown(),
            vec![Displayed {
                title: LogisticsSubscriber::FALLBACK_TITLE.to_string(),
                text: "STOCK_ALERT::17".to_string(),
            }]
        );
        assert_eq!(mgmt_sink.texts(), vec!["not json at all".to_string()]);
    }
}
