//! Notification fan-out with anti-spam and per-subject debounce.
//!
//! Two channels:
//!
//! - **General** (`notify`): delivered immediately, but at most
//!   `max_per_window` deliveries are admitted within any trailing `window`;
//!   extra notifications are dropped. `notify_unthrottled` skips the window
//!   for alerts that must never be lost.
//! - **Stock alerts** (`notify_stock_alert`): delayed by `debounce`. A newer
//!   alert for the same subject cancels the pending one, so a burst collapses
//!   into a single delivery carrying the latest text. Not rate limited.
//!
//! Every delivery is marshaled through the [`UiDispatch`] boundary before any
//! subscriber sees it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::notification::{AlertCategory, Notification};
use crate::rate_limit::RateWindow;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::subscriber::Subscriber;
use crate::ui::UiDispatch;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Generic notifications admitted per window.
    pub max_per_window: usize,
    /// Length of the trailing anti-spam window.
    pub window: Duration,
    /// Delay before a stock alert is delivered.
    pub debounce: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_per_window: 5,
            window: Duration::from_millis(5_000),
            debounce: Duration::from_millis(500),
        }
    }
}

impl NotificationConfig {
    pub fn with_max_per_window(mut self, max: usize) -> Self {
        self.max_per_window = max;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// What happened to a generic notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    RateLimited,
}

/// Dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub delivered: u64,
    pub rate_limited: u64,
    pub stock_alerts_scheduled: u64,
    pub stock_alerts_delivered: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    rate_limited: AtomicU64,
    stock_alerts_scheduled: AtomicU64,
    stock_alerts_delivered: AtomicU64,
}

type SubscriberList = Arc<RwLock<Vec<Arc<dyn Subscriber>>>>;

/// Fans alerts out to registered subscribers.
///
/// Constructed explicitly and shared (`Arc`) by whoever raises alerts.
pub struct NotificationDispatcher {
    config: NotificationConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    ui: Arc<dyn UiDispatch>,
    subscribers: SubscriberList,
    window: Mutex<RateWindow>,
    pending: Mutex<HashMap<String, ScheduledTask>>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    pub fn new(
        config: NotificationConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        ui: Arc<dyn UiDispatch>,
    ) -> Self {
        let window = RateWindow::new(config.max_per_window, config.window);
        Self {
            config,
            clock,
            scheduler,
            ui,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            window: Mutex::new(window),
            pending: Mutex::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) {
        debug!(subscriber = subscriber.name(), "subscriber registered");
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Broadcast a general notification (category `General`).
    pub fn notify(&self, title: impl Into<String>, text: impl Into<String>) -> Delivery {
        self.notify_categorized(AlertCategory::General, title, text)
    }

    /// Broadcast a general-channel notification with an explicit category.
    pub fn notify_categorized(
        &self,
        category: AlertCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Delivery {
        let notification = Notification::general(category, title, text);
        if !self.admit(&notification.title) {
            return Delivery::RateLimited;
        }

        let subscribers = self.subscribers.clone();
        self.ui
            .dispatch(Box::new(move || fan_out(&subscribers, &notification)));
        Delivery::Delivered
    }

    /// Broadcast a general-channel notification outside the anti-spam window.
    ///
    /// Neither consumes nor checks a window slot.
    pub fn notify_unthrottled(
        &self,
        category: AlertCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) {
        let notification = Notification::general(category, title, text);
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.clone();
        self.ui
            .dispatch(Box::new(move || fan_out(&subscribers, &notification)));
    }

    /// Broadcast a wire-encoded payload; each subscriber decodes it and falls
    /// back to the raw text if it is malformed. Rate limited like `notify`.
    pub fn notify_raw(&self, payload: impl Into<String>) -> Delivery {
        let payload = payload.into();
        if !self.admit("raw") {
            return Delivery::RateLimited;
        }

        let subscribers = self.subscribers.clone();
        self.ui.dispatch(Box::new(move || {
            for subscriber in snapshot(&subscribers) {
                subscriber.receive_raw(&payload);
            }
        }));
        Delivery::Delivered
    }

    /// Schedule a debounced stock alert for `subject`, replacing any pending one.
    pub fn notify_stock_alert(
        &self,
        subject: impl Into<String>,
        category: AlertCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) {
        let subject = subject.into();
        let notification = Notification::stock(subject.clone(), category, title, text);

        let subscribers = self.subscribers.clone();
        let ui = self.ui.clone();
        let counters = self.counters.clone();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.get(&subject) {
            if previous.is_pending() {
                trace!(subject = %subject, "replacing pending stock alert");
            }
            previous.cancel();
        }

        let handle = self.scheduler.schedule(
            self.config.debounce,
            Box::new(move || {
                ui.dispatch(Box::new(move || {
                    counters.stock_alerts_delivered.fetch_add(1, Ordering::Relaxed);
                    fan_out(&subscribers, &notification);
                }));
            }),
        );
        pending.insert(subject, handle);
        self.counters
            .stock_alerts_scheduled
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Subjects whose latest stock alert has not fired yet.
    pub fn pending_stock_alerts(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|task| task.is_pending())
            .count()
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            rate_limited: self.counters.rate_limited.load(Ordering::Relaxed),
            stock_alerts_scheduled: self.counters.stock_alerts_scheduled.load(Ordering::Relaxed),
            stock_alerts_delivered: self.counters.stock_alerts_delivered.load(Ordering::Relaxed),
        }
    }

    fn admit(&self, title: &str) -> bool {
        let now = self.clock.now();
        let admitted = self
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_admit(now);

        if admitted {
            self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            debug!(title, "notification dropped by anti-spam window");
        }
        admitted
    }
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .field("subscribers", &self.subscriber_count())
            .field("stats", &self.stats())
            .finish()
    }
}

fn snapshot(subscribers: &SubscriberList) -> Vec<Arc<dyn Subscriber>> {
    subscribers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn fan_out(subscribers: &SubscriberList, notification: &Notification) {
    for subscriber in snapshot(subscribers) {
        if subscriber.interested_in(notification) {
            subscriber.receive(notification);
        }
    }
}
