//! Storefront notifications.
//!
//! Alerts raised by the order workflow and the inventory manager are fanned
//! out to subscribers (logistics, management) through a
//! [`NotificationDispatcher`], which rate-limits the general channel and
//! debounces stock alerts per product.

pub mod clock;
pub mod dispatcher;
pub mod notification;
pub mod rate_limit;
pub mod scheduler;
pub mod subscriber;
pub mod ui;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Delivery, DispatcherStats, NotificationConfig, NotificationDispatcher};
pub use notification::{AlertCategory, Channel, Notification};
pub use rate_limit::RateWindow;
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, Task, TimerThread};
pub use subscriber::{
    Displayed, LogisticsSubscriber, ManagementSubscriber, MemorySink, NotificationSink,
    Subscriber, TracingSink,
};
pub use ui::{InlineDispatch, UiDispatch, UiJob, UiPump, UiQueue};
