pub(crate) mod error;
pub(crate) mod types;
pub(crate) mod view;
pub(crate) mod store;
pub(crate) mod notification;
pub(crate) mod fetcher;
pub(crate) mod ingest;
pub(crate) mod dashboard;
pub(crate) mod presentation;

#[cfg(test)]
pub(crate) mod testing;

pub use dashboard::{spawn_dashboard_refresher, Dashboard};
pub use fetcher::spawn_snapshot_fetcher;
pub use ingest::spawn_push_processor;
pub use notification::{spawn_notification_processor, LogNotifier, NotificationPolicy, Notifier, NotifyEvent};
pub use presentation::spawn_dashboard_logger;
pub use store::AlertStore;
pub use view::FilterCriteria;
