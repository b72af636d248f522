//! `costrecon-alert`: model-metric threshold check with notification fan-out.
//!
//! Blocking HTTP throughout (no async runtime). One evaluation cycle:
//! optionally trigger the training job and poll it, read the newest run's
//! metric, compare to the threshold, and notify every configured sink
//! best-effort.

pub mod check;
pub mod databricks;
pub mod error;
pub mod handler;
mod http;
pub mod notify;
pub mod poll;
pub mod settings;
pub mod sink;

pub use check::{evaluate, AnomalyCheck};
pub use databricks::{ExperimentClient, JobClient, MetricReading, RunState};
pub use error::AlertError;
pub use handler::{handle, HandlerResponse};
pub use notify::{notify, notify_built, notify_parallel, AlertOrigin, NotifyReport};
pub use poll::{poll_until_ready, Poller};
pub use settings::AlertSettings;
pub use sink::{Notification, NotificationSink, Severity, SinkKind};
