//! `costrecon-recon`: research-cost vs commission reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns one reconciled
//! row per key. No CLI or network dependencies.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod policy;
pub mod range;
pub mod reconcile;
pub mod summary;

pub use config::{JoinDirection, ReconConfig, ReportVariant};
pub use engine::{load_csv_rows, load_input, run};
pub use error::ReconError;
pub use model::{Dimension, RawRecord, ReconInput, ReconKey, ReconResult, ReconciliationRow, Side};
pub use policy::BrokerPolicy;
pub use range::DateRange;
pub use reconcile::reconcile;
