//! RfmForge: RFM (Recency, Frequency, Monetary) customer segmentation
//!
//! The pipeline validates a transaction dataset, restricts it to an inclusive
//! date range, aggregates per-customer recency/frequency/monetary values,
//! scores each metric into quintiles and assigns a rule-based segment.

pub mod cli;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod rfm;
pub mod scoring;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{
    date_bounds, filter_date_range, load_transactions_csv, transactions_frame, validate_schema,
    DateRange, Transaction, TransactionSet,
};
pub use error::{Result, RfmError};
pub use pipeline::{compute_rfm, compute_rfm_prepared, CustomerRfm, RfmParams, RfmSummary, RfmTable};
pub use rfm::{aggregate_customers, CustomerMetrics};
pub use scoring::{score_customers, BinningPolicy, Metric, RfmScores};
pub use segment::Segment;
