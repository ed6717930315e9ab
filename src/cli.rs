//! Command-line interface definitions and argument parsing

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::data::DateRange;
use crate::pipeline::RfmParams;
use crate::scoring::BinningPolicy;
use crate::segment::Segment;

/// RFM customer segmentation from transactional sales data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the transactions CSV (columns: customer_id, item_id, sales, date)
    #[arg(short, long, default_value = "data.csv")]
    pub input: PathBuf,

    /// First day of the date range, inclusive (defaults to the earliest transaction)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the date range, inclusive (defaults to the latest transaction)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Segments to keep, comma-separated
    /// Example: --segments "Champions,Loyal,at-risk"
    #[arg(short, long, value_delimiter = ',')]
    pub segments: Vec<Segment>,

    /// How to score metrics with too few distinct values for five buckets
    #[arg(long, value_enum, default_value_t = BinningPolicy::Collapse)]
    pub policy: BinningPolicy,

    /// Write the RFM table to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write summary statistics to this JSON file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Write the score histogram SVG here (segment chart goes beside it)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Number of table rows printed to the console
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve the date range against the dataset bounds.
    ///
    /// Missing ends fall back to `bounds`; with no bounds either, there is no range.
    pub fn date_range(&self, bounds: Option<DateRange>) -> Option<DateRange> {
        let start = self.start.or(bounds.map(|b| b.start))?;
        let end = self.end.or(bounds.map(|b| b.end))?;
        Some(DateRange::new(start, end))
    }

    /// Pipeline parameters for the resolved date range
    pub fn rfm_params(&self, range: Option<DateRange>) -> RfmParams {
        RfmParams {
            range,
            segments: (!self.segments.is_empty())
                .then(|| self.segments.iter().copied().collect::<BTreeSet<Segment>>()),
            policy: self.policy,
        }
    }
}
