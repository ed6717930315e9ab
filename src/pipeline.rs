//! RFM pipeline: validate, filter by date, aggregate, score and segment

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;
use serde::Serialize;

use crate::data::{DateRange, TransactionSet};
use crate::error::Result;
use crate::rfm::{aggregate_customers, CustomerMetrics};
use crate::scoring::{score_customers, BinningPolicy, RfmScores};
use crate::segment::Segment;

/// Caller-supplied parameters for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RfmParams {
    /// Inclusive date range; `None` uses the dataset's full date span
    pub range: Option<DateRange>,
    /// Segments to keep in the output; `None` keeps all
    pub segments: Option<BTreeSet<Segment>>,
    pub policy: BinningPolicy,
}

impl RfmParams {
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_segments(mut self, segments: impl IntoIterator<Item = Segment>) -> Self {
        self.segments = Some(segments.into_iter().collect());
        self
    }

    pub fn with_policy(mut self, policy: BinningPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Scored and segmented RFM record for one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRfm {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_code: String,
    pub rfm_score: u8,
    pub segment: Segment,
}

impl CustomerRfm {
    pub fn new(metrics: CustomerMetrics, scores: RfmScores) -> Self {
        Self {
            customer_id: metrics.customer_id,
            recency: metrics.recency,
            frequency: metrics.frequency,
            monetary: metrics.monetary,
            recency_score: scores.recency,
            frequency_score: scores.frequency,
            monetary_score: scores.monetary,
            rfm_code: scores.code(),
            rfm_score: scores.total(),
            segment: Segment::classify(&scores),
        }
    }

    pub fn scores(&self) -> RfmScores {
        RfmScores::new(self.recency_score, self.frequency_score, self.monetary_score)
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RfmTable {
    /// Range the transactions were filtered to
    pub range: Option<DateRange>,
    pub reference_date: Option<NaiveDate>,
    /// One record per customer, ordered by customer_id
    pub records: Vec<CustomerRfm>,
}

/// Summary statistics over an [`RfmTable`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmSummary {
    pub customers: usize,
    pub range: Option<DateRange>,
    pub reference_date: Option<NaiveDate>,
    pub segment_counts: BTreeMap<Segment, usize>,
    /// Number of customers per rfm_score, 3..=15
    pub score_distribution: BTreeMap<u8, usize>,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub mean_monetary: Option<f64>,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct segments in order of first appearance
    pub fn segments_present(&self) -> Vec<Segment> {
        let mut seen = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.segment) {
                seen.push(record.segment);
            }
        }
        seen
    }

    /// Keep only records whose segment is listed. Scores are untouched.
    pub fn retain_segments(&mut self, segments: &BTreeSet<Segment>) {
        self.records.retain(|r| segments.contains(&r.segment));
    }

    pub fn get(&self, customer_id: &str) -> Option<&CustomerRfm> {
        self.records.iter().find(|r| r.customer_id == customer_id)
    }

    pub fn summary(&self) -> RfmSummary {
        let mut segment_counts = BTreeMap::new();
        let mut score_distribution = BTreeMap::new();

        for record in &self.records {
            *segment_counts.entry(record.segment).or_insert(0) += 1;
            *score_distribution.entry(record.rfm_score).or_insert(0) += 1;
        }

        let n = self.records.len();
        let mean = |value: fn(&CustomerRfm) -> f64| {
            (n > 0).then(|| self.records.iter().map(value).sum::<f64>() / n as f64)
        };

        RfmSummary {
            customers: n,
            range: self.range,
            reference_date: self.reference_date,
            segment_counts,
            score_distribution,
            mean_recency: mean(|r| r.recency as f64),
            mean_frequency: mean(|r| r.frequency as f64),
            mean_monetary: mean(|r| r.monetary),
        }
    }

    /// Table as a DataFrame, one row per customer, for external exporters
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let records = &self.records;
        let score = |f: fn(&CustomerRfm) -> u8| -> Vec<u32> {
            records.iter().map(|r| f(r) as u32).collect()
        };

        let df = DataFrame::new(vec![
            Column::new(
                "customer_id".into(),
                records.iter().map(|r| r.customer_id.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                "recency".into(),
                records.iter().map(|r| r.recency).collect::<Vec<i64>>(),
            ),
            Column::new(
                "frequency".into(),
                records.iter().map(|r| r.frequency).collect::<Vec<u32>>(),
            ),
            Column::new(
                "monetary".into(),
                records.iter().map(|r| r.monetary).collect::<Vec<f64>>(),
            ),
            Column::new("recency_score".into(), score(|r| r.recency_score)),
            Column::new("frequency_score".into(), score(|r| r.frequency_score)),
            Column::new("monetary_score".into(), score(|r| r.monetary_score)),
            Column::new(
                "rfm_code".into(),
                records.iter().map(|r| r.rfm_code.clone()).collect::<Vec<String>>(),
            ),
            Column::new("rfm_score".into(), score(|r| r.rfm_score)),
            Column::new(
                "segment".into(),
                records
                    .iter()
                    .map(|r| r.segment.label().to_string())
                    .collect::<Vec<String>>(),
            ),
        ])?;

        Ok(df)
    }
}

/// Run the full RFM pipeline over a transaction dataset.
///
/// Every run recomputes from scratch. A range containing no transactions
/// yields an empty table rather than an error.
pub fn compute_rfm(transactions: &DataFrame, params: &RfmParams) -> Result<RfmTable> {
    compute_rfm_prepared(&TransactionSet::new(transactions)?, params)
}

/// Run the pipeline over an already validated [`TransactionSet`].
pub fn compute_rfm_prepared(transactions: &TransactionSet, params: &RfmParams) -> Result<RfmTable> {
    let Some(range) = params.range.or_else(|| transactions.bounds()) else {
        debug!("Dataset has no dated transactions");
        return Ok(RfmTable::default());
    };

    let filtered = transactions.filter_range(&range)?;
    let aggregation = aggregate_customers(&filtered)?;

    if aggregation.is_empty() {
        return Ok(RfmTable {
            range: Some(range),
            ..RfmTable::default()
        });
    }

    let scores = score_customers(&aggregation.customers, params.policy)?;

    let mut table = RfmTable {
        range: Some(range),
        reference_date: aggregation.reference_date,
        records: aggregation
            .customers
            .into_iter()
            .zip(scores)
            .map(|(metrics, scores)| CustomerRfm::new(metrics, scores))
            .collect(),
    };

    if let Some(segments) = &params.segments {
        table.retain_segments(segments);
        debug!("Segment filter kept {} customers", table.len());
    }

    Ok(table)
}
