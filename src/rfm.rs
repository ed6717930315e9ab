//! Per-customer recency, frequency and monetary aggregation

use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;
use serde::Serialize;

use crate::data::{from_day_number, CUSTOMER_ID, DAY, ITEM_ID, SALES};
use crate::error::Result;

pub const RECENCY: &str = "recency";
pub const FREQUENCY: &str = "frequency";
pub const MONETARY: &str = "monetary";

const LAST_DAY: &str = "last_day";

/// Raw RFM values for one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the reference date and the latest purchase
    pub recency: i64,
    /// Number of transactions
    pub frequency: u32,
    /// Total sales
    pub monetary: f64,
}

/// Aggregated metrics with the reference date they were measured against
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Latest transaction date plus one day; `None` when nothing was aggregated
    pub reference_date: Option<NaiveDate>,
    /// One entry per distinct customer, ordered by customer_id
    pub customers: Vec<CustomerMetrics>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

/// Aggregate date-filtered transactions into one record per customer.
///
/// `filtered` is the output of [`crate::data::filter_date_range`]. Rows
/// without a customer_id are skipped. Frequency counts every row with an
/// item_id, duplicates included.
pub fn aggregate_customers(filtered: &DataFrame) -> Result<Aggregation> {
    let max_day = filtered.column(DAY)?.i32()?.max();

    let Some(max_day) = max_day else {
        info!("No transactions in the selected range; producing an empty customer set");
        return Ok(Aggregation::default());
    };
    let reference_day = max_day + 1;

    let rfm_df = filtered
        .clone()
        .lazy()
        .filter(col(CUSTOMER_ID).is_not_null())
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(DAY).max().alias(LAST_DAY),
            col(ITEM_ID).count().alias(FREQUENCY),
            col(SALES).sum().alias(MONETARY),
        ])
        .with_column((lit(reference_day) - col(LAST_DAY)).alias(RECENCY))
        .sort([CUSTOMER_ID], SortMultipleOptions::default())
        .select([
            col(CUSTOMER_ID).cast(DataType::String),
            col(RECENCY),
            col(FREQUENCY),
            col(MONETARY),
        ])
        .collect()?;

    let customers = extract_metrics(&rfm_df)?;
    let reference_date = from_day_number(reference_day);

    if let Some(date) = reference_date {
        info!("Reference date {} for {} customers", date, customers.len());
    }

    Ok(Aggregation {
        reference_date,
        customers,
    })
}

fn extract_metrics(rfm_df: &DataFrame) -> Result<Vec<CustomerMetrics>> {
    let customer_ids = rfm_df.column(CUSTOMER_ID)?;
    let customer_ids = customer_ids.str()?;

    let recency = rfm_df.column(RECENCY)?.cast(&DataType::Int64)?;
    let recency = recency.i64()?;

    let frequency = rfm_df.column(FREQUENCY)?.cast(&DataType::UInt32)?;
    let frequency = frequency.u32()?;

    let monetary = rfm_df.column(MONETARY)?.cast(&DataType::Float64)?;
    let monetary = monetary.f64()?;

    let customers: Vec<CustomerMetrics> = customer_ids
        .into_iter()
        .zip(recency.into_iter())
        .zip(frequency.into_iter())
        .zip(monetary.into_iter())
        .filter_map(|(((id, r), f), m)| {
            Some(CustomerMetrics {
                customer_id: id?.to_string(),
                recency: r?,
                frequency: f.unwrap_or(0),
                monetary: m.unwrap_or(0.0),
            })
        })
        .collect();

    debug!("Aggregated {} customers", customers.len());
    Ok(customers)
}
