//! Transaction dataset handling using Polars: loading, schema validation and
//! inclusive date-range filtering.

use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::debug;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, RfmError};

pub const CUSTOMER_ID: &str = "customer_id";
pub const ITEM_ID: &str = "item_id";
pub const SALES: &str = "sales";
pub const DATE: &str = "date";

/// Day number column of a [`TransactionSet`] (days since 1970-01-01).
pub const DAY: &str = "day";

/// Columns every transaction dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [CUSTOMER_ID, ITEM_ID, SALES, DATE];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A single sales transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: String,
    pub item_id: String,
    pub sales: f64,
    pub date: NaiveDate,
}

impl Transaction {
    pub fn new(customer_id: &str, item_id: &str, sales: f64, date: NaiveDate) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            item_id: item_id.to_string(),
            sales,
            date,
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// A range whose start lies after its end selects nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Convert a calendar date to its day number (days since 1970-01-01).
pub fn to_day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert a day number back to a calendar date.
pub fn from_day_number(day: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(day + UNIX_EPOCH_DAYS_FROM_CE)
}

/// Build a transaction dataset from in-memory records
pub fn transactions_frame(transactions: &[Transaction]) -> Result<DataFrame> {
    let customer_ids: Vec<String> = transactions.iter().map(|t| t.customer_id.clone()).collect();
    let item_ids: Vec<String> = transactions.iter().map(|t| t.item_id.clone()).collect();
    let sales: Vec<f64> = transactions.iter().map(|t| t.sales).collect();
    let days: Vec<i32> = transactions.iter().map(|t| to_day_number(t.date)).collect();

    let df = DataFrame::new(vec![
        Column::new(CUSTOMER_ID.into(), customer_ids),
        Column::new(ITEM_ID.into(), item_ids),
        Column::new(SALES.into(), sales),
        Column::new(DATE.into(), days).cast(&DataType::Date)?,
    ])?;

    Ok(df)
}

/// Load a transactions CSV file into a DataFrame.
///
/// Dates are left as read; [`TransactionSet::new`] accepts date, datetime and
/// ISO-8601 string columns.
pub fn load_transactions_csv(file_path: impl AsRef<Path>) -> Result<DataFrame> {
    let file_path = file_path.as_ref();
    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .finish()?
        .collect()?;

    debug!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        file_path.display()
    );
    Ok(df)
}

/// Check that the dataset carries every required column with a usable type.
///
/// All missing columns are reported together.
pub fn validate_schema(df: &DataFrame) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(RfmError::Schema { missing });
    }

    let sales = df.column(SALES)?;
    if !is_numeric(sales.dtype()) {
        return Err(RfmError::ColumnType {
            column: SALES.to_string(),
            dtype: sales.dtype().to_string(),
            expected: "a numeric column",
        });
    }

    let date = df.column(DATE)?;
    if !matches!(
        date.dtype(),
        DataType::Date | DataType::Datetime(_, _) | DataType::String
    ) {
        return Err(RfmError::ColumnType {
            column: DATE.to_string(),
            dtype: date.dtype().to_string(),
            expected: "a date, datetime or string column",
        });
    }

    Ok(())
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Day numbers of the `date` column, one per row. Nulls stay null.
pub fn day_numbers(df: &DataFrame) -> Result<Vec<Option<i32>>> {
    let date = df.column(DATE)?;

    match date.dtype() {
        DataType::Date => {
            let days = date.cast(&DataType::Int32)?;
            let days: Vec<Option<i32>> = days.i32()?.into_iter().collect();
            Ok(days)
        }
        DataType::Datetime(_, _) => {
            let days = date.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            let days: Vec<Option<i32>> = days.i32()?.into_iter().collect();
            Ok(days)
        }
        DataType::String => date
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value.map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => parse_date(text)
                    .map(|d| Some(to_day_number(d)))
                    .ok_or_else(|| RfmError::InvalidDate {
                        row,
                        value: text.to_string(),
                    }),
            })
            .collect(),
        other => Err(RfmError::ColumnType {
            column: DATE.to_string(),
            dtype: other.to_string(),
            expected: "a date, datetime or string column",
        }),
    }
}

/// Parse an ISO-8601 date, datetime or RFC 3339 timestamp, keeping the date.
fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Earliest and latest of the given day numbers, ignoring nulls.
fn bounds_of(days: &[Option<i32>]) -> Option<DateRange> {
    let min = days.iter().flatten().min().copied();
    let max = days.iter().flatten().max().copied();

    match (min.and_then(from_day_number), max.and_then(from_day_number)) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        _ => None,
    }
}

/// A validated transaction dataset with dates resolved to day numbers.
///
/// Validation and date parsing happen once, in [`TransactionSet::new`]; the
/// bounds and every date-range filter reuse the result.
#[derive(Debug, Clone)]
pub struct TransactionSet {
    /// Columns `customer_id`, `item_id`, `sales` (as f64) and `day`
    frame: DataFrame,
    bounds: Option<DateRange>,
}

impl TransactionSet {
    pub fn new(df: &DataFrame) -> Result<Self> {
        validate_schema(df)?;
        let days = day_numbers(df)?;
        let bounds = bounds_of(&days);

        let mut frame = df.select([CUSTOMER_ID, ITEM_ID, SALES])?;
        frame.with_column(Column::new(DAY.into(), days))?;
        let frame = frame
            .lazy()
            .with_column(col(SALES).cast(DataType::Float64))
            .collect()?;

        Ok(Self { frame, bounds })
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Earliest and latest transaction dates, or `None` when no row has a date.
    ///
    /// This is the default range when the caller supplies none.
    pub fn bounds(&self) -> Option<DateRange> {
        self.bounds
    }

    /// Restrict transactions to those dated within `range`, both ends inclusive.
    ///
    /// Rows with a null date are dropped. An empty result is not an error.
    pub fn filter_range(&self, range: &DateRange) -> Result<DataFrame> {
        let start = to_day_number(range.start);
        let end = to_day_number(range.end);

        let filtered = self
            .frame
            .clone()
            .lazy()
            .filter(col(DAY).gt_eq(lit(start)).and(col(DAY).lt_eq(lit(end))))
            .collect()?;

        debug!(
            "Date filter {}..={} kept {} of {} rows",
            range.start,
            range.end,
            filtered.height(),
            self.frame.height()
        );
        Ok(filtered)
    }
}

/// Earliest and latest transaction dates, or `None` for a dataset with no dates.
pub fn date_bounds(df: &DataFrame) -> Result<Option<DateRange>> {
    Ok(TransactionSet::new(df)?.bounds())
}

/// Restrict transactions to those dated within `range`, both ends inclusive.
///
/// The result has the columns `customer_id`, `item_id`, `sales` (as f64) and
/// `day`. Prefer [`TransactionSet`] when filtering the same dataset repeatedly.
pub fn filter_date_range(df: &DataFrame, range: &DateRange) -> Result<DataFrame> {
    TransactionSet::new(df)?.filter_range(range)
}
