//! Writing RFM results to disk

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::error::Result;
use crate::pipeline::{RfmSummary, RfmTable};

/// Write the RFM table as CSV with a header row.
pub fn write_table_csv(table: &RfmTable, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    let mut df = table.to_dataframe()?;

    let mut file = File::create(output_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("RFM table ({} rows) saved to: {}", table.len(), output_path.display());
    Ok(())
}

/// Write summary statistics as pretty-printed JSON.
pub fn write_summary_json(summary: &RfmSummary, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    let writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(writer, summary)?;

    info!("Summary saved to: {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CustomerRfm;
    use crate::rfm::CustomerMetrics;
    use crate::scoring::RfmScores;
    use tempfile::tempdir;

    fn sample_table() -> RfmTable {
        let records = vec![
            CustomerRfm::new(
                CustomerMetrics {
                    customer_id: "17850".to_string(),
                    recency: 2,
                    frequency: 9,
                    monetary: 812.5,
                },
                RfmScores::new(5, 5, 5),
            ),
            CustomerRfm::new(
                CustomerMetrics {
                    customer_id: "13047".to_string(),
                    recency: 300,
                    frequency: 1,
                    monetary: 22.0,
                },
                RfmScores::new(1, 1, 1),
            ),
        ];

        RfmTable {
            range: None,
            reference_date: None,
            records,
        }
    }

    #[test]
    fn test_write_table_csv() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("rfm.csv");

        write_table_csv(&sample_table(), &output_path).unwrap();

        let contents = std::fs::read_to_string(&output_path).unwrap();
        let mut lines = contents.lines();
        let header = [
            "customer_id",
            "recency",
            "frequency",
            "monetary",
            "recency_score",
            "frequency_score",
            "monetary_score",
            "rfm_code",
            "rfm_score",
            "segment",
        ];
        assert_eq!(lines.next(), Some(header.join(",").as_str()));

        let rows: Vec<Vec<&str>> = lines.map(|line| line.split(',').collect()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][..3], ["17850", "2", "9"]);
        assert_eq!(rows[0][3].parse::<f64>().unwrap(), 812.5);
        assert_eq!(rows[0][4..], ["5", "5", "5", "555", "15", "Champions"]);
        assert_eq!(rows[1][0], "13047");
        assert_eq!(rows[1][3].parse::<f64>().unwrap(), 22.0);
        assert_eq!(rows[1][4..], ["1", "1", "1", "111", "3", "At Risk"]);
    }

    #[test]
    fn test_write_summary_json() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("summary.json");

        write_summary_json(&sample_table().summary(), &output_path).unwrap();

        let contents = std::fs::read_to_string(&output_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["customers"], 2);
        assert_eq!(value["segment_counts"]["Champions"], 1);
        assert_eq!(value["segment_counts"]["At Risk"], 1);
        assert_eq!(value["score_distribution"]["15"], 1);
    }
}
