//! Charts and console reports for RFM results, using Plotters

use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;

use crate::error::{Result, RfmError};
use crate::pipeline::RfmTable;
use crate::segment::Segment;

/// Color per segment, indexed like [`Segment::ALL`]
const SEGMENT_COLORS: [RGBColor; 6] = [
    GREEN,
    BLUE,
    CYAN,
    MAGENTA,
    RED,
    RGBColor(128, 128, 128),
];

fn chart_error(err: impl std::fmt::Display) -> RfmError {
    RfmError::Chart(err.to_string())
}

/// Draw the distribution of RFM scores (3..=15) as an SVG histogram
pub fn create_score_histogram(table: &RfmTable, output_path: &Path) -> Result<()> {
    let distribution = table.summary().score_distribution;
    let max_count = distribution.values().copied().max().unwrap_or(1) as f64;

    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("RFM Score Histogram", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(2.5f64..15.5f64, 0f64..(max_count * 1.1))
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .x_desc("RFM Score")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(distribution.iter().map(|(&score, &count)| {
            let x = score as f64;
            Rectangle::new([(x - 0.45, 0.0), (x + 0.45, count as f64)], BLUE.filled())
        }))
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    info!("Score histogram saved to: {}", output_path.display());

    Ok(())
}

/// Draw the number of customers per segment as an SVG bar chart
pub fn create_segment_chart(table: &RfmTable, output_path: &Path) -> Result<()> {
    let counts = table.summary().segment_counts;
    let max_count = counts.values().copied().max().unwrap_or(1) as f64;

    let root = SVGBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customers per Segment", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(Segment::ALL.len() as f64 - 0.5), 0f64..(max_count * 1.1))
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .x_labels(Segment::ALL.len())
        .x_label_formatter(&|x: &f64| segment_axis_label(*x))
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(chart_error)?;

    for (index, segment) in Segment::ALL.iter().enumerate() {
        let count = counts.get(segment).copied().unwrap_or(0) as f64;
        let x = index as f64;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.4, 0.0), (x + 0.4, count)],
                SEGMENT_COLORS[index].filled(),
            )))
            .map_err(chart_error)?;
    }

    root.present().map_err(chart_error)?;
    info!("Segment chart saved to: {}", output_path.display());

    Ok(())
}

fn segment_axis_label(x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 0.05 || index < 0.0 {
        return String::new();
    }
    Segment::ALL
        .get(index as usize)
        .map(|s| s.label().to_string())
        .unwrap_or_default()
}

/// Path of the segment chart written next to `base`: `scores.svg` → `scores_segments.svg`
pub fn segment_chart_path(base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rfm".to_string());
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "svg".to_string());
    base.with_file_name(format!("{}_segments.{}", stem, extension))
}

/// Write both charts: the histogram at `base_output_path`, the segment chart beside it
pub fn generate_charts(table: &RfmTable, base_output_path: &Path) -> Result<PathBuf> {
    create_score_histogram(table, base_output_path)?;

    let segment_path = segment_chart_path(base_output_path);
    create_segment_chart(table, &segment_path)?;

    Ok(segment_path)
}

/// Print segment statistics to console
pub fn print_segment_summary(table: &RfmTable) {
    let summary = table.summary();

    println!("\n=== Segment Summary ===");
    println!("Total customers: {}", summary.customers);
    if let Some(range) = summary.range {
        println!("Date range: {} to {}", range.start, range.end);
    }
    if let Some(reference) = summary.reference_date {
        println!("Reference date: {}", reference);
    }
    if let (Some(r), Some(f), Some(m)) = (
        summary.mean_recency,
        summary.mean_frequency,
        summary.mean_monetary,
    ) {
        println!("Mean recency: {:.1} days, frequency: {:.2}, monetary: {:.2}", r, f, m);
    }

    println!("\nSegments:");
    for (segment, &count) in &summary.segment_counts {
        let percentage = (count as f64 / summary.customers.max(1) as f64) * 100.0;
        println!("  {:<10} {:>6} customers ({:.1}%)", segment.label(), count, percentage);
    }

    println!("\nRFM score distribution:");
    for (score, &count) in &summary.score_distribution {
        println!("  {:>2}: {}", score, count);
    }
}

/// Print the first `limit` rows of the table to console
pub fn print_rfm_table(table: &RfmTable, limit: usize) {
    println!("\n=== RFM Table with Customer Segments ===");
    println!(
        "  {:<14} | {:>7} | {:>9} | {:>12} | {:>3} | {:>5} | Segment",
        "Customer", "Recency", "Frequency", "Monetary", "RFM", "Score"
    );
    println!("  {}", "-".repeat(80));

    for record in table.records.iter().take(limit) {
        println!(
            "  {:<14} | {:>7} | {:>9} | {:>12.2} | {:>3} | {:>5} | {}",
            record.customer_id,
            record.recency,
            record.frequency,
            record.monetary,
            record.rfm_code,
            record.rfm_score,
            record.segment
        );
    }

    if table.len() > limit {
        println!("  ... {} more rows", table.len() - limit);
    }
}

/// Print the short guide explaining each metric and segment
pub fn print_reading_guide() {
    println!("\n=== How to Read This ===");
    println!("  Recency:   days since last purchase, lower is better");
    println!("  Frequency: number of purchases, higher is better");
    println!("  Monetary:  total spent, higher is better");
    println!("  RFM Score: sum of the three 1-5 scores (max 15)");
    for segment in Segment::ALL {
        println!("  {:<10} {}", segment.label(), segment.description());
    }
}
