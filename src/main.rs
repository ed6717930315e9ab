//! RfmForge: RFM customer segmentation CLI
//!
//! This is the main entrypoint that orchestrates data loading, RFM scoring,
//! segmentation, export and charts.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rfmforge::{compute_rfm_prepared, export, load_transactions_csv, viz, Args, TransactionSet};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    run_pipeline(&args)
}

/// Run the full RFM pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    info!("Loading transactions from: {}", args.input.display());
    let dataset = load_transactions_csv(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let transactions = TransactionSet::new(&dataset)?;

    let bounds = transactions.bounds();
    let range = args.date_range(bounds);
    if let Some(bounds) = bounds {
        info!("Dataset spans {} to {}", bounds.start, bounds.end);
    }

    let params = args.rfm_params(range);
    let table = compute_rfm_prepared(&transactions, &params)?;

    println!("✓ Scored {} customers", table.len());
    if table.is_empty() {
        println!("No transactions in the selected date range.");
    }

    viz::print_rfm_table(&table, args.limit);
    viz::print_segment_summary(&table);
    viz::print_reading_guide();

    if let Some(output) = &args.output {
        export::write_table_csv(&table, output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("\nRFM table saved to: {}", output.display());
    }

    if let Some(summary_path) = &args.summary_json {
        export::write_summary_json(&table.summary(), summary_path)
            .with_context(|| format!("failed to write {}", summary_path.display()))?;
        println!("Summary saved to: {}", summary_path.display());
    }

    if let Some(plot) = &args.plot {
        let segment_path = viz::generate_charts(&table, plot)?;
        println!("Score histogram saved to: {}", plot.display());
        println!("Segment chart saved to: {}", segment_path.display());
    }

    info!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}
