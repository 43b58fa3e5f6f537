//! RfmForge: customer segmentation CLI based on RFM scores
//!
//! This is the main entrypoint that orchestrates data loading, scoring,
//! output and the optional reports.

use anyhow::Result;
use clap::Parser;
use log::info;
use rfmforge::report::{self, RankBy};
use rfmforge::{create_rfm, data, load_customers, AudienceQuery, Args, CustomerRecord, RfmRecord};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    run_pipeline(&args)
}

/// Run the full load → score → write pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    info!("Loading customer data from: {}", args.input);
    let customers = load_customers(&args.input)?;

    let config = args.to_config(&customers)?;
    info!(
        "Analysis date: {}, quantiles: {}",
        config.analysis_date, config.quantiles
    );

    let rfm = create_rfm(&customers, &config)?;
    data::write_rfm_csv(&rfm, &args.output)?;
    println!("✓ Scored {} customers", rfm.len());

    if args.summary || args.top.is_some() {
        print_reports(args, &customers, &rfm)?;
    }

    if let Some(ref dir) = args.audience_dir {
        let mut queries = vec![
            AudienceQuery::new_brand_targets(),
            AudienceQuery::discount_targets(),
        ];
        queries.extend(args.custom_audience()?);
        write_audiences(Path::new(dir), &queries, &customers, &rfm)?;
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    println!("RFM table saved to: {}", args.output);

    Ok(())
}

/// Print the channel and segment summaries and top customers
fn print_reports(args: &Args, customers: &[CustomerRecord], rfm: &[RfmRecord]) -> Result<()> {
    let rfm_df = data::rfm_dataframe(rfm)?;

    if args.summary {
        let customers_df = data::customers_dataframe(customers)?;
        println!("\n=== Channel Summary ===");
        println!("{}", report::channel_summary(&customers_df)?);
        println!("\n=== Segment Summary ===");
        println!("{}", report::segment_summary(&rfm_df)?);
    }

    if let Some(n) = args.top {
        println!("\n=== Top {} Customers by Monetary ===", n);
        println!("{}", report::top_customers(&rfm_df, RankBy::Monetary, n)?);
        println!("\n=== Top {} Customers by Frequency ===", n);
        println!("{}", report::top_customers(&rfm_df, RankBy::Frequency, n)?);
    }

    Ok(())
}

/// Write each campaign audience as an id list
fn write_audiences(
    dir: &Path,
    queries: &[AudienceQuery],
    customers: &[CustomerRecord],
    rfm: &[RfmRecord],
) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    for query in queries {
        let ids = report::select_audience(customers, rfm, query);
        let path = dir.join(format!("{}.csv", query.name));
        report::write_customer_ids(&ids, &path)?;
        println!("✓ {}: {} customers -> {}", query.name, ids.len(), path.display());
    }

    Ok(())
}
