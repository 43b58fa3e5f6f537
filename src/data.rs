//! Customer table loading and RFM table output using Polars

use crate::error::RfmError;
use crate::model::{CustomerRecord, RfmRecord};
use crate::pipeline::derive_totals;
use chrono::NaiveDate;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub const ID_COLUMN: &str = "master_id";
pub const LAST_ORDER_DATE: &str = "last_order_date";

const NUMERIC_COLUMNS: [&str; 4] = [
    "order_num_total_ever_online",
    "order_num_total_ever_offline",
    "customer_value_total_ever_online",
    "customer_value_total_ever_offline",
];

/// Load the customer summary CSV into typed records
///
/// # Arguments
/// * `file_path` - Path to the CSV file, one row per customer
///
/// # Returns
/// * Records in file order; numeric fields that are empty or unparsable are
///   kept as `None` so the pipeline can report them
pub fn load_customers<P: AsRef<Path>>(file_path: P) -> crate::Result<Vec<CustomerRecord>> {
    let path = file_path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    log::info!("Loaded {} rows from {}", df.height(), path.display());
    customers_from_dataframe(&df)
}

/// Convert a customer DataFrame into records
pub fn customers_from_dataframe(df: &DataFrame) -> crate::Result<Vec<CustomerRecord>> {
    let ids = string_column(df, ID_COLUMN)?
        .ok_or_else(|| anyhow::anyhow!("Missing required column: {}", ID_COLUMN))?;
    let last_order = string_column(df, LAST_ORDER_DATE)?
        .ok_or_else(|| anyhow::anyhow!("Missing required column: {}", LAST_ORDER_DATE))?;

    let mut numeric = Vec::with_capacity(NUMERIC_COLUMNS.len());
    for name in NUMERIC_COLUMNS {
        let values = float_column(df, name)?
            .ok_or_else(|| anyhow::anyhow!("Missing required column: {}", name))?;
        numeric.push(values);
    }

    let order_channel = string_column(df, "order_channel")?;
    let last_order_channel = string_column(df, "last_order_channel")?;
    let first_order = string_column(df, "first_order_date")?;
    let last_online = string_column(df, "last_order_date_online")?;
    let last_offline = string_column(df, "last_order_date_offline")?;
    let categories = string_column(df, "interested_in_categories_12")?;

    let cell = |column: &Option<Vec<Option<String>>>, row: usize| {
        column.as_ref().and_then(|values| values[row].clone())
    };

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let customer_id = ids[row].clone().ok_or_else(|| RfmError::DataQuality {
            row,
            customer_id: String::new(),
            field: ID_COLUMN.to_string(),
            problem: "is missing".to_string(),
        })?;

        let last_order_date = match last_order[row].as_deref().map(parse_date) {
            Some(Some(date)) => date,
            _ => {
                return Err(RfmError::DataQuality {
                    row,
                    customer_id,
                    field: LAST_ORDER_DATE.to_string(),
                    problem: "is missing or not a date".to_string(),
                }
                .into())
            }
        };

        records.push(CustomerRecord {
            customer_id,
            order_channel: cell(&order_channel, row),
            last_order_channel: cell(&last_order_channel, row),
            first_order_date: cell(&first_order, row).as_deref().and_then(parse_date),
            last_order_date,
            last_order_date_online: cell(&last_online, row).as_deref().and_then(parse_date),
            last_order_date_offline: cell(&last_offline, row).as_deref().and_then(parse_date),
            order_num_total_ever_online: numeric[0][row],
            order_num_total_ever_offline: numeric[1][row],
            customer_value_total_ever_online: numeric[2][row],
            customer_value_total_ever_offline: numeric[3][row],
            interested_in_categories: cell(&categories, row)
                .map(|raw| parse_categories(&raw))
                .unwrap_or_default(),
        });
    }

    Ok(records)
}

/// Column as optional strings, or `None` when the column is absent
fn string_column(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect();
    Ok(Some(values))
}

/// Column cast to Float64; values that fail to parse become `None`
fn float_column(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(Some(series.f64()?.into_iter().collect()))
}

/// Parse `YYYY-MM-DD`, ignoring any time-of-day suffix.
///
/// Recency is counted in whole calendar days, so `2021-05-30 14:00` is the
/// same order day as `2021-05-30`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse `[KADIN, AKTIFSPOR]` into its tags
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Customer table with channel-combined totals, one row per customer
///
/// Dates are rendered as `YYYY-MM-DD` text. Fails like `derive_totals` on
/// missing or invalid counts and spends.
pub fn customers_dataframe(records: &[CustomerRecord]) -> crate::Result<DataFrame> {
    let augmented = derive_totals(records)?;
    let date_text = |date: Option<NaiveDate>| date.map(|d| d.to_string());

    let ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
    let order_channel: Vec<Option<&str>> =
        records.iter().map(|r| r.order_channel.as_deref()).collect();
    let last_order_channel: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.last_order_channel.as_deref())
        .collect();
    let first_order: Vec<Option<String>> =
        records.iter().map(|r| date_text(r.first_order_date)).collect();
    let last_order: Vec<String> = records.iter().map(|r| r.last_order_date.to_string()).collect();
    let last_online: Vec<Option<String>> = records
        .iter()
        .map(|r| date_text(r.last_order_date_online))
        .collect();
    let last_offline: Vec<Option<String>> = records
        .iter()
        .map(|r| date_text(r.last_order_date_offline))
        .collect();
    let order_num_total: Vec<i64> = augmented
        .iter()
        .map(|a| i64::from(a.order_num_total))
        .collect();
    let customer_value_total: Vec<f64> =
        augmented.iter().map(|a| a.customer_value_total).collect();

    let df = df!(
        "customer_id" => ids,
        "order_channel" => order_channel,
        "last_order_channel" => last_order_channel,
        "first_order_date" => first_order,
        LAST_ORDER_DATE => last_order,
        "last_order_date_online" => last_online,
        "last_order_date_offline" => last_offline,
        "order_num_total" => order_num_total,
        "customer_value_total" => customer_value_total
    )?;
    Ok(df)
}

/// Build the output DataFrame with the fixed RFM column order
pub fn rfm_dataframe(records: &[RfmRecord]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
    let recency: Vec<i64> = records.iter().map(|r| r.recency).collect();
    let frequency: Vec<i64> = records.iter().map(|r| i64::from(r.frequency)).collect();
    let monetary: Vec<f64> = records.iter().map(|r| r.monetary).collect();
    let rf: Vec<&str> = records.iter().map(|r| r.rf_score.as_str()).collect();
    let rfm: Vec<&str> = records.iter().map(|r| r.rfm_score.as_str()).collect();
    let segments: Vec<&str> = records.iter().map(|r| r.segment.as_str()).collect();

    df!(
        "customer_id" => ids,
        "recency" => recency,
        "frequency" => frequency,
        "monetary" => monetary,
        "RF_SCORE" => rf,
        "RFM_SCORE" => rfm,
        "segment" => segments
    )
}

/// Write any DataFrame as CSV with a header row
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, file_path: P) -> crate::Result<()> {
    let mut file = File::create(file_path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Persist the RFM table
pub fn write_rfm_csv<P: AsRef<Path>>(records: &[RfmRecord], file_path: P) -> crate::Result<()> {
    let mut df = rfm_dataframe(records)?;
    write_csv(&mut df, &file_path)?;
    log::info!(
        "Wrote {} RFM rows to {}",
        records.len(),
        file_path.as_ref().display()
    );
    Ok(())
}
