//! The RFM scoring and segmentation pipeline
//!
//! Each stage is a pure function over the whole table; `create_rfm` chains
//! them in order.

use crate::config::{DegenerateBinning, RfmConfig};
use crate::error::{RfmError, RfmResult};
use crate::model::{
    AugmentedCustomer, CodedRow, CustomerRecord, RfmMetrics, RfmRecord, ScoredRow, SegmentedRow,
};
use crate::scoring::{quantile_scores, ranked_quantile_scores, ScoreOrder};
use crate::segment::SegmentRules;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Combine online and offline sub-fields into order and spend totals
pub fn derive_totals(records: &[CustomerRecord]) -> RfmResult<Vec<AugmentedCustomer<'_>>> {
    let mut first_rows: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut augmented = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        if let Some(&first_row) = first_rows.get(record.customer_id.as_str()) {
            return Err(RfmError::DuplicateCustomer {
                customer_id: record.customer_id.clone(),
                first_row,
                row,
            });
        }
        first_rows.insert(&record.customer_id, row);

        let online_orders = order_count(
            row,
            record,
            "order_num_total_ever_online",
            record.order_num_total_ever_online,
        )?;
        let offline_orders = order_count(
            row,
            record,
            "order_num_total_ever_offline",
            record.order_num_total_ever_offline,
        )?;
        let online_value = spend(
            row,
            record,
            "customer_value_total_ever_online",
            record.customer_value_total_ever_online,
        )?;
        let offline_value = spend(
            row,
            record,
            "customer_value_total_ever_offline",
            record.customer_value_total_ever_offline,
        )?;

        augmented.push(AugmentedCustomer {
            record,
            order_num_total: online_orders + offline_orders,
            customer_value_total: online_value + offline_value,
        });
    }

    debug!("Derived totals for {} customers", augmented.len());
    Ok(augmented)
}

fn data_quality(row: usize, record: &CustomerRecord, field: &str, problem: String) -> RfmError {
    RfmError::DataQuality {
        row,
        customer_id: record.customer_id.clone(),
        field: field.to_string(),
        problem,
    }
}

fn spend(row: usize, record: &CustomerRecord, field: &str, value: Option<f64>) -> RfmResult<f64> {
    match value {
        None => Err(data_quality(row, record, field, "is missing".to_string())),
        Some(v) if !v.is_finite() || v < 0.0 => Err(data_quality(
            row,
            record,
            field,
            format!("must be a non-negative amount, got {v}"),
        )),
        Some(v) => Ok(v),
    }
}

fn order_count(
    row: usize,
    record: &CustomerRecord,
    field: &str,
    value: Option<f64>,
) -> RfmResult<u32> {
    let v = spend(row, record, field, value)?;
    if v.fract() != 0.0 || v > f64::from(u32::MAX / 2) {
        return Err(data_quality(
            row,
            record,
            field,
            format!("must be a whole order count, got {v}"),
        ));
    }
    Ok(v as u32)
}

/// Recency, frequency and monetary per customer relative to `analysis_date`
pub fn compute_rfm(
    customers: &[AugmentedCustomer<'_>],
    analysis_date: NaiveDate,
) -> RfmResult<Vec<RfmMetrics>> {
    if let Some(latest) = customers
        .iter()
        .max_by_key(|customer| customer.record.last_order_date)
    {
        if latest.record.last_order_date > analysis_date {
            return Err(RfmError::AnalysisDateTooEarly {
                analysis_date,
                last_order_date: latest.record.last_order_date,
                customer_id: latest.record.customer_id.clone(),
            });
        }
    }

    customers
        .iter()
        .enumerate()
        .map(|(row, customer)| {
            if customer.order_num_total == 0 {
                return Err(data_quality(
                    row,
                    customer.record,
                    "order_num_total",
                    "must be at least one order".to_string(),
                ));
            }
            Ok(RfmMetrics {
                customer_id: customer.record.customer_id.clone(),
                recency: (analysis_date - customer.record.last_order_date).num_days(),
                frequency: customer.order_num_total,
                monetary: customer.customer_value_total,
            })
        })
        .collect()
}

/// Assign 1..=`quantiles` scores to each metric
pub fn score(
    rows: Vec<RfmMetrics>,
    quantiles: u8,
    policy: DegenerateBinning,
) -> RfmResult<Vec<ScoredRow>> {
    let recency: Vec<f64> = rows.iter().map(|r| r.recency as f64).collect();
    let frequency: Vec<f64> = rows.iter().map(|r| f64::from(r.frequency)).collect();
    let monetary: Vec<f64> = rows.iter().map(|r| r.monetary).collect();

    let recency_scores =
        quantile_scores("recency", &recency, quantiles, ScoreOrder::Descending, policy)?;
    let frequency_scores =
        ranked_quantile_scores("frequency", &frequency, quantiles, ScoreOrder::Ascending, policy)?;
    let monetary_scores =
        quantile_scores("monetary", &monetary, quantiles, ScoreOrder::Ascending, policy)?;

    debug!("Scored {} customers into {} quantiles", rows.len(), quantiles);

    Ok(rows
        .into_iter()
        .zip(recency_scores)
        .zip(frequency_scores)
        .zip(monetary_scores)
        .map(|(((metrics, r), f), m)| ScoredRow {
            metrics,
            recency_score: r,
            frequency_score: f,
            monetary_score: m,
        })
        .collect())
}

/// Concatenate score digits into RF and RFM codes
pub fn build_codes(rows: Vec<ScoredRow>) -> Vec<CodedRow> {
    rows.into_iter()
        .map(|scored| {
            let rf_score = format!("{}{}", scored.recency_score, scored.frequency_score);
            let rfm_score = format!("{rf_score}{}", scored.monetary_score);
            CodedRow {
                scored,
                rf_score,
                rfm_score,
            }
        })
        .collect()
}

/// Label each row with the first segment rule its RF code matches
pub fn segment(rows: Vec<CodedRow>, rules: &SegmentRules) -> RfmResult<Vec<SegmentedRow>> {
    rows.into_iter()
        .map(|coded| match rules.classify(&coded.rf_score) {
            Some(segment) => Ok(SegmentedRow { coded, segment }),
            None => Err(RfmError::UnmatchedCode {
                code: coded.rf_score,
            }),
        })
        .collect()
}

/// Reduce rows to the output column set
pub fn project(rows: Vec<SegmentedRow>) -> Vec<RfmRecord> {
    rows.into_iter()
        .map(|row| {
            let CodedRow {
                scored,
                rf_score,
                rfm_score,
            } = row.coded;
            RfmRecord {
                customer_id: scored.metrics.customer_id,
                recency: scored.metrics.recency,
                frequency: scored.metrics.frequency,
                monetary: scored.metrics.monetary,
                rf_score,
                rfm_score,
                segment: row.segment,
            }
        })
        .collect()
}

/// Run the full pipeline over one customer table snapshot
pub fn create_rfm(records: &[CustomerRecord], config: &RfmConfig) -> RfmResult<Vec<RfmRecord>> {
    config.validate()?;
    if records.is_empty() {
        return Err(RfmError::EmptyInput);
    }

    let augmented = derive_totals(records)?;
    let metrics = compute_rfm(&augmented, config.analysis_date)?;
    let scored = score(metrics, config.quantiles, config.degenerate)?;
    let coded = build_codes(scored);
    let segmented = segment(coded, &config.rules)?;
    let output = project(segmented);

    info!(
        "RFM segmentation complete: {} customers, analysis date {}",
        output.len(),
        config.analysis_date
    );
    Ok(output)
}
