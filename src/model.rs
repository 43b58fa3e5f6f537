//! Row types flowing through the RFM pipeline

use crate::segment::Segment;
use chrono::NaiveDate;

/// One customer summary row as supplied by the loader
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub order_channel: Option<String>,
    pub last_order_channel: Option<String>,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: NaiveDate,
    pub last_order_date_online: Option<NaiveDate>,
    pub last_order_date_offline: Option<NaiveDate>,
    pub order_num_total_ever_online: Option<f64>,
    pub order_num_total_ever_offline: Option<f64>,
    pub customer_value_total_ever_online: Option<f64>,
    pub customer_value_total_ever_offline: Option<f64>,
    /// Category tags bought from in the last 12 months
    pub interested_in_categories: Vec<String>,
}

impl CustomerRecord {
    /// Record with the fields the pipeline needs; counts and spends are (online, offline)
    pub fn new(
        customer_id: impl Into<String>,
        last_order_date: NaiveDate,
        orders: (f64, f64),
        spend: (f64, f64),
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            last_order_date,
            order_num_total_ever_online: Some(orders.0),
            order_num_total_ever_offline: Some(orders.1),
            customer_value_total_ever_online: Some(spend.0),
            customer_value_total_ever_offline: Some(spend.1),
            ..Default::default()
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interested_in_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// True when any tag contains `category`, so `COCUK` also matches `AKTIFCOCUK`
    pub fn interested_in(&self, category: &str) -> bool {
        self.interested_in_categories
            .iter()
            .any(|tag| tag.contains(category))
    }
}

/// Customer row augmented with channel-combined totals
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedCustomer<'a> {
    pub record: &'a CustomerRecord,
    pub order_num_total: u32,
    pub customer_value_total: f64,
}

/// Raw recency, frequency and monetary values
#[derive(Debug, Clone, PartialEq)]
pub struct RfmMetrics {
    pub customer_id: String,
    /// Days since last order
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub metrics: RfmMetrics,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodedRow {
    pub scored: ScoredRow,
    /// Recency digit then frequency digit, e.g. `"51"`
    pub rf_score: String,
    pub rfm_score: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedRow {
    pub coded: CodedRow,
    pub segment: Segment,
}

/// Final output row
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub rf_score: String,
    pub rfm_score: String,
    pub segment: Segment,
}

/// Output column names, in output order
pub const RFM_COLUMNS: [&str; 7] = [
    "customer_id",
    "recency",
    "frequency",
    "monetary",
    "RF_SCORE",
    "RFM_SCORE",
    "segment",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_categories() {
        let record = CustomerRecord::new(
            "c1",
            NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
            (1.0, 2.0),
            (10.0, 20.0),
        )
        .with_categories(["KADIN", "AKTIFSPOR"]);

        assert!(record.interested_in("KADIN"));
        assert!(record.interested_in("SPOR"));
        assert!(!record.interested_in("ERKEK"));
        assert_eq!(record.order_num_total_ever_offline, Some(2.0));
        assert_eq!(record.first_order_date, None);
    }
}
