//! Segment reports and audience selection over the RFM table

use crate::data::write_csv;
use crate::model::{CustomerRecord, RfmRecord};
use crate::segment::Segment;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Mean recency, frequency and monetary plus customer count per segment
pub fn segment_summary(rfm_df: &DataFrame) -> PolarsResult<DataFrame> {
    rfm_df
        .clone()
        .lazy()
        .group_by([col("segment")])
        .agg([
            col("recency").mean().alias("recency_mean"),
            col("frequency").mean().alias("frequency_mean"),
            col("monetary").mean().alias("monetary_mean"),
            col("customer_id").count().alias("count"),
        ])
        .sort(["segment"], SortMultipleOptions::default())
        .collect()
}

/// Customer count, order total and spend total per order channel
///
/// Expects the customer table from `data::customers_dataframe`.
pub fn channel_summary(customers_df: &DataFrame) -> PolarsResult<DataFrame> {
    customers_df
        .clone()
        .lazy()
        .group_by([col("order_channel")])
        .agg([
            col("customer_id").count().alias("count"),
            col("order_num_total").sum(),
            col("customer_value_total").sum(),
        ])
        .sort(["order_channel"], SortMultipleOptions::default())
        .collect()
}

/// Metric used to rank customers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Monetary,
    Frequency,
}

impl RankBy {
    fn column(self) -> &'static str {
        match self {
            RankBy::Monetary => "monetary",
            RankBy::Frequency => "frequency",
        }
    }
}

/// The `n` highest customers by the given metric
pub fn top_customers(rfm_df: &DataFrame, by: RankBy, n: usize) -> PolarsResult<DataFrame> {
    let sorted = rfm_df.sort(
        [by.column()],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_maintain_order(true),
    )?;
    Ok(sorted.head(Some(n)))
}

/// Segment and category filter describing a campaign audience
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceQuery {
    pub name: String,
    pub segments: Vec<Segment>,
    /// A customer qualifies when any tag contains one of these categories;
    /// an empty list disables the category filter
    pub categories: Vec<String>,
}

impl AudienceQuery {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        segments: Vec<Segment>,
        categories: Vec<S>,
    ) -> Self {
        Self {
            name: name.into(),
            segments,
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Loyal, high-value customers shopping women's categories
    pub fn new_brand_targets() -> Self {
        Self::new(
            "new_brand_target_customer_ids",
            vec![Segment::Champions, Segment::LoyalCustomers],
            vec!["KADIN"],
        )
    }

    /// Lapsing good customers and new customers in men's or children's categories
    pub fn discount_targets() -> Self {
        Self::new(
            "discount_target_customer_ids",
            vec![Segment::CantLoose, Segment::AtRisk, Segment::NewCustomers],
            vec!["ERKEK", "COCUK"],
        )
    }

    fn matches(&self, customer: &CustomerRecord, segment: Segment) -> bool {
        self.segments.contains(&segment)
            && (self.categories.is_empty()
                || self.categories.iter().any(|c| customer.interested_in(c)))
    }
}

/// Customer ids matching `query`, in customer table order
pub fn select_audience(
    customers: &[CustomerRecord],
    rfm: &[RfmRecord],
    query: &AudienceQuery,
) -> Vec<String> {
    let segments: HashMap<&str, Segment> = rfm
        .iter()
        .map(|record| (record.customer_id.as_str(), record.segment))
        .collect();

    customers
        .iter()
        .filter(|customer| {
            segments
                .get(customer.customer_id.as_str())
                .is_some_and(|&segment| query.matches(customer, segment))
        })
        .map(|customer| customer.customer_id.clone())
        .collect()
}

/// Write a single `customer_id` column
pub fn write_customer_ids<P: AsRef<Path>>(ids: &[String], file_path: P) -> crate::Result<()> {
    let mut df = df!("customer_id" => ids)?;
    write_csv(&mut df, file_path)
}
