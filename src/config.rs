//! Pipeline configuration

use crate::error::{RfmError, RfmResult};
use crate::model::CustomerRecord;
use crate::segment::SegmentRules;
use chrono::{Duration, NaiveDate};

/// Number of score levels used unless configured otherwise
pub const DEFAULT_QUANTILES: u8 = 5;

/// Days added to the latest order date when no analysis date is given
pub const DEFAULT_ANALYSIS_OFFSET_DAYS: i64 = 2;

/// What to do when a metric cannot fill every quantile bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegenerateBinning {
    /// Fail with `RfmError::Binning`
    #[default]
    Reject,
    /// Bin on first-seen ranks instead, allowing empty buckets for tiny inputs
    RankFallback,
}

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RfmConfig {
    /// Reference date recency is measured against
    pub analysis_date: NaiveDate,
    /// Number of quantile buckets per metric
    pub quantiles: u8,
    pub degenerate: DegenerateBinning,
    /// Ordered RF segment rules
    pub rules: SegmentRules,
}

impl RfmConfig {
    pub fn new(analysis_date: NaiveDate) -> Self {
        Self {
            analysis_date,
            quantiles: DEFAULT_QUANTILES,
            degenerate: DegenerateBinning::default(),
            rules: SegmentRules::canonical(),
        }
    }

    /// Analysis date set `offset_days` after the latest order in `records`
    pub fn from_latest_order(records: &[CustomerRecord], offset_days: i64) -> RfmResult<Self> {
        let latest = latest_order_date(records).ok_or(RfmError::EmptyInput)?;
        Ok(Self::new(latest + Duration::days(offset_days)))
    }

    pub fn with_quantiles(mut self, quantiles: u8) -> Self {
        self.quantiles = quantiles;
        self
    }

    pub fn with_degenerate_binning(mut self, policy: DegenerateBinning) -> Self {
        self.degenerate = policy;
        self
    }

    pub fn with_rules(mut self, rules: SegmentRules) -> Self {
        self.rules = rules;
        self
    }

    /// Scores must stay single digits so codes concatenate unambiguously
    pub fn validate(&self) -> RfmResult<()> {
        if !(2..=9).contains(&self.quantiles) {
            return Err(RfmError::InvalidQuantiles(self.quantiles));
        }
        self.rules.verify_total(self.quantiles)
    }
}

/// Most recent `last_order_date` across the table
pub fn latest_order_date(records: &[CustomerRecord]) -> Option<NaiveDate> {
    records.iter().map(|record| record.last_order_date).max()
}
