//! Error types for the RFM pipeline

use chrono::NaiveDate;

/// Errors raised while scoring and segmenting a customer table
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RfmError {
    /// A required field was missing or malformed
    #[error("row {row} (customer `{customer_id}`): field `{field}` {problem}")]
    DataQuality {
        row: usize,
        customer_id: String,
        field: String,
        problem: String,
    },

    /// The same customer identifier appeared on more than one row
    #[error("customer `{customer_id}` appears on rows {first_row} and {row}")]
    DuplicateCustomer {
        customer_id: String,
        first_row: usize,
        row: usize,
    },

    /// Recency would be negative for at least one customer
    #[error(
        "analysis date {analysis_date} precedes last order date {last_order_date} of customer `{customer_id}`"
    )]
    AnalysisDateTooEarly {
        analysis_date: NaiveDate,
        last_order_date: NaiveDate,
        customer_id: String,
    },

    /// A metric distribution cannot be split into the requested buckets
    #[error("cannot bin {metric} into {buckets} quantiles: {reason}")]
    Binning {
        metric: &'static str,
        buckets: u8,
        reason: String,
    },

    /// An RF code matched no rule; the rule table is broken
    #[error("RF code `{code}` matched no segment rule")]
    UnmatchedCode { code: String },

    /// The rule table leaves a code uncovered
    #[error("segment rules do not cover RF code `{code}`")]
    IncompleteRules { code: String },

    #[error("quantile count must be between 2 and 9, got {0}")]
    InvalidQuantiles(u8),

    #[error("no customer rows to score")]
    EmptyInput,
}

/// Result alias for pipeline operations
pub type RfmResult<T> = std::result::Result<T, RfmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_quality_message_names_row_and_field() {
        let err = RfmError::DataQuality {
            row: 7,
            customer_id: "c07".to_string(),
            field: "order_num_total_ever_online".to_string(),
            problem: "is missing".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("row 7"));
        assert!(message.contains("c07"));
        assert!(message.contains("order_num_total_ever_online"));
    }
}
