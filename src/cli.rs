//! Command-line interface definitions and argument parsing

use crate::config::{
    DegenerateBinning, RfmConfig, DEFAULT_ANALYSIS_OFFSET_DAYS, DEFAULT_QUANTILES,
};
use crate::model::CustomerRecord;
use crate::report::AudienceQuery;
use crate::segment::Segment;
use chrono::NaiveDate;
use clap::Parser;

/// Customer segmentation CLI using RFM quantile scores
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the customer summary CSV file
    #[arg(short, long, default_value = "flo_data_20k.csv")]
    pub input: String,

    /// Output path for the RFM table
    #[arg(short, long, default_value = "flo_rfm.csv")]
    pub output: String,

    /// Reference date for recency (YYYY-MM-DD).
    /// Defaults to the latest order date plus --date-offset days
    #[arg(short, long)]
    pub analysis_date: Option<String>,

    /// Days after the latest order used when no analysis date is given
    #[arg(long, default_value_t = DEFAULT_ANALYSIS_OFFSET_DAYS)]
    pub date_offset: i64,

    /// Number of quantile buckets per metric (2-9). The built-in segment
    /// rules only cover scores up to 5, so larger values need custom rules
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_QUANTILES,
        value_parser = clap::value_parser!(u8).range(2..=9)
    )]
    pub quantiles: u8,

    /// Bin low-cardinality metrics on ranks instead of failing
    #[arg(long)]
    pub rank_fallback: bool,

    /// Print per-segment recency, frequency and monetary means
    #[arg(short, long)]
    pub summary: bool,

    /// Print the N highest-spending customers
    #[arg(long)]
    pub top: Option<usize>,

    /// Directory to write campaign audience id lists into
    #[arg(long)]
    pub audience_dir: Option<String>,

    /// Segments for an extra custom audience, e.g. champions,at_risk
    #[arg(long, value_delimiter = ',', requires = "audience_dir")]
    pub segments: Vec<String>,

    /// Category tags for the custom audience; any tag containing one qualifies
    #[arg(long, value_delimiter = ',', requires = "segments")]
    pub categories: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the analysis date option
    /// Expected format: "YYYY-MM-DD"
    pub fn parse_analysis_date(&self) -> crate::Result<Option<NaiveDate>> {
        if let Some(ref date_str) = self.analysis_date {
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("Invalid analysis date: {}", date_str))?;
            Ok(Some(date))
        } else {
            Ok(None)
        }
    }

    /// Custom audience from `--segments` and `--categories`, if any
    pub fn custom_audience(&self) -> crate::Result<Option<AudienceQuery>> {
        if self.segments.is_empty() {
            return Ok(None);
        }
        let segments = self
            .segments
            .iter()
            .map(|name| name.parse::<Segment>())
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Some(AudienceQuery::new(
            "custom_target_customer_ids",
            segments,
            self.categories.clone(),
        )))
    }

    /// Build the pipeline configuration, deriving the analysis date from
    /// `customers` when none was given
    pub fn to_config(&self, customers: &[CustomerRecord]) -> crate::Result<RfmConfig> {
        let config = match self.parse_analysis_date()? {
            Some(date) => RfmConfig::new(date),
            None => RfmConfig::from_latest_order(customers, self.date_offset)?,
        };

        let policy = if self.rank_fallback {
            DegenerateBinning::RankFallback
        } else {
            DegenerateBinning::Reject
        };

        let config = config
            .with_quantiles(self.quantiles)
            .with_degenerate_binning(policy);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            input: "test.csv".to_string(),
            output: "out.csv".to_string(),
            analysis_date: None,
            date_offset: 2,
            quantiles: 5,
            rank_fallback: false,
            summary: false,
            top: None,
            audience_dir: None,
            segments: Vec::new(),
            categories: Vec::new(),
            verbose: false,
        }
    }

    #[test]
    fn test_parse_analysis_date() {
        let mut args = args();
        assert_eq!(args.parse_analysis_date().unwrap(), None);

        args.analysis_date = Some("2021-06-01".to_string());
        assert_eq!(
            args.parse_analysis_date().unwrap(),
            NaiveDate::from_ymd_opt(2021, 6, 1)
        );

        args.analysis_date = Some("01.06.2021".to_string());
        assert!(args.parse_analysis_date().is_err());
    }

    #[test]
    fn test_to_config_derives_date() {
        let customers = vec![CustomerRecord::new(
            "a",
            NaiveDate::from_ymd_opt(2021, 5, 30).unwrap(),
            (1.0, 0.0),
            (1.0, 0.0),
        )];
        let mut args = args();
        args.rank_fallback = true;

        let config = args.to_config(&customers).unwrap();
        assert_eq!(config.analysis_date, NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        assert_eq!(config.degenerate, DegenerateBinning::RankFallback);

        args.quantiles = 12;
        assert!(args.to_config(&customers).is_err());

        // in range for the digit encoding, but past the built-in rule table
        args.quantiles = 6;
        let err = args.to_config(&customers).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::error::RfmError>(),
            Some(&crate::error::RfmError::IncompleteRules {
                code: "16".to_string()
            })
        );
    }

    #[test]
    fn test_quantiles_out_of_range_rejected_at_parse() {
        assert!(Args::try_parse_from(["rfmforge", "--quantiles", "12"]).is_err());
        assert!(Args::try_parse_from(["rfmforge", "--quantiles", "1"]).is_err());
        let args = Args::try_parse_from(["rfmforge", "--quantiles", "4"]).unwrap();
        assert_eq!(args.quantiles, 4);
    }

    #[test]
    fn test_custom_audience() {
        assert_eq!(args().custom_audience().unwrap(), None);

        let args = Args::parse_from([
            "rfmforge",
            "--audience-dir",
            "out",
            "--segments",
            "champions,at_risk",
            "--categories",
            "KADIN",
        ]);
        let query = args.custom_audience().unwrap().unwrap();
        assert_eq!(query.segments, vec![Segment::Champions, Segment::AtRisk]);
        assert_eq!(query.categories, vec!["KADIN"]);

        let mut args = args;
        args.segments = vec!["vip".to_string()];
        assert!(args.custom_audience().is_err());
    }

    #[test]
    fn test_segments_require_audience_dir() {
        assert!(Args::try_parse_from(["rfmforge", "--segments", "champions"]).is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::parse_from([
            "rfmforge",
            "--input",
            "customers.csv",
            "--analysis-date",
            "2021-06-01",
            "--top",
            "10",
            "--summary",
        ]);
        assert_eq!(args.input, "customers.csv");
        assert_eq!(args.output, "flo_rfm.csv");
        assert_eq!(args.quantiles, 5);
        assert_eq!(args.top, Some(10));
        assert!(args.summary);
    }
}
