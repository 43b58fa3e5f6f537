//! Segment vocabulary and the ordered RF rule table

use crate::error::{RfmError, RfmResult};
use std::fmt;
use std::str::FromStr;

/// Behavioural segment assigned from an RF code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoose,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::Hibernating,
        Segment::AtRisk,
        Segment::CantLoose,
        Segment::AboutToSleep,
        Segment::NeedAttention,
        Segment::LoyalCustomers,
        Segment::Promising,
        Segment::NewCustomers,
        Segment::PotentialLoyalists,
        Segment::Champions,
    ];

    /// Label written to output tables
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Hibernating => "hibernating",
            Segment::AtRisk => "at_risk",
            Segment::CantLoose => "cant_loose",
            Segment::AboutToSleep => "about_to_sleep",
            Segment::NeedAttention => "need_attention",
            Segment::LoyalCustomers => "loyal_customers",
            Segment::Promising => "promising",
            Segment::NewCustomers => "new_customers",
            Segment::PotentialLoyalists => "potential_loyalists",
            Segment::Champions => "champions",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Segment::ALL
            .into_iter()
            .find(|segment| segment.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown segment: {}", s))
    }
}

/// Set of score digits 1..=9, stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitSet(u16);

impl DigitSet {
    /// Digits `lo..=hi`
    pub const fn range(lo: u8, hi: u8) -> Self {
        let mut mask = 0u16;
        let mut d = lo;
        while d <= hi {
            mask |= 1 << d;
            d += 1;
        }
        DigitSet(mask)
    }

    pub const fn one(digit: u8) -> Self {
        DigitSet(1 << digit)
    }

    pub fn contains(self, digit: u8) -> bool {
        digit <= 9 && self.0 & (1 << digit) != 0
    }
}

/// One (recency digit, frequency digit) pattern and its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRule {
    pub recency: DigitSet,
    pub frequency: DigitSet,
    pub segment: Segment,
}

impl SegmentRule {
    pub const fn new(recency: DigitSet, frequency: DigitSet, segment: Segment) -> Self {
        Self {
            recency,
            frequency,
            segment,
        }
    }

    pub fn matches(&self, recency_digit: u8, frequency_digit: u8) -> bool {
        self.recency.contains(recency_digit) && self.frequency.contains(frequency_digit)
    }
}

/// Ordered rule table; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRules {
    rules: Vec<SegmentRule>,
}

impl SegmentRules {
    pub fn new(rules: Vec<SegmentRule>) -> Self {
        Self { rules }
    }

    /// The standard ten-segment RF map
    pub fn canonical() -> Self {
        use DigitSet as D;
        use Segment::*;

        Self::new(vec![
            SegmentRule::new(D::range(1, 2), D::range(1, 2), Hibernating),
            SegmentRule::new(D::range(1, 2), D::range(3, 4), AtRisk),
            SegmentRule::new(D::range(1, 2), D::one(5), CantLoose),
            SegmentRule::new(D::one(3), D::range(1, 2), AboutToSleep),
            SegmentRule::new(D::one(3), D::one(3), NeedAttention),
            SegmentRule::new(D::range(3, 4), D::range(4, 5), LoyalCustomers),
            SegmentRule::new(D::one(4), D::one(1), Promising),
            SegmentRule::new(D::one(5), D::one(1), NewCustomers),
            SegmentRule::new(D::range(4, 5), D::range(2, 3), PotentialLoyalists),
            SegmentRule::new(D::one(5), D::range(4, 5), Champions),
        ])
    }

    /// Segment for a pair of score digits
    pub fn classify_digits(&self, recency_digit: u8, frequency_digit: u8) -> Option<Segment> {
        self.rules
            .iter()
            .find(|rule| rule.matches(recency_digit, frequency_digit))
            .map(|rule| rule.segment)
    }

    /// Segment for a two-character RF code such as `"51"`
    pub fn classify(&self, rf_code: &str) -> Option<Segment> {
        let mut digits = rf_code.chars().map(|c| c.to_digit(10));
        match (digits.next(), digits.next(), digits.next()) {
            (Some(Some(r)), Some(Some(f)), None) => self.classify_digits(r as u8, f as u8),
            _ => None,
        }
    }

    /// Check that every code over `1..=levels` hits some rule
    pub fn verify_total(&self, levels: u8) -> RfmResult<()> {
        for r in 1..=levels {
            for f in 1..=levels {
                if self.classify_digits(r, f).is_none() {
                    return Err(RfmError::IncompleteRules {
                        code: format!("{r}{f}"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_exactly_one_segment() {
        let rules = SegmentRules::canonical();
        let mut seen = std::collections::BTreeSet::new();
        for r in 1..=5 {
            for f in 1..=5 {
                let code = format!("{r}{f}");
                let segment = rules.classify(&code);
                assert!(segment.is_some(), "code {code} unmatched");
                seen.insert(segment.unwrap());
            }
        }
        assert_eq!(seen.len(), 10);
        assert!(rules.verify_total(5).is_ok());
    }

    #[test]
    fn test_known_codes() {
        let rules = SegmentRules::canonical();
        assert_eq!(rules.classify("55"), Some(Segment::Champions));
        assert_eq!(rules.classify("11"), Some(Segment::Hibernating));
        assert_eq!(rules.classify("41"), Some(Segment::Promising));
        assert_eq!(rules.classify("33"), Some(Segment::NeedAttention));
        assert_eq!(rules.classify("51"), Some(Segment::NewCustomers));
        assert_eq!(rules.classify("25"), Some(Segment::CantLoose));
        assert_eq!(rules.classify("44"), Some(Segment::LoyalCustomers));
        assert_eq!(rules.classify("52"), Some(Segment::PotentialLoyalists));
    }

    #[test]
    fn test_first_match_wins() {
        let rules = SegmentRules::new(vec![
            SegmentRule::new(DigitSet::range(1, 5), DigitSet::one(5), Segment::LoyalCustomers),
            SegmentRule::new(DigitSet::one(5), DigitSet::one(5), Segment::Champions),
        ]);
        assert_eq!(rules.classify("55"), Some(Segment::LoyalCustomers));
    }

    #[test]
    fn test_malformed_codes() {
        let rules = SegmentRules::canonical();
        assert_eq!(rules.classify("5"), None);
        assert_eq!(rules.classify("555"), None);
        assert_eq!(rules.classify("5x"), None);
        assert_eq!(rules.classify("66"), None);
    }

    #[test]
    fn test_incomplete_rules_are_reported() {
        let mut rules = SegmentRules::canonical().rules;
        rules.retain(|rule| rule.segment != Segment::NeedAttention);
        let result = SegmentRules::new(rules).verify_total(5);
        assert_eq!(
            result,
            Err(RfmError::IncompleteRules {
                code: "33".to_string()
            })
        );
    }

    #[test]
    fn test_segment_round_trips_through_label() {
        for segment in Segment::ALL {
            assert_eq!(segment.as_str().parse::<Segment>().unwrap(), segment);
        }
        assert!("vip".parse::<Segment>().is_err());
    }
}
