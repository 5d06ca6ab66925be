//! Scan domain types shared by storage, billing and the scan pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of content submitted for a risk scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Url,
    Email,
    Qr,
    Wallet,
}

impl ContentType {
    pub const ALL: [Self; 5] = [Self::Text, Self::Url, Self::Email, Self::Qr, Self::Wallet];

    /// Tokens consumed by one scan of this kind.
    pub const fn token_cost(self) -> i64 {
        match self {
            Self::Wallet => 2,
            Self::Text | Self::Url | Self::Email | Self::Qr => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::Email => "email",
            Self::Qr => "qr",
            Self::Wallet => "wallet",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownVariant {
                kind: "content type",
                value: s.to_string(),
            })
    }
}

/// Billing state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Inactive,
}

impl SubscriptionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::PastDue => "past_due",
            Self::Inactive => "inactive",
        }
    }

    /// Only a running subscription can be canceled.
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk band derived from a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub const fn from_score(score: i64) -> Self {
        match score {
            85.. => Self::Critical,
            70..=84 => Self::High,
            40..=69 => Self::Medium,
            20..=39 => Self::Low,
            _ => Self::Safe,
        }
    }

    /// Band for a string-encoded score, as stored in history rows.
    pub fn from_score_str(score: &str) -> Self {
        Self::from_score(parse_risk_score(score))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the leading integer of a string-encoded score.
///
/// Leading whitespace and a sign are accepted and parsing stops at the
/// first non-digit (`"72.5"` is 72). Anything without leading digits is 0.
pub fn parse_risk_score(score: &str) -> i64 {
    let trimmed = score.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value = rest[..digits_end].parse::<i64>().unwrap_or(0);
    if negative { -value } else { value }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn risk_band_boundaries() {
        let cases = [
            (0, RiskBand::Safe),
            (19, RiskBand::Safe),
            (20, RiskBand::Low),
            (39, RiskBand::Low),
            (40, RiskBand::Medium),
            (69, RiskBand::Medium),
            (70, RiskBand::High),
            (84, RiskBand::High),
            (85, RiskBand::Critical),
            (100, RiskBand::Critical),
        ];
        for (score, band) in cases {
            assert_eq!(RiskBand::from_score(score), band, "score {score}");
        }
    }

    #[test]
    fn every_score_in_range_lands_in_its_band() {
        for score in 0..=100 {
            let expected = match score {
                0..=19 => RiskBand::Safe,
                20..=39 => RiskBand::Low,
                40..=69 => RiskBand::Medium,
                70..=84 => RiskBand::High,
                _ => RiskBand::Critical,
            };
            assert_eq!(RiskBand::from_score(score), expected);
        }
    }

    #[test]
    fn parse_risk_score_follows_leading_integer() {
        assert_eq!(parse_risk_score("87"), 87);
        assert_eq!(parse_risk_score(" 42 "), 42);
        assert_eq!(parse_risk_score("72.5"), 72);
        assert_eq!(parse_risk_score("55%"), 55);
        assert_eq!(parse_risk_score("high"), 0);
        assert_eq!(parse_risk_score(""), 0);
        assert_eq!(parse_risk_score("-3"), -3);
    }

    #[test]
    fn score_strings_band_like_numbers() {
        assert_eq!(RiskBand::from_score_str("90"), RiskBand::Critical);
        assert_eq!(RiskBand::from_score_str("n/a"), RiskBand::Safe);
    }

    #[test]
    fn token_cost_per_content_type() {
        assert_eq!(ContentType::Wallet.token_cost(), 2);
        for kind in [ContentType::Text, ContentType::Url, ContentType::Email, ContentType::Qr] {
            assert_eq!(kind.token_cost(), 1);
        }
    }

    #[test]
    fn content_type_round_trips_through_str() {
        for kind in ContentType::ALL {
            assert_eq!(kind.as_str().parse::<ContentType>().unwrap(), kind);
        }
        assert!("pdf".parse::<ContentType>().is_err());
    }

    #[test]
    fn only_active_subscriptions_cancel() {
        assert!(SubscriptionStatus::Active.can_cancel());
        assert!(!SubscriptionStatus::Inactive.can_cancel());
        assert!(!SubscriptionStatus::Canceled.can_cancel());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
