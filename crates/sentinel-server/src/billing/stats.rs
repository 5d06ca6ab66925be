//! History statistics and day grouping.

use serde::Serialize;

use sentinel_core::{ContentType, RiskBand, parse_risk_score};

use crate::storage::ScanHistory;
use crate::storage::time::day_key;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub text: u64,
    pub url: u64,
    pub email: u64,
    pub qr: u64,
    pub wallet: u64,
}

impl TypeCounts {
    fn bump(&mut self, kind: ContentType) {
        match kind {
            ContentType::Text => self.text += 1,
            ContentType::Url => self.url += 1,
            ContentType::Email => self.email += 1,
            ContentType::Qr => self.qr += 1,
            ContentType::Wallet => self.wallet += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub safe: u64,
}

impl RiskCounts {
    fn bump(&mut self, band: RiskBand) {
        match band {
            RiskBand::Critical => self.critical += 1,
            RiskBand::High => self.high += 1,
            RiskBand::Medium => self.medium += 1,
            RiskBand::Low => self.low += 1,
            RiskBand::Safe => self.safe += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_scans: u64,
    /// Mean score, rounded half up.
    pub risk_avg: i64,
    pub tokens_used: i64,
    pub by_type: TypeCounts,
    pub by_risk: RiskCounts,
}

impl HistoryStats {
    pub fn from_scans(scans: &[ScanHistory]) -> Self {
        let mut stats = Self::default();
        // Scores come from the scan service unchecked.
        let mut risk_sum: i128 = 0;

        for scan in scans {
            let score = parse_risk_score(&scan.risk_score);
            risk_sum = risk_sum.saturating_add(i128::from(score));
            // Rows without a recorded cost count as one token.
            stats.tokens_used += if scan.tokens_used == 0 { 1 } else { scan.tokens_used };
            stats.by_type.bump(scan.content_type);
            stats.by_risk.bump(RiskBand::from_score(score));
        }

        let total = i128::try_from(scans.len()).unwrap_or(i128::MAX);
        stats.total_scans = scans.len() as u64;
        if total > 0 {
            let avg = risk_sum
                .saturating_mul(2)
                .saturating_add(total)
                .div_euclid(total.saturating_mul(2));
            let bounded = avg.clamp(i128::from(i64::MIN), i128::from(i64::MAX));
            stats.risk_avg = i64::try_from(bounded).unwrap_or_default();
        }
        stats
    }
}

/// Scans sharing a calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryGroup {
    pub date: String,
    pub scans: Vec<ScanHistory>,
}

/// Group newest-first rows by day, keeping the newest day first.
pub fn group_by_day(scans: &[ScanHistory]) -> Vec<HistoryGroup> {
    let mut groups: Vec<HistoryGroup> = Vec::new();
    for scan in scans {
        let date = day_key(scan.created_at);
        match groups.iter_mut().find(|g| g.date == date) {
            Some(group) => group.scans.push(scan.clone()),
            None => groups.push(HistoryGroup {
                date,
                scans: vec![scan.clone()],
            }),
        }
    }
    groups
}

/// Result of a filtered history fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    pub scans: Vec<ScanHistory>,
    pub grouped: Vec<HistoryGroup>,
    pub stats: HistoryStats,
}

impl HistoryPage {
    pub fn from_scans(scans: Vec<ScanHistory>) -> Self {
        Self {
            grouped: group_by_day(&scans),
            stats: HistoryStats::from_scans(&scans),
            scans,
        }
    }
}

#[cfg(test)]
pub(crate) fn scan_fixture(kind: ContentType, score: &str, tokens: i64, created_at: i64) -> ScanHistory {
    ScanHistory {
        id: format!("{kind}-{score}-{created_at}"),
        user_id: "u1".into(),
        content: "content".into(),
        content_type: kind,
        risk_score: score.into(),
        classification: "Unknown".into(),
        explanation: String::new(),
        recommendations: String::new(),
        tokens_used: tokens,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_zeroed_stats() {
        let stats = HistoryStats::from_scans(&[]);
        assert_eq!(stats, HistoryStats::default());
        assert_eq!(stats.risk_avg, 0);
    }

    #[test]
    fn stats_count_types_bands_and_tokens() {
        let scans = [
            scan_fixture(ContentType::Wallet, "90", 2, 30),
            scan_fixture(ContentType::Text, "71", 1, 20),
            scan_fixture(ContentType::Text, "abc", 0, 10),
        ];
        let stats = HistoryStats::from_scans(&scans);
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.tokens_used, 4);
        assert_eq!(stats.by_type.text, 2);
        assert_eq!(stats.by_type.wallet, 1);
        assert_eq!(stats.by_risk.critical, 1);
        assert_eq!(stats.by_risk.high, 1);
        assert_eq!(stats.by_risk.safe, 1);
        // (90 + 71 + 0) / 3 = 53.67
        assert_eq!(stats.risk_avg, 54);
    }

    #[test]
    fn risk_average_rounds_half_up() {
        let scans = [
            scan_fixture(ContentType::Url, "20", 1, 2),
            scan_fixture(ContentType::Url, "21", 1, 1),
        ];
        assert_eq!(HistoryStats::from_scans(&scans).risk_avg, 21);
    }

    #[test]
    fn oversized_scores_do_not_overflow() {
        let scans = [
            scan_fixture(ContentType::Text, "9223372036854775807", 1, 2),
            scan_fixture(ContentType::Text, "9223372036854775807", 1, 1),
            scan_fixture(ContentType::Text, "50", 1, 0),
        ];
        let stats = HistoryStats::from_scans(&scans);
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.by_risk.critical, 2);
        assert_eq!(stats.by_risk.medium, 1);
        // (2 * i64::MAX + 50) / 3 still fits.
        assert_eq!(stats.risk_avg, 6_148_914_691_236_517_221);
    }

    #[test]
    fn stats_serialize_camel_case() {
        let value = serde_json::to_value(HistoryStats::default()).unwrap_or_default();
        assert!(value.get("totalScans").is_some());
        assert!(value.get("riskAvg").is_some());
        assert!(value["byType"].get("wallet").is_some());
        assert!(value["byRisk"].get("critical").is_some());
    }

    #[test]
    fn groups_keep_newest_day_first() {
        // 2025-03-05 12:00, 2025-03-05 08:00, 2025-03-04 23:00 UTC
        let scans = vec![
            scan_fixture(ContentType::Text, "1", 1, 1_741_176_000),
            scan_fixture(ContentType::Text, "2", 1, 1_741_161_600),
            scan_fixture(ContentType::Text, "3", 1, 1_741_129_200),
        ];
        let page = HistoryPage::from_scans(scans);
        assert_eq!(page.grouped.len(), 2);
        assert_eq!(page.grouped[0].date, "March 5, 2025");
        assert_eq!(page.grouped[0].scans.len(), 2);
        assert_eq!(page.grouped[1].date, "March 4, 2025");
        assert_eq!(page.stats.total_scans, 3);
    }
}
