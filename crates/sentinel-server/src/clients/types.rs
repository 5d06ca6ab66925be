//! Wire types for the scan service and payment gateway.
//!
//! Upstream bodies are loose: the scan service sends `riskScore` or
//! `risk_score`, as a string or a number, and the gateway may nest its
//! payload under `data`. The `Raw*` shapes accept all of that and convert
//! into the strict types the rest of the crate uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized scan verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScanResponse")]
pub struct ScanVerdict {
    pub risk_score: String,
    pub classification: String,
    pub explanation: String,
    pub recommendations: String,
    pub detected_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Score {
    Text(String),
    Number(serde_json::Number),
}

impl Score {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawScanResponse {
    #[serde(rename = "riskScore", default)]
    risk_score_camel: Option<Score>,
    #[serde(default)]
    risk_score: Option<Score>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    recommendations: Option<String>,
    #[serde(rename = "detectedBy", default)]
    detected_by: Option<String>,
}

impl From<RawScanResponse> for ScanVerdict {
    fn from(raw: RawScanResponse) -> Self {
        Self {
            risk_score: raw
                .risk_score_camel
                .or(raw.risk_score)
                .map_or_else(|| "0".to_string(), Score::into_string),
            classification: raw.classification.unwrap_or_else(|| "Unknown".to_string()),
            explanation: raw.explanation.unwrap_or_default(),
            recommendations: raw.recommendations.unwrap_or_default(),
            detected_by: raw.detected_by,
        }
    }
}

/// Body of a payment initialization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitPayment {
    pub amount: f64,
    pub email: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Where to send the payer, and the reference to verify later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentAuthorization {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Deserialize)]
struct AuthorizationFields {
    authorization_url: Option<String>,
    reference: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RawInitResponse {
    #[serde(default)]
    data: Option<AuthorizationFields>,
    #[serde(flatten)]
    flat: AuthorizationFields,
}

impl RawInitResponse {
    /// Nested `data` wins over top-level fields.
    pub(crate) fn into_authorization(self) -> Option<PaymentAuthorization> {
        let fields = self.data.unwrap_or(self.flat);
        Some(PaymentAuthorization {
            authorization_url: fields.authorization_url?,
            reference: fields.reference?,
        })
    }
}

#[derive(Deserialize)]
struct VerifyData {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RawVerifyResponse {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    data: Option<VerifyData>,
}

impl RawVerifyResponse {
    pub(crate) fn is_success(&self) -> bool {
        self.status.as_bool() == Some(true)
            && self
                .data
                .as_ref()
                .and_then(|d| d.status.as_deref())
                .is_some_and(|s| s == "success")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict(value: Value) -> ScanVerdict {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn camel_case_score_wins() {
        let v = verdict(json!({"riskScore": "87", "risk_score": "12"}));
        assert_eq!(v.risk_score, "87");
    }

    #[test]
    fn snake_case_score_is_fallback() {
        assert_eq!(verdict(json!({"risk_score": "12"})).risk_score, "12");
    }

    #[test]
    fn numeric_scores_become_strings() {
        assert_eq!(verdict(json!({"riskScore": 42})).risk_score, "42");
        assert_eq!(verdict(json!({"risk_score": 72.5})).risk_score, "72.5");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let v = verdict(json!({}));
        assert_eq!(v.risk_score, "0");
        assert_eq!(v.classification, "Unknown");
        assert_eq!(v.explanation, "");
        assert_eq!(v.recommendations, "");
        assert_eq!(v.detected_by, None);
    }

    #[test]
    fn detected_by_and_extra_fields() {
        let v = verdict(json!({
            "riskScore": "90",
            "classification": "Scam",
            "detectedBy": "heuristics",
            "somethingElse": [1, 2, 3]
        }));
        assert_eq!(v.classification, "Scam");
        assert_eq!(v.detected_by.as_deref(), Some("heuristics"));
    }

    #[test]
    fn authorization_nested_or_flat() {
        let nested: RawInitResponse = serde_json::from_value(json!({
            "status": true,
            "data": {"authorization_url": "https://pay/abc", "reference": "abc"}
        }))
        .unwrap();
        assert_eq!(nested.into_authorization().unwrap().reference, "abc");

        let flat: RawInitResponse = serde_json::from_value(json!({
            "authorization_url": "https://pay/xyz", "reference": "xyz"
        }))
        .unwrap();
        assert_eq!(
            flat.into_authorization().unwrap().authorization_url,
            "https://pay/xyz"
        );

        let empty: RawInitResponse = serde_json::from_value(json!({"status": false})).unwrap();
        assert!(empty.into_authorization().is_none());
    }

    #[test]
    fn verify_requires_both_flags() {
        let ok: RawVerifyResponse =
            serde_json::from_value(json!({"status": true, "data": {"status": "success"}})).unwrap();
        assert!(ok.is_success());

        let abandoned: RawVerifyResponse =
            serde_json::from_value(json!({"status": true, "data": {"status": "abandoned"}}))
                .unwrap();
        assert!(!abandoned.is_success());

        let failed: RawVerifyResponse =
            serde_json::from_value(json!({"status": false, "data": {"status": "success"}}))
                .unwrap();
        assert!(!failed.is_success());

        let bare: RawVerifyResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!bare.is_success());
    }
}
