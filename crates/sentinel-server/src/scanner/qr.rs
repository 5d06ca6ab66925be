//! Routing of decoded QR payloads.

use std::sync::LazyLock;

use regex::Regex;

use super::validate::{WALLET_RE, is_url};

#[allow(clippy::expect_used)]
static ETHEREUM_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ethereum:(0x[a-fA-F0-9]{40})(?:\?.*)?$").expect("static regex pattern is valid")
});

#[allow(clippy::expect_used)]
static EMBEDDED_ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").expect("static regex pattern is valid"));

/// What a QR payload should be scanned as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrRoute {
    /// Lowercased wallet address.
    Wallet(String),
    Url(String),
    Text(String),
}

/// Find an Ethereum address: the whole payload, an `ethereum:` URI, or
/// anywhere inside it, in that order.
pub fn extract_address(raw: &str) -> Option<String> {
    let data = raw.trim();
    if WALLET_RE.is_match(data) {
        return Some(data.to_lowercase());
    }
    if let Some(caps) = ETHEREUM_URI_RE.captures(data) {
        return Some(caps[1].to_lowercase());
    }
    EMBEDDED_ADDRESS_RE
        .find(data)
        .map(|m| m.as_str().to_lowercase())
}

pub fn route(raw: &str) -> QrRoute {
    if let Some(address) = extract_address(raw) {
        QrRoute::Wallet(address)
    } else if is_url(raw) {
        QrRoute::Url(raw.to_string())
    } else {
        QrRoute::Text(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn exact_address() {
        assert_eq!(
            extract_address(" 0xABCDEF0123456789abcdef0123456789abcdef01 ").as_deref(),
            Some("0xabcdef0123456789abcdef0123456789abcdef01")
        );
    }

    #[test]
    fn ethereum_uri_with_query() {
        let raw = format!("ethereum:{ADDR}?amount=1");
        assert_eq!(extract_address(&raw).as_deref(), Some(ADDR));
        assert_eq!(route(&raw), QrRoute::Wallet(ADDR.to_string()));
    }

    #[test]
    fn embedded_address() {
        let raw = format!("send funds to {ADDR} asap");
        assert_eq!(extract_address(&raw).as_deref(), Some(ADDR));
    }

    #[test]
    fn urls_and_text_fall_through() {
        assert_eq!(
            route("https://example.com"),
            QrRoute::Url("https://example.com".into())
        );
        assert_eq!(
            route("just some text"),
            QrRoute::Text("just some text".into())
        );
        assert_eq!(extract_address("0x1234"), None);
    }
}
