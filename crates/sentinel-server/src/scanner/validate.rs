//! Input checks run before anything leaves the process.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use super::error::ScanError;

/// Text longer than this is cut and suffixed with `...`.
pub const MAX_TEXT_CHARS: usize = 1000;

#[allow(clippy::expect_used)]
pub(crate) static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex pattern is valid"));

#[allow(clippy::expect_used)]
pub(crate) static WALLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("static regex pattern is valid"));

pub fn text(input: &str) -> Result<String, ScanError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(ScanError::InvalidInput("Please enter text to scan"));
    }
    Ok(match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    })
}

pub fn url(input: &str) -> Result<String, ScanError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ScanError::InvalidInput("Please enter a URL to scan"));
    }
    if !is_url(url) {
        return Err(ScanError::InvalidInput("Please enter a valid URL"));
    }
    Ok(url.to_lowercase())
}

pub fn email(input: &str) -> Result<String, ScanError> {
    let email = input.trim().to_lowercase();
    if email.is_empty() {
        return Err(ScanError::InvalidInput(
            "Please enter an email address to scan",
        ));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(ScanError::InvalidInput("Please enter a valid email address"));
    }
    Ok(email)
}

pub fn wallet(input: &str) -> Result<String, ScanError> {
    let wallet = input.trim();
    if wallet.is_empty() {
        return Err(ScanError::InvalidInput(
            "Please enter a wallet address to scan",
        ));
    }
    if !WALLET_RE.is_match(wallet) {
        return Err(ScanError::InvalidInput(
            "Please enter a valid Ethereum wallet address (0x + 40 hex chars)",
        ));
    }
    Ok(wallet.to_lowercase())
}

/// Absolute URL with a scheme.
pub fn is_url(input: &str) -> bool {
    Url::parse(input.trim()).is_ok()
}
