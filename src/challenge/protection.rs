//! Categorized bot-protection classification over HTML and error text.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::BOT_DETECTION_THRESHOLD;
use crate::models::{BotProtectionRecord, ProtectionType};

const CLOUDFLARE_INDICATORS: &[&str] = &[
    "cloudflare",
    "cf-ray",
    "cf-mitigated",
    "checking your browser",
    "ddos protection by cloudflare",
    "attention required",
    "ray id:",
];

const DDOS_GUARD_INDICATORS: &[&str] = &[
    "ddos-guard",
    "checking your browser before accessing",
    "ddosguard.net",
    "under ddos attack",
];

const RECAPTCHA_INDICATORS: &[&str] = &[
    "recaptcha",
    "i'm not a robot",
    "google.com/recaptcha",
    "verify you are human",
];

const RATE_LIMIT_INDICATORS: &[&str] = &[
    "rate limit",
    "too many requests",
    "requests per minute",
    "try again later",
    "temporary block",
];

const GENERIC_INDICATORS: &[&str] = &[
    "bot protection",
    "automated traffic",
    "suspicious activity",
    "access denied",
    "forbidden",
    "verification required",
    "human verification",
];

const ERROR_PHRASES: &[&str] = &[
    "access denied",
    "forbidden",
    "blocked",
    "suspicious activity",
    "automated traffic",
    "bot detected",
    "rate limit",
    "too many requests",
    "verification required",
    "challenge",
];

static META_REFRESH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta[^>]*http-equiv=["']?refresh["']?"#)
        .expect("Failed to parse meta refresh regex - this is a bug")
});

fn label(prefix: &str, indicator: &str) -> String {
    format!("{prefix}_{}", indicator.replace(' ', "_"))
}

fn html_indicators(html: &str) -> Vec<String> {
    let lowered = html.to_lowercase();
    let mut found = Vec::new();

    for (prefix, list) in [
        ("cloudflare", CLOUDFLARE_INDICATORS),
        ("ddos_guard", DDOS_GUARD_INDICATORS),
        ("recaptcha", RECAPTCHA_INDICATORS),
        ("rate_limit", RATE_LIMIT_INDICATORS),
        ("generic", GENERIC_INDICATORS),
    ] {
        found.extend(
            list.iter()
                .filter(|indicator| lowered.contains(*indicator))
                .map(|indicator| label(prefix, indicator)),
        );
    }

    if lowered.contains("challenge") && (lowered.contains("javascript") || lowered.contains("js")) {
        found.push("javascript_challenge".to_string());
    }
    if META_REFRESH.is_match(&lowered) {
        found.push("meta_refresh_redirect".to_string());
    }
    found
}

fn error_indicators(error: &str) -> Vec<String> {
    let lowered = error.to_lowercase();
    let mut found = Vec::new();

    if lowered.contains("403") || lowered.contains("forbidden") {
        found.push("http_403_forbidden".to_string());
    }
    if lowered.contains("429") || lowered.contains("too many requests") {
        found.push("http_429_rate_limit".to_string());
    }
    if lowered.contains("503") || lowered.contains("service unavailable") {
        found.push("http_503_service_unavailable".to_string());
    }
    found.extend(
        ERROR_PHRASES
            .iter()
            .filter(|phrase| lowered.contains(*phrase))
            .map(|phrase| label("error_message", phrase)),
    );
    found
}

/// Picks the protection type and confidence from raw (non-deduplicated)
/// indicator labels.
fn score(indicators: &[String]) -> (Option<ProtectionType>, f64) {
    let count = |pred: &dyn Fn(&str) -> bool| indicators.iter().filter(|i| pred(i)).count();

    let cloudflare = count(&|i| i.contains("cloudflare"));
    let ddos_guard = count(&|i| i.contains("ddos_guard"));
    let recaptcha = count(&|i| i.contains("recaptcha"));
    let rate_limit = count(&|i| i.contains("rate_limit") || i.contains("429"));
    let generic = count(&|i| i.contains("generic") || i.contains("403") || i.contains("blocked"));

    let max_score = [cloudflare, ddos_guard, recaptcha, rate_limit, generic]
        .into_iter()
        .max()
        .unwrap_or(0);
    let confidence = (max_score as f64 * 0.4 + indicators.len() as f64 * 0.1).min(1.0);

    if cloudflare > 0 {
        (Some(ProtectionType::Cloudflare), confidence.max(0.7))
    } else if ddos_guard > 0 {
        (Some(ProtectionType::DdosGuard), confidence.max(0.7))
    } else if recaptcha > 0 {
        (Some(ProtectionType::Recaptcha), confidence.max(0.6))
    } else if rate_limit > 0 {
        (Some(ProtectionType::RateLimit), confidence.max(0.8))
    } else if generic > 0 {
        (Some(ProtectionType::Unknown), confidence.max(0.4))
    } else {
        (None, confidence)
    }
}

/// Classifies bot protection from page HTML and an optional fetch error.
///
/// Pure function; either input may be empty.
pub fn classify_protection(html: Option<&str>, error: Option<&str>) -> BotProtectionRecord {
    let mut indicators = Vec::new();
    if let Some(html) = html.filter(|h| !h.is_empty()) {
        indicators.extend(html_indicators(html));
    }
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        indicators.extend(error_indicators(error));
    }

    if indicators.is_empty() {
        return BotProtectionRecord::none();
    }

    let (protection_type, confidence) = score(&indicators);
    let unique: BTreeSet<String> = indicators.into_iter().collect();

    BotProtectionRecord {
        detected: confidence > BOT_DETECTION_THRESHOLD,
        protection_type,
        indicators: unique.into_iter().collect(),
        confidence,
    }
}
