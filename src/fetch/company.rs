//! Best-effort company/site name extraction.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::config::{MAX_COMPANY_NAME_CHARS, TITLE_SUFFIXES};

static OG_SITE_NAME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:site_name']")
        .expect("Failed to parse og:site_name selector - this is a bug")
});

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("Failed to parse title selector - this is a bug")
});

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1").expect("Failed to parse h1 selector - this is a bug")
});

fn element_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

fn short_enough(text: &str) -> bool {
    text.chars().count() < MAX_COMPANY_NAME_CHARS
}

fn strip_title_suffixes(title: &str) -> &str {
    let mut title = title.trim();
    for suffix in TITLE_SUFFIXES {
        if let Some(stripped) = title.strip_suffix(suffix) {
            title = stripped.trim();
        }
    }
    title
}

/// Capitalizes the first letter of every alphabetic run.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Name derived from the host: `www.acme-tools.com` becomes `Acme-Tools`.
pub fn domain_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let base = host
        .strip_suffix(".co.uk")
        .or_else(|| host.strip_suffix(".com"))
        .unwrap_or(host);
    (!base.is_empty()).then(|| title_case(base))
}

/// Extracts a company name from the page, trying in order: the
/// `og:site_name` meta tag, the title without common suffixes, the first
/// `<h1>`, then a name derived from the domain. Title and heading are only
/// used when shorter than [`MAX_COMPANY_NAME_CHARS`].
pub fn extract_company_name(html: &str, url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let og_site_name = document
        .select(&OG_SITE_NAME_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    if og_site_name.is_some() {
        return og_site_name;
    }

    if let Some(title) = element_text(&document, &TITLE_SELECTOR) {
        let title = strip_title_suffixes(&title);
        if !title.is_empty() && short_enough(title) {
            return Some(title.to_string());
        }
    }

    if let Some(heading) = element_text(&document, &H1_SELECTOR) {
        if short_enough(&heading) {
            return Some(heading);
        }
    }

    domain_name(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_og_site_name_wins() {
        let html = r#"<html><head><meta property="og:site_name" content=" Acme Corp "><title>Welcome - Home</title></head><body><h1>Hello</h1></body></html>"#;
        assert_eq!(
            extract_company_name(html, "https://acme.com/").as_deref(),
            Some("Acme Corp")
        );
    }

    #[test]
    fn test_title_suffix_stripped() {
        let html = "<html><head><title>Globex Industries | Official Site</title></head></html>";
        assert_eq!(
            extract_company_name(html, "https://globex.com/").as_deref(),
            Some("Globex Industries")
        );
    }

    #[test]
    fn test_long_title_falls_through_to_heading() {
        let title = "x".repeat(150);
        let html = format!("<html><head><title>{title}</title></head><body><h1>Initech</h1></body></html>");
        assert_eq!(
            extract_company_name(&html, "https://initech.com/").as_deref(),
            Some("Initech")
        );
    }

    #[test]
    fn test_domain_fallback() {
        let html = "<html><body><p>no names here</p></body></html>";
        assert_eq!(
            extract_company_name(html, "https://www.acme-tools.com/about").as_deref(),
            Some("Acme-Tools")
        );
        assert_eq!(domain_name("https://shop.example.co.uk/").as_deref(), Some("Shop.Example"));
    }

    #[test]
    fn test_domain_fallback_invalid_url() {
        assert_eq!(extract_company_name("", "not a url"), None);
    }
}
