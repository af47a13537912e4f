//! Certificate field extraction and record assembly.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::models::SslRecord;

/// The certificate fields an [`SslRecord`] is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFacts {
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub not_after: DateTime<Utc>,
}

/// Parses the leaf certificate. The issuer is its organization name, falling
/// back to the common name; the subject is its common name.
pub(crate) fn parse_certificate(der: &[u8]) -> Result<CertificateFacts> {
    let (_, cert) =
        x509_parser::parse_x509_certificate(der).context("Failed to parse X.509 certificate")?;

    let issuer = cert
        .issuer()
        .iter_organization()
        .chain(cert.issuer().iter_common_name())
        .find_map(|attr| attr.as_str().ok().map(str::to_string));
    let subject = cert
        .subject()
        .iter_common_name()
        .find_map(|attr| attr.as_str().ok().map(str::to_string));

    let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .context("Certificate expiry out of range")?;

    Ok(CertificateFacts {
        issuer,
        subject,
        not_after,
    })
}

/// Whole days from `now` until `expires`, rounded down, so a certificate that
/// expired an hour ago reports -1.
pub fn days_until(expires: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires - now).num_seconds().div_euclid(86_400)
}

/// Builds the record for a completed handshake.
///
/// `validation_error` is the chain verdict; an otherwise valid chain whose
/// leaf is past its expiry is still invalid.
pub fn build_record(
    host: &str,
    facts: CertificateFacts,
    validation_error: Option<String>,
    tls_version: Option<String>,
    now: DateTime<Utc>,
) -> SslRecord {
    let days = days_until(facts.not_after, now);
    let certificate_error = match validation_error {
        Some(e) => Some(e),
        None if days < 0 => Some(format!("Certificate expired {} days ago", -days)),
        None => None,
    };

    SslRecord {
        has_tls: true,
        is_valid: certificate_error.is_none(),
        issuer: Some(facts.issuer.unwrap_or_else(|| "Unknown".to_string())),
        subject: Some(facts.subject.unwrap_or_else(|| host.to_string())),
        expires_at: Some(facts.not_after),
        days_until_expiry: Some(days),
        tls_version,
        certificate_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_days_until_rounds_down() {
        assert_eq!(days_until(now() + Duration::days(10), now()), 10);
        assert_eq!(days_until(now() - Duration::hours(1), now()), -1);
        assert_eq!(days_until(now() + Duration::hours(23), now()), 0);
    }

    #[test]
    fn test_expired_certificate_is_invalid_with_negative_days() {
        let facts = CertificateFacts {
            issuer: Some("Let's Encrypt".to_string()),
            subject: Some("expired.example".to_string()),
            not_after: now() - Duration::days(3),
        };
        let record = build_record(
            "expired.example",
            facts,
            Some("invalid peer certificate: Expired".to_string()),
            Some("TLSv1_3".to_string()),
            now(),
        );
        assert!(record.has_tls);
        assert!(!record.is_valid);
        assert_eq!(record.days_until_expiry, Some(-3));
        assert!(record.certificate_error.is_some());
    }

    #[test]
    fn test_expired_leaf_without_chain_error_is_invalid() {
        let facts = CertificateFacts {
            issuer: None,
            subject: None,
            not_after: now() - Duration::days(1),
        };
        let record = build_record("host.example", facts, None, None, now());
        assert!(!record.is_valid);
        assert_eq!(record.issuer.as_deref(), Some("Unknown"));
        assert_eq!(record.subject.as_deref(), Some("host.example"));
        assert_eq!(
            record.certificate_error.as_deref(),
            Some("Certificate expired 1 days ago")
        );
    }

    #[test]
    fn test_valid_certificate() {
        let facts = CertificateFacts {
            issuer: Some("DigiCert Inc".to_string()),
            subject: Some("www.example.com".to_string()),
            not_after: now() + Duration::days(90),
        };
        let record = build_record("www.example.com", facts, None, None, now());
        assert!(record.is_valid);
        assert_eq!(record.days_until_expiry, Some(90));
        assert_eq!(record.certificate_error, None);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_certificate(b"not a certificate").is_err());
    }
}
