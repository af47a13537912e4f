//! TLS certificate analysis.
//!
//! [`CertificateAnalyzer`] opens a raw TLS connection to a host, reads the
//! leaf certificate and validates the chain against the Mozilla roots
//! (`webpki-roots`). It never fails: every problem is encoded in the
//! returned [`SslRecord`].
//!
//! Uses `tokio-rustls` for the async handshake and `x509-parser` for
//! certificate parsing.

mod extract;
mod verifier;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rustls::client::danger::ServerCertVerifier;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::{DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS, TCP_CONNECT_TIMEOUT_SECS};
use crate::models::SslRecord;

pub use extract::{build_record, days_until, CertificateFacts};

use extract::parse_certificate;
use verifier::RecordingVerifier;

/// Per-host certificate analyzer.
#[derive(Debug, Clone)]
pub struct CertificateAnalyzer {
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl Default for CertificateAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS))
    }
}

impl CertificateAnalyzer {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self {
            connect_timeout: Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
            handshake_timeout,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Analyzes the host of `url`.
    ///
    /// Plain `http://` URLs are reported as `has_tls=false` without touching
    /// the network.
    pub async fn analyze_url(&self, url: &str) -> SslRecord {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return SslRecord::no_tls(format!("Invalid URL: {e}")),
        };
        if parsed.scheme() != "https" {
            return SslRecord::no_tls("Not using HTTPS");
        }
        let Some(host) = parsed.host_str() else {
            return SslRecord::no_tls("Invalid hostname");
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.analyze_host(host, parsed.port().unwrap_or(443)).await
    }

    /// Connects to `host:port`, completes a handshake and reports the
    /// certificate.
    pub async fn analyze_host(&self, host: &str, port: u16) -> SslRecord {
        log::debug!("Analyzing certificate for {host}:{port}");

        let server_name = match ServerName::try_from(host.to_string()) {
            Ok(name) => name,
            Err(e) => return SslRecord::no_tls(format!("Invalid hostname: {e}")),
        };

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = match RecordingVerifier::new(Arc::clone(&provider)) {
            Ok(v) => Arc::new(v),
            Err(e) => return SslRecord::no_tls(format!("TLS setup failed: {e}")),
        };
        let recording: Arc<dyn ServerCertVerifier> = verifier.clone();
        let config = match ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
        {
            Ok(builder) => builder
                .dangerous()
                .with_custom_certificate_verifier(recording)
                .with_no_client_auth(),
            Err(e) => return SslRecord::no_tls(format!("TLS setup failed: {e}")),
        };

        let sock = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        {
            Ok(Ok(sock)) => sock,
            Ok(Err(e)) => {
                log::debug!("Failed to connect to {host}:{port} - {e}");
                return SslRecord::no_tls(format!("Connection failed: {e}"));
            }
            Err(_) => {
                log::debug!("TCP connection timeout for {host}:{port}");
                return SslRecord::no_tls(format!(
                    "Connection timeout ({}s)",
                    self.connect_timeout.as_secs()
                ));
            }
        };

        let connector = TlsConnector::from(Arc::new(config));
        let tls_stream = match tokio::time::timeout(
            self.handshake_timeout,
            connector.connect(server_name, sock),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                log::debug!("TLS handshake failed for {host}:{port}: {e}");
                return SslRecord::no_tls(format!("TLS handshake failed: {e}"));
            }
            Err(_) => {
                log::debug!("TLS handshake timeout for {host}:{port}");
                return SslRecord::no_tls(format!(
                    "TLS handshake timeout ({}s)",
                    self.handshake_timeout.as_secs()
                ));
            }
        };

        let connection = tls_stream.get_ref().1;
        let tls_version = connection.protocol_version().map(|v| format!("{v:?}"));

        let Some(leaf) = connection.peer_certificates().and_then(|certs| certs.first()) else {
            return SslRecord {
                has_tls: true,
                is_valid: false,
                tls_version,
                certificate_error: Some("Could not retrieve certificate".to_string()),
                ..SslRecord::no_tls("")
            };
        };

        match parse_certificate(leaf.as_ref()) {
            Ok(facts) => {
                let record = build_record(
                    host,
                    facts,
                    verifier.validation_error(),
                    tls_version,
                    Utc::now(),
                );
                log::debug!("Certificate for {host}: {}", record.status_label());
                record
            }
            Err(e) => SslRecord {
                has_tls: true,
                is_valid: false,
                tls_version,
                certificate_error: Some(format!("Certificate check failed: {e:#}")),
                ..SslRecord::no_tls("")
            },
        }
    }
}
