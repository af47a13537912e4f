//! Browser identity presented on one fetch attempt.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_USER_AGENT;
use crate::models::Viewport;

use super::stealth::build_init_script;

/// A consistent browser identity: the user agent, language and encoding
/// headers and the viewport all describe the same kind of desktop browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub viewport: Viewport,
}

impl FingerprintProfile {
    pub fn new(
        user_agent: impl Into<String>,
        accept_language: impl Into<String>,
        accept_encoding: impl Into<String>,
        viewport: Viewport,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: accept_language.into(),
            accept_encoding: accept_encoding.into(),
            viewport,
        }
    }

    /// The fixed identity used when randomization is disabled.
    pub fn default_with_viewport(viewport: Viewport) -> Self {
        Self::new(
            DEFAULT_USER_AGENT,
            "en-US,en;q=0.9",
            "gzip, deflate, br",
            viewport,
        )
    }

    /// Request headers carried by every navigation with this identity.
    ///
    /// The user agent is not included; engines set it through their own
    /// override mechanism.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("Accept-Language", self.accept_language.clone()),
            ("Accept-Encoding", self.accept_encoding.clone()),
            ("Upgrade-Insecure-Requests", "1".to_string()),
        ]
    }

    /// Language tags in preference order, without quality values.
    pub fn languages(&self) -> Vec<String> {
        self.accept_language
            .split(',')
            .filter_map(|part| {
                let tag = part.split(';').next()?.trim();
                (!tag.is_empty()).then(|| tag.to_string())
            })
            .collect()
    }

    /// `navigator.platform` value matching the user agent.
    pub fn platform(&self) -> &'static str {
        if self.user_agent.contains("Macintosh") {
            "MacIntel"
        } else if self.user_agent.contains("Linux") {
            "Linux x86_64"
        } else {
            "Win32"
        }
    }

    /// Script evaluated before any page script, hiding automation markers.
    pub fn init_script(&self) -> String {
        build_init_script(&self.languages(), self.platform())
    }
}
