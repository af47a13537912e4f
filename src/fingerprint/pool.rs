//! Pool of consistent browser identities.

use rand::seq::IndexedRandom;

use crate::models::Viewport;

use super::profile::FingerprintProfile;

const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const CHROME_LINUX: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";

/// Built-in Chromium-family identities. Only Chromium user agents are used so
/// that the identity matches the engine actually driven.
fn builtin_profiles() -> Vec<FingerprintProfile> {
    vec![
        FingerprintProfile::new(
            CHROME_WINDOWS,
            "en-US,en;q=0.9",
            "gzip, deflate, br",
            Viewport::new(1920, 1080),
        ),
        FingerprintProfile::new(
            CHROME_WINDOWS,
            "en-GB,en;q=0.9",
            "gzip, deflate, br",
            Viewport::new(1366, 768),
        ),
        FingerprintProfile::new(
            EDGE_WINDOWS,
            "en-US,en;q=0.9",
            "gzip, deflate, br",
            Viewport::new(1536, 864),
        ),
        FingerprintProfile::new(
            CHROME_MAC,
            "en-US,en;q=0.9",
            "gzip, deflate, br",
            Viewport::new(1440, 900),
        ),
        FingerprintProfile::new(
            CHROME_MAC,
            "en-US,en;q=0.8",
            "gzip, deflate, br",
            Viewport::new(1680, 1050),
        ),
        FingerprintProfile::new(
            CHROME_LINUX,
            "en-US,en;q=0.9",
            "gzip, deflate",
            Viewport::new(1920, 1080),
        ),
    ]
}

/// Hands out a [`FingerprintProfile`] per fetch attempt.
///
/// With randomization on, every call draws uniformly from the pool;
/// otherwise the fixed default profile is returned.
#[derive(Debug, Clone)]
pub struct FingerprintPool {
    profiles: Vec<FingerprintProfile>,
    default_profile: FingerprintProfile,
    randomize: bool,
}

impl FingerprintPool {
    pub fn new(randomize: bool, default_viewport: Viewport) -> Self {
        Self::with_profiles(builtin_profiles(), randomize, default_viewport)
    }

    /// Uses a caller-supplied pool. An empty pool behaves like a disabled one.
    pub fn with_profiles(
        profiles: Vec<FingerprintProfile>,
        randomize: bool,
        default_viewport: Viewport,
    ) -> Self {
        Self {
            profiles,
            default_profile: FingerprintProfile::default_with_viewport(default_viewport),
            randomize,
        }
    }

    pub fn is_randomized(&self) -> bool {
        self.randomize && !self.profiles.is_empty()
    }

    pub fn default_profile(&self) -> &FingerprintProfile {
        &self.default_profile
    }

    pub fn pick(&self) -> FingerprintProfile {
        if !self.randomize {
            return self.default_profile.clone();
        }
        self.profiles
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| self.default_profile.clone())
    }
}
