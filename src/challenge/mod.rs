//! Bot-defense recognition.
//!
//! Two pure classifiers over page text:
//! - [`ChallengeDetector`]: is this an interstitial the fetcher should try to pass?
//! - [`classify_protection`]: which protection provider is in front of the site,
//!   and how confident are we?

mod detector;
mod protection;

pub use detector::{ChallengeDetector, ChallengeVerdict, RemediationAction};
pub use protection::classify_protection;
