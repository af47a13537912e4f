//! Randomized but internally consistent browser identities.
//!
//! This module provides:
//! - [`FingerprintProfile`]: user agent, language/encoding headers and viewport
//! - [`FingerprintPool`]: uniform random selection per fetch attempt
//! - The init script hiding automation markers from page scripts

mod pool;
mod profile;
mod stealth;

pub use pool::FingerprintPool;
pub use profile::FingerprintProfile;
pub use stealth::build_init_script;
