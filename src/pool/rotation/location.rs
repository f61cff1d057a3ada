//! Location-affinity proxy selection
//!
//! Narrows the eligible set to a requested country and picks uniformly.
//! An empty country match falls back to the whole eligible set rather than
//! failing; no requested country degrades to a plain random pick.

use rand::seq::SliceRandom;

use super::random;
use crate::models::ProxyConfig;

/// Pick one proxy, preferring the requested country
pub fn select<'a>(
    eligible: &'a [ProxyConfig],
    country_code: Option<&str>,
) -> Option<&'a ProxyConfig> {
    let Some(code) = country_code else {
        return random::select(eligible);
    };

    let matching: Vec<&ProxyConfig> = eligible
        .iter()
        .filter(|p| p.matches_country(code))
        .collect();

    if matching.is_empty() {
        random::select(eligible)
    } else {
        matching.choose(&mut rand::thread_rng()).copied()
    }
}
