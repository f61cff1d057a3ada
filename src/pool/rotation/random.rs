//! Uniform random proxy selection

use rand::seq::SliceRandom;

use crate::models::ProxyConfig;

/// Pick one proxy uniformly at random
pub fn select(eligible: &[ProxyConfig]) -> Option<&ProxyConfig> {
    eligible.choose(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::testing;

    #[test]
    fn test_empty_returns_none() {
        assert!(select(&[]).is_none());
    }

    #[test]
    fn test_single_proxy() {
        let eligible = vec![testing::config("only", None)];
        assert_eq!(select(&eligible).unwrap().id, "only");
    }

    #[test]
    fn test_picks_stay_within_set() {
        let eligible = vec![
            testing::config("a", None),
            testing::config("b", None),
            testing::config("c", None),
        ];

        for _ in 0..50 {
            let pick = select(&eligible).unwrap();
            assert!(eligible.iter().any(|p| p.id == pick.id));
        }
    }
}
