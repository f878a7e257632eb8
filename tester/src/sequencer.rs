//! Test Sequencer
//!
//! Orders suites by tier, then lexicographically by path. Pure and
//! deterministic: the same input always yields the same order.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution tier; lower priority runs first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Smoke,
    Api,
    Integration,
    E2e,
    Performance,
    Other,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Smoke,
        Tier::Api,
        Tier::Integration,
        Tier::E2e,
        Tier::Performance,
        Tier::Other,
    ];

    pub fn priority(self) -> u8 {
        match self {
            Tier::Smoke => 1,
            Tier::Api => 2,
            Tier::Integration => 3,
            Tier::E2e => 4,
            Tier::Performance => 5,
            Tier::Other => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Smoke => "smoke",
            Tier::Api => "api",
            Tier::Integration => "integration",
            Tier::E2e => "e2e",
            Tier::Performance => "performance",
            Tier::Other => "other",
        }
    }

    /// Default wall-clock budget for one case of a suite in this tier
    pub fn default_timeout(self) -> Duration {
        match self {
            Tier::Smoke => Duration::from_secs(5),
            Tier::Api => Duration::from_secs(10),
            Tier::Integration => Duration::from_secs(20),
            Tier::E2e => Duration::from_secs(30),
            Tier::Performance => Duration::from_secs(120),
            Tier::Other => Duration::from_secs(30),
        }
    }

    /// Whether suites of this tier may run concurrently with each other
    pub fn allows_parallel(self) -> bool {
        matches!(self, Tier::Smoke | Tier::Api)
    }

    /// Whether a failure in this tier aborts the rest of the run
    pub fn fail_fast(self) -> bool {
        self == Tier::Smoke
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Tier::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown tier '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Tier of a suite path, from its `/`-separated directory segments
///
/// Only directory segments count, so `smoke.rs` alone is `Other` while
/// `smoke/health.rs` and `suites/smoke/health.rs` are `Smoke`. When several
/// segments name a tier the highest-priority one wins.
pub fn tier_for_path(path: &str) -> Tier {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();

    [Tier::Smoke, Tier::Api, Tier::Integration, Tier::E2e, Tier::Performance]
        .into_iter()
        .find(|tier| segments.iter().any(|segment| *segment == tier.as_str()))
        .unwrap_or(Tier::Other)
}

/// Sort by tier, then lexicographically by path
pub fn sequence<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut keyed: Vec<(Tier, &str)> = paths
        .iter()
        .map(|p| (tier_for_path(p.as_ref()), p.as_ref()))
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, path)| path.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_example() {
        let ordered = sequence(&["e2e/x.test.js", "api/b.test.js", "smoke/a.test.js", "misc/z.test.js"]);
        assert_eq!(
            ordered,
            vec!["smoke/a.test.js", "api/b.test.js", "e2e/x.test.js", "misc/z.test.js"]
        );
    }

    #[test]
    fn test_ties_break_lexicographically() {
        let ordered = sequence(&["api/z.rs", "api/a.rs", "api/m.rs"]);
        assert_eq!(ordered, vec!["api/a.rs", "api/m.rs", "api/z.rs"]);
    }

    #[test]
    fn test_segment_matching() {
        assert_eq!(tier_for_path("foo/smoke/y"), Tier::Smoke);
        assert_eq!(tier_for_path("/abs/e2e/x.test.js"), Tier::E2e);
        assert_eq!(tier_for_path("smoketest/y"), Tier::Other);
        assert_eq!(tier_for_path("e2e"), Tier::Other);
        assert_eq!(tier_for_path("performance/api/load.rs"), Tier::Api);
    }

    #[test]
    fn test_deterministic() {
        let paths = ["performance/p", "integration/i", "x/y", "smoke/s", "api/a"];
        assert_eq!(sequence(&paths), sequence(&paths));
        assert_eq!(sequence(&paths)[0], "smoke/s");
        assert_eq!(sequence(&paths)[4], "x/y");
    }

    #[test]
    fn test_tier_policies() {
        assert!(Tier::Smoke < Tier::Other);
        assert!(Tier::Api.allows_parallel());
        assert!(!Tier::Integration.allows_parallel());
        assert!(Tier::Smoke.fail_fast());
        assert_eq!(Tier::Performance.default_timeout(), Duration::from_secs(120));
        assert_eq!("E2E".parse::<Tier>(), Ok(Tier::E2e));
        assert!("nightly".parse::<Tier>().is_err());
    }
}
