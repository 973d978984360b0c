//! The acceptance filter gating Algorithm 1's feature accumulation (§4.5).

use std::collections::HashSet;

const GENERIC_INFRASTRUCTURE: &[&str] = &[
    "logging", "config", "utils", "helpers", "common", "base", "abstract", "interface", "setup",
    "init",
];

const MIN_SCORE: f64 = 0.2;
const JACCARD_CEILING: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadySeen,
    LowScore,
    GenericInfrastructure,
    TooSimilar,
}

/// Apply the full gate in order. `selected` holds feature paths already accepted this run;
/// `rejected` holds paths this run has already turned down (kept out of re-evaluation).
#[must_use]
pub fn accept(
    path: &str,
    score: f64,
    selected: &HashSet<String>,
    rejected: &HashSet<String>,
) -> Result<(), Rejection> {
    if selected.contains(path) || rejected.contains(path) {
        return Err(Rejection::AlreadySeen);
    }
    if score < MIN_SCORE {
        return Err(Rejection::LowScore);
    }
    if is_generic_infrastructure(path) {
        return Err(Rejection::GenericInfrastructure);
    }
    if is_too_similar(path, selected) {
        return Err(Rejection::TooSimilar);
    }
    Ok(())
}

fn is_generic_infrastructure(path: &str) -> bool {
    let lower = path.to_lowercase();
    GENERIC_INFRASTRUCTURE.iter().any(|pattern| lower.contains(pattern))
}

fn is_too_similar(new_path: &str, selected: &HashSet<String>) -> bool {
    let new_parts: HashSet<&str> = new_path.split('/').collect();
    selected.iter().any(|existing| {
        let existing_parts: HashSet<&str> = existing.split('/').collect();
        jaccard(&new_parts, &existing_parts) > JACCARD_CEILING
    })
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn rejects_already_selected() {
        let selected = set(&["math/basic/add"]);
        let rejected = HashSet::new();
        assert_eq!(
            accept("math/basic/add", 0.9, &selected, &rejected),
            Err(Rejection::AlreadySeen)
        );
    }

    #[test]
    fn rejects_low_score() {
        let selected = HashSet::new();
        let rejected = HashSet::new();
        assert_eq!(
            accept("math/basic/add", 0.1, &selected, &rejected),
            Err(Rejection::LowScore)
        );
    }

    #[test]
    fn rejects_generic_infrastructure_case_insensitively() {
        let selected = HashSet::new();
        let rejected = HashSet::new();
        assert_eq!(
            accept("app/Config/loader", 0.9, &selected, &rejected),
            Err(Rejection::GenericInfrastructure)
        );
    }

    #[test]
    fn rejects_high_jaccard_overlap() {
        let selected = set(&["math/basic/add"]);
        let rejected = HashSet::new();
        // Same three segments, reordered: segment sets are identical (Jaccard = 1.0) while the
        // full path string still differs, so this exercises TooSimilar rather than AlreadySeen.
        assert_eq!(
            accept("add/basic/math", 0.9, &selected, &rejected),
            Err(Rejection::TooSimilar)
        );
    }

    #[test]
    fn accepts_novel_path() {
        let selected = set(&["math/basic/add"]);
        let rejected = HashSet::new();
        assert_eq!(accept("graphics/render/shader", 0.9, &selected, &rejected), Ok(()));
    }
}
