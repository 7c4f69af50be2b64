use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Distance ceiling below which a non-exact match counts as typosquatting.
pub const DEFAULT_MAX_DISTANCE: usize = 2;

/// Outcome of comparing a sender domain against the legitimate-domain set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchVerdict {
    /// Distance 0: the sender is a known legitimate domain
    Exact,
    /// Close but not identical, the typosquatting signal
    NearMiss,
    /// A closest candidate exists but sits beyond the distance ceiling
    TooFarOrNone,
    /// No candidate survived length pruning, or there was nothing to compare
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainMatchResult {
    pub sender_domain_normalized: String,
    pub best_match: Option<String>,
    pub edit_distance: Option<usize>,
    pub verdict: MatchVerdict,
}

impl DomainMatchResult {
    /// Only near misses feed the aggregate score.
    pub fn is_near_miss(&self) -> bool {
        self.verdict == MatchVerdict::NearMiss
    }
}

/// Compares sender domains against known-good domains by edit distance.
#[derive(Debug)]
pub struct TyposquatChecker {
    max_distance: usize,
}

impl Default for TyposquatChecker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE)
    }
}

impl TyposquatChecker {
    pub fn new(max_distance: usize) -> Self {
        TyposquatChecker { max_distance }
    }

    /// Find the closest legitimate domain to the sender.
    ///
    /// Candidates whose normalized length differs from the sender's by more
    /// than the ceiling are skipped without computing a distance, and the
    /// scan stops at the first exact match. On ties the candidate seen first
    /// wins; the sorted candidate set keeps that deterministic.
    pub fn check(
        &self,
        sender_domain: &str,
        legit_domains: &BTreeSet<String>,
    ) -> DomainMatchResult {
        let sender = normalize_domain(sender_domain);
        if sender.is_empty() {
            // an absent sender domain is not a typosquat signal
            return DomainMatchResult {
                sender_domain_normalized: sender,
                best_match: None,
                edit_distance: None,
                verdict: MatchVerdict::NoMatch,
            };
        }
        let sender_len = sender.chars().count();

        let mut best_match: Option<String> = None;
        let mut best_distance: Option<usize> = None;

        for candidate in legit_domains {
            let candidate = normalize_domain(candidate);
            // the length gap is a lower bound on the edit distance
            if sender_len.abs_diff(candidate.chars().count()) > self.max_distance {
                continue;
            }

            let distance = levenshtein(&sender, &candidate);
            if best_distance.map_or(true, |best| distance < best) {
                best_distance = Some(distance);
                best_match = Some(candidate);
                if distance == 0 {
                    break;
                }
            }
        }

        let verdict = match best_distance {
            Some(0) => MatchVerdict::Exact,
            Some(distance) if distance <= self.max_distance => MatchVerdict::NearMiss,
            Some(_) => MatchVerdict::TooFarOrNone,
            None => MatchVerdict::NoMatch,
        };

        log::debug!(
            "Domain match for '{}': {:?} (best: {:?}, distance: {:?})",
            sender,
            verdict,
            best_match,
            best_distance
        );

        DomainMatchResult {
            sender_domain_normalized: sender,
            best_match,
            edit_distance: best_distance,
            verdict,
        }
    }
}

/// Lowercase, trim, strip a leading "www." and a trailing dot.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    let stripped = lowered.strip_prefix("www.").unwrap_or(&lowered);
    stripped.strip_suffix('.').unwrap_or(stripped).to_string()
}

/// Plain Levenshtein distance over characters, two rows of scratch space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceSets;

    fn domains(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("  WWW.PayPal.COM. "), "paypal.com");
        assert_eq!(normalize_domain("example.com"), "example.com");
        assert_eq!(normalize_domain("www."), "");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("paypal.com", "paypal.com"), 0);
        assert_eq!(levenshtein("paypa1.com", "paypal.com"), 1);
    }

    #[test]
    fn test_every_builtin_domain_matches_itself_exactly() {
        let sets = ReferenceSets::default();
        let checker = TyposquatChecker::default();
        for domain in sets.legit_domains() {
            let result = checker.check(domain, sets.legit_domains());
            assert_eq!(result.verdict, MatchVerdict::Exact, "domain {}", domain);
            assert_eq!(result.edit_distance, Some(0));
            assert_eq!(result.best_match.as_deref(), Some(domain.as_str()));
        }
    }

    #[test]
    fn test_near_miss_within_ceiling() {
        let checker = TyposquatChecker::default();
        let legit = domains(&["paypal.com", "google.com"]);

        let one_off = checker.check("paypa1.com", &legit);
        assert_eq!(one_off.verdict, MatchVerdict::NearMiss);
        assert_eq!(one_off.edit_distance, Some(1));
        assert_eq!(one_off.best_match.as_deref(), Some("paypal.com"));
        assert!(one_off.is_near_miss());

        let two_off = checker.check("paypa11.com", &legit);
        assert_eq!(two_off.verdict, MatchVerdict::NearMiss);
        assert_eq!(two_off.edit_distance, Some(2));
    }

    #[test]
    fn test_distant_domain_is_too_far() {
        let checker = TyposquatChecker::default();
        let result = checker.check("example.org", &domains(&["paypal.com", "google.com"]));
        assert_eq!(result.verdict, MatchVerdict::TooFarOrNone);
        assert!(result.edit_distance.unwrap() > DEFAULT_MAX_DISTANCE);
        assert!(result.best_match.is_some());
        assert!(!result.is_near_miss());
    }

    #[test]
    fn test_all_candidates_pruned_is_no_match() {
        let checker = TyposquatChecker::default();
        let result = checker.check("hi.co", &domains(&["bankofamerica.com"]));
        assert_eq!(result.verdict, MatchVerdict::NoMatch);
        assert_eq!(result.best_match, None);
        assert_eq!(result.edit_distance, None);
    }

    #[test]
    fn test_empty_sender_is_no_match() {
        let checker = TyposquatChecker::default();
        let result = checker.check("   ", &domains(&["aa", "bb"]));
        assert_eq!(result.verdict, MatchVerdict::NoMatch);
        assert_eq!(result.best_match, None);
    }

    #[test]
    fn test_tie_keeps_first_candidate_in_sorted_order() {
        let checker = TyposquatChecker::default();
        let result = checker.check("ca.com", &domains(&["ba.com", "aa.com"]));
        assert_eq!(result.edit_distance, Some(1));
        assert_eq!(result.best_match.as_deref(), Some("aa.com"));
    }

    #[test]
    fn test_pruning_matches_exhaustive_search() {
        let legit = domains(&[
            "chase.com",
            "google.com",
            "paypal.com",
            "t.co",
            "wellsfargo.com",
        ]);
        let checker = TyposquatChecker::default();

        for sender in ["paypai.com", "gooogle.com", "chasse.com", "paypal.com", "x.co"] {
            let pruned = checker.check(sender, &legit);

            let sender_norm = normalize_domain(sender);
            let mut exhaustive: Option<(usize, String)> = None;
            for candidate in &legit {
                let candidate = normalize_domain(candidate);
                let distance = levenshtein(&sender_norm, &candidate);
                if exhaustive.as_ref().map_or(true, |(best, _)| distance < *best) {
                    exhaustive = Some((distance, candidate));
                }
            }
            let (distance, best) = exhaustive.unwrap();

            assert!(distance <= DEFAULT_MAX_DISTANCE, "sender {}", sender);
            assert_eq!(pruned.edit_distance, Some(distance), "sender {}", sender);
            assert_eq!(pruned.best_match, Some(best), "sender {}", sender);
        }
    }
}
