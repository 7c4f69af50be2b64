use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// One scored term in the keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub term: String,
    pub base_weight: u32,
}

/// Keyword table keyed by the normalized (lowercase, trimmed) term.
pub type KeywordTable = HashMap<String, KeywordEntry>;

/// Immutable reference data shared by every detector.
///
/// Built once at engine construction and read-only afterwards, so the engine
/// can be shared across worker threads without locks.
#[derive(Debug, Clone)]
pub struct ReferenceSets {
    keywords: KeywordTable,
    suspicious_tlds: HashSet<String>,
    shorteners: HashSet<String>,
    // Sorted so the typosquat scan iterates candidates deterministically
    legit_domains: BTreeSet<String>,
}

impl ReferenceSets {
    /// Normalize the source lists and reject any that come out empty.
    pub fn new(
        keywords: Vec<KeywordEntry>,
        suspicious_tlds: Vec<String>,
        shorteners: Vec<String>,
        legit_domains: Vec<String>,
    ) -> anyhow::Result<Self> {
        let mut table = KeywordTable::new();
        for entry in keywords {
            let term = entry.term.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            let replaced = table.insert(
                term.clone(),
                KeywordEntry {
                    term: term.clone(),
                    base_weight: entry.base_weight,
                },
            );
            if let Some(previous) = replaced {
                log::warn!(
                    "Duplicate keyword '{}': weight {} replaces {}",
                    term,
                    entry.base_weight,
                    previous.base_weight
                );
            }
        }

        let suspicious_tlds: HashSet<String> = suspicious_tlds
            .iter()
            .map(|tld| normalize_tld_entry(tld))
            .filter(|tld| !tld.is_empty())
            .collect();

        let shorteners: HashSet<String> = shorteners
            .iter()
            .map(|host| host.trim().to_lowercase())
            .filter(|host| !host.is_empty())
            .collect();

        let legit_domains: BTreeSet<String> = legit_domains
            .iter()
            .map(|domain| domain.trim().to_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        if table.is_empty() {
            bail!("Reference data invalid: keyword table is empty");
        }
        if suspicious_tlds.is_empty() {
            bail!("Reference data invalid: suspicious TLD set is empty");
        }
        if shorteners.is_empty() {
            bail!("Reference data invalid: URL shortener set is empty");
        }
        if legit_domains.is_empty() {
            bail!("Reference data invalid: legitimate domain set is empty");
        }

        Ok(ReferenceSets {
            keywords: table,
            suspicious_tlds,
            shorteners,
            legit_domains,
        })
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn suspicious_tlds(&self) -> &HashSet<String> {
        &self.suspicious_tlds
    }

    pub fn shorteners(&self) -> &HashSet<String> {
        &self.shorteners
    }

    pub fn legit_domains(&self) -> &BTreeSet<String> {
        &self.legit_domains
    }
}

impl Default for ReferenceSets {
    fn default() -> Self {
        // Builtin lists are pre-normalized and non-empty
        let keywords = builtin_keywords()
            .into_iter()
            .map(|entry| (entry.term.clone(), entry))
            .collect();
        ReferenceSets {
            keywords,
            suspicious_tlds: BUILTIN_SUSPICIOUS_TLDS
                .iter()
                .map(|tld| tld.to_string())
                .collect(),
            shorteners: BUILTIN_SHORTENERS
                .iter()
                .map(|host| host.to_string())
                .collect(),
            legit_domains: BUILTIN_LEGIT_DOMAINS
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
        }
    }
}

/// TLD entries may arrive as "zip", ".zip", or "*.zip"; store the bare label.
fn normalize_tld_entry(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered.strip_prefix("*.").unwrap_or(&lowered);
    stripped.trim_start_matches('.').to_string()
}

/// Read a one-entry-per-line list file. Blank lines and `#` comments are
/// skipped, surrounding whitespace is trimmed.
pub fn read_domain_list<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect())
}

pub(crate) const BUILTIN_SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "short.link",
    "is.gd",
    "v.gd",
    "tiny.cc",
    "rb.gy",
    "cutt.ly",
    "shorturl.at",
    "u.to",
    "buff.ly",
    "soo.gd",
];

pub(crate) const BUILTIN_SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "click", "download", "zip", "review", "country",
    "kim", "work", "icu",
];

pub(crate) const BUILTIN_LEGIT_DOMAINS: &[&str] = &[
    "amazon.com",
    "apple.com",
    "bankofamerica.com",
    "chase.com",
    "ebay.com",
    "facebook.com",
    "gmail.com",
    "google.com",
    "instagram.com",
    "linkedin.com",
    "microsoft.com",
    "netflix.com",
    "outlook.com",
    "paypal.com",
    "wellsfargo.com",
    "yahoo.com",
];

pub(crate) fn builtin_keywords() -> Vec<KeywordEntry> {
    const WEIGHTED_TERMS: &[(&str, u32)] = &[
        ("urgent", 3),
        ("unusual activity", 3),
        ("verify", 2),
        ("password", 2),
        ("login", 2),
        ("reset password", 2),
        ("suspended", 2),
        ("locked", 2),
        ("click here", 2),
        ("invoice", 2),
        ("payment", 2),
        ("refund", 2),
        ("account", 1),
        ("security", 1),
        ("attachment", 1),
    ];
    WEIGHTED_TERMS
        .iter()
        .map(|(term, weight)| KeywordEntry {
            term: term.to_string(),
            base_weight: *weight,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(terms: &[(&str, u32)]) -> Vec<KeywordEntry> {
        terms
            .iter()
            .map(|(term, weight)| KeywordEntry {
                term: term.to_string(),
                base_weight: *weight,
            })
            .collect()
    }

    #[test]
    fn test_builds_normalized_sets() {
        let sets = ReferenceSets::new(
            entries(&[(" Urgent ", 3)]),
            vec!["*.ZIP".to_string(), ".top".to_string(), "tk".to_string()],
            vec!["Bit.ly".to_string()],
            vec!["WWW-less.example".to_string(), "PayPal.com".to_string()],
        )
        .unwrap();

        assert!(sets.keywords().contains_key("urgent"));
        assert!(sets.suspicious_tlds().contains("zip"));
        assert!(sets.suspicious_tlds().contains("top"));
        assert!(sets.suspicious_tlds().contains("tk"));
        assert!(sets.shorteners().contains("bit.ly"));
        assert!(sets.legit_domains().contains("paypal.com"));
    }

    #[test]
    fn test_rejects_empty_lists() {
        let err = ReferenceSets::new(
            Vec::new(),
            vec!["tk".to_string()],
            vec!["bit.ly".to_string()],
            vec!["paypal.com".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("keyword table"));

        let err = ReferenceSets::new(
            entries(&[("urgent", 3)]),
            vec!["tk".to_string()],
            vec!["bit.ly".to_string()],
            vec!["   ".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("legitimate domain"));
    }

    #[test]
    fn test_duplicate_keyword_last_wins() {
        let sets = ReferenceSets::new(
            entries(&[("verify", 2), ("VERIFY", 5)]),
            vec!["tk".to_string()],
            vec!["bit.ly".to_string()],
            vec!["paypal.com".to_string()],
        )
        .unwrap();
        assert_eq!(sets.keywords()["verify"].base_weight, 5);
    }

    #[test]
    fn test_builtin_sets_are_complete() {
        let sets = ReferenceSets::default();
        assert!(!sets.keywords().is_empty());
        assert!(sets.shorteners().contains("bit.ly"));
        assert!(sets.suspicious_tlds().contains("xyz"));
        assert!(sets.legit_domains().contains("paypal.com"));
    }

    #[test]
    fn test_read_domain_list_skips_comments() {
        let path = std::env::temp_dir().join("phishscore_domain_list_test.txt");
        std::fs::write(&path, "# shorteners\nbit.ly\n\n  tinyurl.com  \n").unwrap();
        let list = read_domain_list(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(list, vec!["bit.ly".to_string(), "tinyurl.com".to_string()]);
    }
}
