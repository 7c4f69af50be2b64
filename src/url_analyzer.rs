use crate::engine::RuleWeights;
use crate::reference::ReferenceSets;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Five independent boolean checks for one URL, plus the parsed hostname.
///
/// A URL that fails to parse keeps an empty hostname and all flags false, so
/// bad input stays observable without tripping any rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFinding {
    pub hostname: String,
    pub insecure_scheme: bool,
    pub is_shortener: bool,
    pub is_ip_literal: bool,
    pub suspicious_tld: bool,
    pub sender_mismatch: bool,
}

/// Message-level OR across all per-URL findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSignals {
    pub insecure_scheme: bool,
    pub is_shortener: bool,
    pub is_ip_literal: bool,
    pub suspicious_tld: bool,
    pub sender_mismatch: bool,
}

impl UrlSignals {
    pub fn from_findings<'a, I>(findings: I) -> Self
    where
        I: IntoIterator<Item = &'a UrlFinding>,
    {
        let mut signals = UrlSignals::default();
        for finding in findings {
            signals.insecure_scheme |= finding.insecure_scheme;
            signals.is_shortener |= finding.is_shortener;
            signals.is_ip_literal |= finding.is_ip_literal;
            signals.suspicious_tld |= finding.suspicious_tld;
            signals.sender_mismatch |= finding.sender_mismatch;
        }
        signals
    }

    /// Points per triggered rule. A single triggering URL awards the full
    /// points for its rule; multiple URLs tripping the same rule add nothing.
    /// Saturates instead of overflowing when configured weights are extreme.
    pub fn points(&self, weights: &RuleWeights) -> u32 {
        let mut points: u32 = 0;
        if self.insecure_scheme {
            points = points.saturating_add(weights.insecure_scheme);
        }
        if self.sender_mismatch {
            points = points.saturating_add(weights.sender_mismatch);
        }
        if self.is_shortener {
            points = points.saturating_add(weights.shortener);
        }
        if self.is_ip_literal {
            points = points.saturating_add(weights.ip_literal);
        }
        if self.suspicious_tld {
            points = points.saturating_add(weights.suspicious_tld);
        }
        points
    }
}

/// Runs the per-URL heuristics against the reference lists.
#[derive(Debug)]
pub struct UrlAnalyzer {
    ipv4_regex: Regex,
}

impl Default for UrlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlAnalyzer {
    pub fn new() -> Self {
        UrlAnalyzer {
            // Strict dotted quad only; IPv6 and hex forms are out of scope
            ipv4_regex: Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap(),
        }
    }

    /// Evaluate every URL of a message against the reference lists.
    ///
    /// Every input URL appears in the result, parseable or not.
    pub fn evaluate(
        &self,
        urls: &[String],
        sender_domain: &str,
        reference: &ReferenceSets,
    ) -> BTreeMap<String, UrlFinding> {
        let mut findings = BTreeMap::new();
        for url in urls {
            findings.insert(url.clone(), self.inspect(url, sender_domain, reference));
        }
        findings
    }

    fn inspect(&self, url: &str, sender_domain: &str, reference: &ReferenceSets) -> UrlFinding {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("Unparseable URL '{}': {}", url, e);
                return UrlFinding::default();
            }
        };

        let hostname = parsed
            .host_str()
            .unwrap_or("")
            .to_lowercase()
            .trim_matches('.')
            .to_string();

        let insecure_scheme = parsed.scheme() == "http";
        let is_ip_literal = self.ipv4_regex.is_match(&hostname);

        let bare_host = hostname.strip_prefix("www.").unwrap_or(&hostname);
        let is_shortener = !hostname.is_empty() && reference.shorteners().contains(bare_host);

        // IP hosts have no TLD; single-label hosts are skipped too
        let suspicious_tld = !is_ip_literal
            && last_label(&hostname)
                .map(|tld| reference.suspicious_tlds().contains(tld))
                .unwrap_or(false);

        let sender_mismatch = base_domains_differ(sender_domain, &hostname);

        log::debug!(
            "URL '{}' host '{}': http={} shortener={} ip={} tld={} mismatch={}",
            url,
            hostname,
            insecure_scheme,
            is_shortener,
            is_ip_literal,
            suspicious_tld,
            sender_mismatch
        );

        UrlFinding {
            hostname,
            insecure_scheme,
            is_shortener,
            is_ip_literal,
            suspicious_tld,
            sender_mismatch,
        }
    }
}

/// Last two labels of a hostname: "mail.example.com" -> "example.com".
/// Hostnames with fewer than two labels are used as-is.
pub fn base_domain(domain: &str) -> String {
    let normalized = domain.trim().to_lowercase();
    let parts: Vec<&str> = normalized.split('.').collect();
    if parts.len() < 2 {
        normalized
    } else {
        parts[parts.len() - 2..].join(".")
    }
}

fn last_label(hostname: &str) -> Option<&str> {
    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() < 2 {
        return None;
    }
    parts.last().copied()
}

fn base_domains_differ(sender_domain: &str, url_host: &str) -> bool {
    if url_host.is_empty() {
        return false;
    }
    let sender = sender_domain.trim();
    if sender.is_empty() {
        return false;
    }
    base_domain(sender) != base_domain(url_host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::KeywordEntry;

    fn reference() -> ReferenceSets {
        ReferenceSets::new(
            vec![KeywordEntry {
                term: "urgent".to_string(),
                base_weight: 3,
            }],
            vec!["zip".to_string(), "tk".to_string(), "1".to_string()],
            vec!["bit.ly".to_string(), "tinyurl.com".to_string()],
            vec!["example.com".to_string()],
        )
        .unwrap()
    }

    fn inspect(url: &str, sender: &str) -> UrlFinding {
        let analyzer = UrlAnalyzer::new();
        let findings = analyzer.evaluate(&[url.to_string()], sender, &reference());
        findings[url].clone()
    }

    #[test]
    fn test_insecure_shortener_url() {
        let finding = inspect("http://bit.ly/abc", "");
        assert_eq!(finding.hostname, "bit.ly");
        assert!(finding.insecure_scheme);
        assert!(finding.is_shortener);
        assert!(!finding.is_ip_literal);
        assert!(!finding.sender_mismatch);

        let signals = UrlSignals::from_findings([&finding]);
        // insecure (1) + shortener (2)
        assert_eq!(signals.points(&RuleWeights::default()), 3);
    }

    #[test]
    fn test_ip_literal_url() {
        let finding = inspect("https://192.168.1.1/x", "");
        assert!(finding.is_ip_literal);
        assert!(!finding.insecure_scheme);
        assert!(!finding.is_shortener);
        // the trailing label "1" is in the TLD set, but IP hosts never match
        assert!(!finding.suspicious_tld);
        assert!(!finding.sender_mismatch);

        let signals = UrlSignals::from_findings([&finding]);
        assert_eq!(signals.points(&RuleWeights::default()), 3);
    }

    #[test]
    fn test_suspicious_tld() {
        let finding = inspect("https://login.files.zip/open", "files.zip");
        assert!(finding.suspicious_tld);
        assert!(!finding.sender_mismatch);
    }

    #[test]
    fn test_single_label_host_has_no_tld() {
        let finding = inspect("https://localhost/admin", "example.com");
        assert_eq!(finding.hostname, "localhost");
        assert!(!finding.suspicious_tld);
    }

    #[test]
    fn test_www_prefix_and_trailing_dot_stripped_for_shortener() {
        assert!(inspect("https://www.bit.ly/x", "example.com").is_shortener);
        assert!(inspect("https://bit.ly./x", "example.com").is_shortener);
    }

    #[test]
    fn test_unparseable_url_keeps_all_flags_false() {
        let analyzer = UrlAnalyzer::new();
        let findings = analyzer.evaluate(
            &["not a url at all".to_string()],
            "example.com",
            &reference(),
        );
        let finding = &findings["not a url at all"];
        assert_eq!(finding, &UrlFinding::default());
        assert_eq!(finding.hostname, "");
    }

    #[test]
    fn test_subdomains_do_not_mismatch() {
        let finding = inspect("https://secure.example.com/login", "mail.example.com");
        assert!(!finding.sender_mismatch);
    }

    #[test]
    fn test_differing_base_domains_mismatch() {
        let finding = inspect("https://evil-example.net/login", "example.com");
        assert!(finding.sender_mismatch);
    }

    #[test]
    fn test_empty_sender_never_mismatches() {
        let finding = inspect("https://evil-example.net/login", "   ");
        assert!(!finding.sender_mismatch);
    }

    #[test]
    fn test_signals_aggregate_across_urls() {
        let analyzer = UrlAnalyzer::new();
        let urls = vec![
            "http://example.com/a".to_string(),
            "https://tinyurl.com/b".to_string(),
        ];
        let findings = analyzer.evaluate(&urls, "example.com", &reference());
        let signals = UrlSignals::from_findings(findings.values());
        assert!(signals.insecure_scheme);
        assert!(signals.is_shortener);
        assert!(signals.sender_mismatch);
        // 1 + 2 + 2, each rule counted once across the message
        assert_eq!(signals.points(&RuleWeights::default()), 5);
    }

    #[test]
    fn test_points_saturate_on_extreme_weights() {
        let weights = RuleWeights {
            insecure_scheme: u32::MAX,
            sender_mismatch: u32::MAX,
            shortener: u32::MAX,
            ..RuleWeights::default()
        };
        let signals = UrlSignals {
            insecure_scheme: true,
            sender_mismatch: true,
            is_shortener: true,
            ..UrlSignals::default()
        };
        assert_eq!(signals.points(&weights), u32::MAX);
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(base_domain("mail.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("com"), "com");
        assert_eq!(base_domain(" Mail.Example.COM "), "example.com");
    }
}
