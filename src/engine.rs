use crate::keywords::{step_score, KeywordDetector, KeywordHit, TOTAL_TERM};
use crate::message::{Message, RiskLabel};
use crate::reference::ReferenceSets;
use crate::typosquat::{DomainMatchResult, TyposquatChecker, DEFAULT_MAX_DISTANCE};
use crate::url_analyzer::{UrlAnalyzer, UrlFinding, UrlSignals};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rule names used in the per-rule score breakdown.
pub mod rules {
    pub const KEYWORD: &str = "keyword";
    pub const INSECURE_SCHEME: &str = "insecure_scheme";
    pub const SENDER_MISMATCH: &str = "sender_mismatch";
    pub const SHORTENER: &str = "shortener";
    pub const IP_LITERAL: &str = "ip_literal";
    pub const SUSPICIOUS_TLD: &str = "suspicious_tld";
    pub const TYPOSQUAT: &str = "typosquat";

    pub const ALL: &[&str] = &[
        KEYWORD,
        INSECURE_SCHEME,
        SENDER_MISMATCH,
        SHORTENER,
        IP_LITERAL,
        SUSPICIOUS_TLD,
        TYPOSQUAT,
    ];
}

/// Which keyword strategy the engine runs.
///
/// The two modes are not equivalent: positional weighting scores every
/// occurrence by where it sits in the body, while the step function counts
/// distinct terms across subject and body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    #[default]
    Positional,
    SubstringStepFunction,
}

/// Points awarded per triggered rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleWeights {
    #[serde(default = "default_insecure_scheme_weight")]
    pub insecure_scheme: u32,
    #[serde(default = "default_sender_mismatch_weight")]
    pub sender_mismatch: u32,
    #[serde(default = "default_shortener_weight")]
    pub shortener: u32,
    #[serde(default = "default_ip_literal_weight")]
    pub ip_literal: u32,
    #[serde(default = "default_suspicious_tld_weight")]
    pub suspicious_tld: u32,
    #[serde(default = "default_typosquat_weight")]
    pub typosquat_near_miss: u32,
}

impl Default for RuleWeights {
    fn default() -> Self {
        RuleWeights {
            insecure_scheme: default_insecure_scheme_weight(),
            sender_mismatch: default_sender_mismatch_weight(),
            shortener: default_shortener_weight(),
            ip_literal: default_ip_literal_weight(),
            suspicious_tld: default_suspicious_tld_weight(),
            typosquat_near_miss: default_typosquat_weight(),
        }
    }
}

fn default_insecure_scheme_weight() -> u32 {
    1
}

fn default_sender_mismatch_weight() -> u32 {
    2
}

fn default_shortener_weight() -> u32 {
    2
}

fn default_ip_literal_weight() -> u32 {
    3
}

fn default_suspicious_tld_weight() -> u32 {
    2
}

fn default_typosquat_weight() -> u32 {
    2
}

fn default_threshold() -> f64 {
    5.0
}

fn default_max_urls() -> usize {
    64
}

fn default_typosquat_max_distance() -> usize {
    DEFAULT_MAX_DISTANCE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub keyword_mode: KeywordMode,
    /// Total score at or above which a message is labeled phishing
    #[serde(default = "default_threshold")]
    pub classification_threshold: f64,
    #[serde(default)]
    pub weights: RuleWeights,
    /// URLs past this count are dropped from scoring, with a truncation flag
    #[serde(default = "default_max_urls")]
    pub max_urls_per_message: usize,
    #[serde(default = "default_typosquat_max_distance")]
    pub typosquat_max_distance: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            keyword_mode: KeywordMode::default(),
            classification_threshold: default_threshold(),
            weights: RuleWeights::default(),
            max_urls_per_message: default_max_urls(),
            typosquat_max_distance: default_typosquat_max_distance(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.classification_threshold.is_finite() {
            bail!("Invalid scoring config: classification_threshold must be a finite number");
        }
        if self.classification_threshold < 0.0 {
            bail!("Invalid scoring config: classification_threshold must not be negative");
        }
        if self.max_urls_per_message == 0 {
            bail!("Invalid scoring config: max_urls_per_message must be at least 1");
        }
        if self.typosquat_max_distance == 0 {
            bail!("Invalid scoring config: typosquat_max_distance must be at least 1");
        }
        Ok(())
    }
}

/// Full scoring output for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub total_score: f64,
    /// First entry is always the synthetic TOTAL hit
    pub keyword_hits: Vec<KeywordHit>,
    pub url_findings: BTreeMap<String, UrlFinding>,
    pub domain_match: DomainMatchResult,
    /// Every rule name appears, zero or not
    pub per_rule_points: BTreeMap<String, u32>,
    pub urls_truncated: bool,
    pub label: RiskLabel,
}

/// Combines the three detectors into one weighted score and a label.
///
/// Construction validates the configuration; scoring itself never fails.
/// The engine holds only immutable state, so one instance can serve
/// concurrent callers.
#[derive(Debug)]
pub struct RiskEngine {
    reference: ReferenceSets,
    config: ScoringConfig,
    keyword_detector: KeywordDetector,
    url_analyzer: UrlAnalyzer,
    typosquat: TyposquatChecker,
}

impl RiskEngine {
    pub fn new(reference: ReferenceSets, config: ScoringConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let typosquat = TyposquatChecker::new(config.typosquat_max_distance);
        Ok(RiskEngine {
            reference,
            config,
            keyword_detector: KeywordDetector::new(),
            url_analyzer: UrlAnalyzer::new(),
            typosquat,
        })
    }

    pub fn reference(&self) -> &ReferenceSets {
        &self.reference
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn assess(&self, message: &Message) -> RiskAssessment {
        let cap = self.config.max_urls_per_message;
        let (urls, urls_truncated) = if message.urls.len() > cap {
            log::warn!(
                "Message lists {} URLs, scoring only the first {}",
                message.urls.len(),
                cap
            );
            (&message.urls[..cap], true)
        } else {
            (&message.urls[..], false)
        };

        let keyword_hits = self.keyword_hits(message);
        let keyword_total = keyword_hits.first().map_or(0.0, |hit| hit.contribution);

        let url_findings = self
            .url_analyzer
            .evaluate(urls, &message.sender_domain, &self.reference);
        let url_signals = UrlSignals::from_findings(url_findings.values());
        let url_points = url_signals.points(&self.config.weights);

        let domain_match = self
            .typosquat
            .check(&message.sender_domain, self.reference.legit_domains());
        let typosquat_points = if domain_match.is_near_miss() {
            self.config.weights.typosquat_near_miss
        } else {
            0
        };

        let total_score = keyword_total + f64::from(url_points) + f64::from(typosquat_points);
        let label = if total_score >= self.config.classification_threshold {
            RiskLabel::Phishing
        } else {
            RiskLabel::Ham
        };

        let weights = &self.config.weights;
        let mut per_rule_points = BTreeMap::new();
        per_rule_points.insert(rules::KEYWORD.to_string(), keyword_total.round() as u32);
        per_rule_points.insert(
            rules::INSECURE_SCHEME.to_string(),
            if url_signals.insecure_scheme {
                weights.insecure_scheme
            } else {
                0
            },
        );
        per_rule_points.insert(
            rules::SENDER_MISMATCH.to_string(),
            if url_signals.sender_mismatch {
                weights.sender_mismatch
            } else {
                0
            },
        );
        per_rule_points.insert(
            rules::SHORTENER.to_string(),
            if url_signals.is_shortener {
                weights.shortener
            } else {
                0
            },
        );
        per_rule_points.insert(
            rules::IP_LITERAL.to_string(),
            if url_signals.is_ip_literal {
                weights.ip_literal
            } else {
                0
            },
        );
        per_rule_points.insert(
            rules::SUSPICIOUS_TLD.to_string(),
            if url_signals.suspicious_tld {
                weights.suspicious_tld
            } else {
                0
            },
        );
        per_rule_points.insert(rules::TYPOSQUAT.to_string(), typosquat_points);

        log::info!(
            "Scored message from '{}': {:.2} -> {} ({} keyword hits, {} URLs)",
            message.sender_domain,
            total_score,
            label.as_str(),
            keyword_hits.len().saturating_sub(1),
            url_findings.len()
        );

        RiskAssessment {
            total_score,
            keyword_hits,
            url_findings,
            domain_match,
            per_rule_points,
            urls_truncated,
            label,
        }
    }

    fn keyword_hits(&self, message: &Message) -> Vec<KeywordHit> {
        match self.config.keyword_mode {
            KeywordMode::Positional => self
                .keyword_detector
                .detect(&message.body, self.reference.keywords()),
            KeywordMode::SubstringStepFunction => {
                let found = self.keyword_detector.find_keywords(
                    &message.subject,
                    &message.body,
                    self.reference.keywords(),
                );
                let score = step_score(found.len());
                // matched terms ride along as presence markers; the step
                // score is count-based, so only the TOTAL entry carries it
                let mut hits = Vec::with_capacity(found.len() + 1);
                hits.push(KeywordHit {
                    term: TOTAL_TERM.to_string(),
                    position: None,
                    contribution: f64::from(score),
                });
                hits.extend(found.into_iter().map(|term| KeywordHit {
                    term,
                    position: None,
                    contribution: 0.0,
                }));
                hits
            }
        }
    }
}
