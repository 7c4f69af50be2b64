use crate::engine::{RiskEngine, ScoringConfig};
use crate::reference::{builtin_keywords, KeywordEntry, ReferenceSets};
use crate::reference::{BUILTIN_LEGIT_DOMAINS, BUILTIN_SHORTENERS, BUILTIN_SUSPICIOUS_TLDS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference lists as they appear in the configuration file. Every field
/// falls back to the built-in lists when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Keyword term to base weight
    #[serde(default = "default_keywords")]
    pub keywords: BTreeMap<String, u32>,
    #[serde(default = "default_suspicious_tlds")]
    pub suspicious_tlds: Vec<String>,
    #[serde(default = "default_shorteners")]
    pub shorteners: Vec<String>,
    #[serde(default = "default_legit_domains")]
    pub legit_domains: Vec<String>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        ReferenceConfig {
            keywords: default_keywords(),
            suspicious_tlds: default_suspicious_tlds(),
            shorteners: default_shorteners(),
            legit_domains: default_legit_domains(),
        }
    }
}

impl ReferenceConfig {
    /// Turn the file-level lists into validated reference sets.
    pub fn build(&self) -> anyhow::Result<ReferenceSets> {
        let keywords = self
            .keywords
            .iter()
            .map(|(term, weight)| KeywordEntry {
                term: term.clone(),
                base_weight: *weight,
            })
            .collect();
        ReferenceSets::new(
            keywords,
            self.suspicious_tlds.clone(),
            self.shorteners.clone(),
            self.legit_domains.clone(),
        )
    }
}

fn default_keywords() -> BTreeMap<String, u32> {
    builtin_keywords()
        .into_iter()
        .map(|entry| (entry.term, entry.base_weight))
        .collect()
}

fn default_suspicious_tlds() -> Vec<String> {
    BUILTIN_SUSPICIOUS_TLDS
        .iter()
        .map(|tld| tld.to_string())
        .collect()
}

fn default_shorteners() -> Vec<String> {
    BUILTIN_SHORTENERS
        .iter()
        .map(|host| host.to_string())
        .collect()
}

fn default_legit_domains() -> Vec<String> {
    BUILTIN_LEGIT_DOMAINS
        .iter()
        .map(|domain| domain.to_string())
        .collect()
}

/// Top-level YAML configuration: scoring knobs plus reference lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
}

impl EngineConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate everything and build a ready-to-use engine.
    pub fn build_engine(&self) -> anyhow::Result<RiskEngine> {
        RiskEngine::new(self.reference.build()?, self.scoring.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KeywordMode;

    #[test]
    fn test_default_config_builds_engine() {
        let config = EngineConfig::default();
        assert!(config.build_engine().is_ok());
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
scoring:
  classification_threshold: 7.5
reference:
  legit_domains:
    - paypal.com
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scoring.classification_threshold, 7.5);
        assert_eq!(config.scoring.keyword_mode, KeywordMode::Positional);
        assert_eq!(config.reference.legit_domains, vec!["paypal.com".to_string()]);
        // unspecified lists stay on the built-ins
        assert!(!config.reference.keywords.is_empty());
        assert!(config
            .reference
            .shorteners
            .contains(&"bit.ly".to_string()));
        assert!(config.build_engine().is_ok());
    }

    #[test]
    fn test_explicitly_empty_list_is_rejected() {
        let yaml = r#"
reference:
  keywords: {}
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.build_engine().unwrap_err();
        assert!(err.to_string().contains("keyword table"));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join("phishscore_config_test.yaml");
        let path_str = path.to_str().unwrap();

        let mut config = EngineConfig::default();
        config.scoring.classification_threshold = 6.0;
        config.to_file(path_str).unwrap();

        let loaded = EngineConfig::from_file(path_str).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.scoring.classification_threshold, 6.0);
        assert_eq!(loaded.reference.keywords, config.reference.keywords);
    }
}
