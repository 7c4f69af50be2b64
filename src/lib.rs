pub mod config;
pub mod engine;
pub mod evaluation;
pub mod keywords;
pub mod message;
pub mod reference;
pub mod typosquat;
pub mod url_analyzer;

// Re-export the engine surface for embedding callers
pub use config::{EngineConfig, ReferenceConfig};
pub use engine::{KeywordMode, RiskAssessment, RiskEngine, RuleWeights, ScoringConfig};
pub use evaluation::{EvaluationReport, LabeledMessage};
pub use keywords::{KeywordDetector, KeywordHit};
pub use message::{Message, RiskLabel};
pub use reference::{KeywordEntry, ReferenceSets};
pub use typosquat::{DomainMatchResult, MatchVerdict, TyposquatChecker};
pub use url_analyzer::{UrlAnalyzer, UrlFinding, UrlSignals};
