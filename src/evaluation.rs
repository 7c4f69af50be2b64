use crate::engine::{rules, RiskAssessment, RiskEngine};
use crate::message::{Message, RiskLabel};
use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A message paired with the ground-truth label carried by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledMessage {
    #[serde(flatten)]
    pub message: Message,
    pub label: RiskLabel,
}

/// Confusion counts with phishing as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    pub fn record(&mut self, actual: RiskLabel, predicted: RiskLabel) {
        match (actual, predicted) {
            (RiskLabel::Phishing, RiskLabel::Phishing) => self.true_positive += 1,
            (RiskLabel::Ham, RiskLabel::Phishing) => self.false_positive += 1,
            (RiskLabel::Ham, RiskLabel::Ham) => self.true_negative += 1,
            (RiskLabel::Phishing, RiskLabel::Ham) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.true_positive + self.true_negative) as f64 / self.total() as f64
    }

    pub fn precision(&self) -> f64 {
        let flagged = self.true_positive + self.false_positive;
        if flagged == 0 {
            return 0.0;
        }
        self.true_positive as f64 / flagged as f64
    }

    pub fn recall(&self) -> f64 {
        let actual_phishing = self.true_positive + self.false_negative;
        if actual_phishing == 0 {
            return 0.0;
        }
        self.true_positive as f64 / actual_phishing as f64
    }
}

/// Histogram of total scores in the bands the reports use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub scores_0_to_2: u64,
    pub scores_3_to_4: u64,
    pub scores_5_to_6: u64,
    pub scores_7_plus: u64,
}

impl ScoreDistribution {
    /// Scores land in the band of their nearest integer, so a total of 2.5
    /// counts as a 3 and the field names describe the bands exactly.
    pub fn record(&mut self, score: f64) {
        match score.round() as u64 {
            0..=2 => self.scores_0_to_2 += 1,
            3..=4 => self.scores_3_to_4 += 1,
            5..=6 => self.scores_5_to_6 += 1,
            _ => self.scores_7_plus += 1,
        }
    }
}

/// Aggregate metrics over a labeled dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total: u64,
    pub ham: u64,
    pub phishing: u64,
    pub confusion: ConfusionCounts,
    /// Per rule, how many messages it scored above zero on
    pub rule_trigger_counts: BTreeMap<String, u64>,
    pub score_distribution: ScoreDistribution,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }
}

/// Assess every labeled message and fold the outcomes into a report.
///
/// Assessments fan out over the rayon pool; the engine is shared read-only
/// so no synchronization is involved. The fold itself runs sequentially in
/// dataset order.
pub fn evaluate_batch(engine: &RiskEngine, dataset: &[LabeledMessage]) -> EvaluationReport {
    let assessments: Vec<RiskAssessment> = dataset
        .par_iter()
        .map(|labeled| engine.assess(&labeled.message))
        .collect();

    let mut report = EvaluationReport {
        total: 0,
        ham: 0,
        phishing: 0,
        confusion: ConfusionCounts::default(),
        rule_trigger_counts: rules::ALL
            .iter()
            .map(|rule| (rule.to_string(), 0))
            .collect(),
        score_distribution: ScoreDistribution::default(),
    };

    for (labeled, assessment) in dataset.iter().zip(&assessments) {
        report.total += 1;
        match labeled.label {
            RiskLabel::Ham => report.ham += 1,
            RiskLabel::Phishing => report.phishing += 1,
        }
        report.confusion.record(labeled.label, assessment.label);
        report.score_distribution.record(assessment.total_score);
        for (rule, points) in &assessment.per_rule_points {
            if *points > 0 {
                if let Some(count) = report.rule_trigger_counts.get_mut(rule) {
                    *count += 1;
                }
            }
        }
    }

    log::info!(
        "Evaluated {} messages: accuracy {:.1}%",
        report.total,
        report.accuracy() * 100.0
    );
    report
}

/// Load a JSONL dataset: one labeled message per line, blank lines skipped.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<LabeledMessage>> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read dataset {:?}", path.as_ref()))?;
    let mut dataset = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let labeled: LabeledMessage = serde_json::from_str(line)
            .with_context(|| format!("Bad dataset record on line {}", index + 1))?;
        dataset.push(labeled);
    }
    Ok(dataset)
}
