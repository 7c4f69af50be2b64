use crate::reference::KeywordTable;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of the synthetic summary entry placed first in every hit list.
pub const TOTAL_TERM: &str = "TOTAL";

/// One keyword match inside a message.
///
/// `position` is the character offset of the match in the lowercased body;
/// `None` marks the synthetic total entry, where position does not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub term: String,
    pub position: Option<usize>,
    pub contribution: f64,
}

/// Multiplier bands by relative position in the text: first fifth 1.5,
/// first half 1.2, rest 1.0. Zero-length text maps to 1.0.
pub fn position_multiplier(position: usize, text_length: usize) -> f64 {
    if text_length == 0 {
        return 1.0;
    }
    let ratio = position as f64 / text_length as f64;
    if ratio < 0.2 {
        1.5
    } else if ratio < 0.5 {
        1.2
    } else {
        1.0
    }
}

/// Step score from the distinct-keyword count: 0, 5, 10, capped at 15.
pub fn step_score(hit_count: usize) -> u32 {
    match hit_count {
        0 => 0,
        1 => 5,
        2..=3 => 10,
        _ => 15,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scans message text for weighted phishing vocabulary.
#[derive(Debug)]
pub struct KeywordDetector {
    token_regex: Regex,
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordDetector {
    pub fn new() -> Self {
        KeywordDetector {
            token_regex: Regex::new(r"\b\w+\b").unwrap(),
        }
    }

    /// Position-weighted scan of the body.
    ///
    /// Tokenizes the lowercased body on word boundaries, looks each token up
    /// in the table, and weights every hit by where it sits in the text. The
    /// same term occurring twice contributes twice. The returned list always
    /// starts with a synthetic `TOTAL` hit carrying the sum of the real
    /// contributions; an empty body yields only that entry at 0.
    pub fn detect(&self, body: &str, table: &KeywordTable) -> Vec<KeywordHit> {
        let normalized = body.to_lowercase();
        let length = normalized.chars().count();

        let mut hits = Vec::new();
        let mut total = 0.0;

        for token in self.token_regex.find_iter(&normalized) {
            if let Some(entry) = table.get(token.as_str()) {
                // Offsets are in characters; token.start() is a byte index.
                let position = normalized[..token.start()].chars().count();
                let multiplier = position_multiplier(position, length);
                let contribution = round2(entry.base_weight as f64 * multiplier);
                log::debug!(
                    "Keyword '{}' at offset {} (x{}): {}",
                    entry.term,
                    position,
                    multiplier,
                    contribution
                );
                total += contribution;
                hits.push(KeywordHit {
                    term: entry.term.clone(),
                    position: Some(position),
                    contribution,
                });
            }
        }

        hits.insert(
            0,
            KeywordHit {
                term: TOTAL_TERM.to_string(),
                position: None,
                contribution: round2(total),
            },
        );
        hits
    }

    /// Distinct keyword containment over subject and body together.
    ///
    /// Substring matching, so multi-word terms like "click here" land too.
    /// Returns the matched terms sorted; feed the count to `step_score`.
    pub fn find_keywords(&self, subject: &str, body: &str, table: &KeywordTable) -> Vec<String> {
        let text = format!("{} {}", subject, body).to_lowercase();
        let mut found: Vec<String> = table
            .values()
            .filter(|entry| text.contains(&entry.term))
            .map(|entry| entry.term.clone())
            .collect();
        found.sort();
        found
    }
}
