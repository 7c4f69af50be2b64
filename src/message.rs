use serde::{Deserialize, Serialize};

/// A single email message prepared for scoring.
///
/// Everything arrives pre-extracted: header parsing, MIME decoding, and URL
/// extraction all happen upstream. The engine only reads these fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub subject: String,
    pub body: String,
    /// Domain portion of the envelope sender, e.g. "mail.example.com"
    pub sender_domain: String,
    /// URLs found in the message, in document order
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Message {
    pub fn new(subject: &str, body: &str, sender_domain: &str) -> Self {
        Message {
            subject: subject.to_string(),
            body: body.to_string(),
            sender_domain: sender_domain.to_string(),
            urls: Vec::new(),
        }
    }

    pub fn with_urls(mut self, urls: &[&str]) -> Self {
        self.urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }
}

/// Binary classification emitted by the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Ham,
    Phishing,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Ham => "ham",
            RiskLabel::Phishing => "phishing",
        }
    }
}
