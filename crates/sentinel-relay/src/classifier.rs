//! # Report Classification
//!
//! Turns a free-text field report into a [`ThreatLevel`] verdict.

use async_trait::async_trait;
use sentinel_domain::ThreatLevel;

/// Verdict source for field reports.
///
/// Implementations never fail: anything they cannot judge is
/// [`ThreatLevel::Unknown`].
#[async_trait]
pub trait ReportClassifier: Send + Sync {
    async fn classify(&self, report: &str) -> ThreatLevel;
}

const THREAT_KEYWORDS: &[&str] = &[
    "armed", "hostile", "weapon", "launch", "explosive", "attack", "gunfire",
];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "unidentified", "suspicious", "unknown", "loitering", "movement",
];

/// Keyword matcher over report tokens.
///
/// A token matches when it starts with a keyword, so "weapons" matches
/// "weapon" while "unarmed" does not match "armed".
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    threat: Vec<String>,
    suspicious: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, J, S>(threat: I, suspicious: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let normalize = |s: S| s.into().to_lowercase();
        Self {
            threat: threat.into_iter().map(normalize).collect(),
            suspicious: suspicious.into_iter().map(normalize).collect(),
        }
    }

    /// Synchronous verdict, shared by the async seam.
    pub fn verdict(&self, report: &str) -> ThreatLevel {
        let lowered = report.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return ThreatLevel::Unknown;
        }

        let hits = |keywords: &[String]| {
            tokens
                .iter()
                .any(|token| keywords.iter().any(|k| token.starts_with(k.as_str())))
        };

        if hits(&self.threat) {
            ThreatLevel::Threat
        } else if hits(&self.suspicious) {
            ThreatLevel::Suspicious
        } else {
            ThreatLevel::Safe
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            THREAT_KEYWORDS.iter().copied(),
            SUSPICIOUS_KEYWORDS.iter().copied(),
        )
    }
}

#[async_trait]
impl ReportClassifier for KeywordClassifier {
    async fn classify(&self, report: &str) -> ThreatLevel {
        self.verdict(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_keywords() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.verdict("Hostile personnel with weapons sighted."),
            ThreatLevel::Threat
        );
        assert_eq!(classifier.verdict("ARMED convoy"), ThreatLevel::Threat);
    }

    #[test]
    fn test_suspicious_and_safe() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.verdict("Unidentified vehicle parked by the road"),
            ThreatLevel::Suspicious
        );
        assert_eq!(
            classifier.verdict("Sector clear. Patrolling assigned perimeter."),
            ThreatLevel::Safe
        );
    }

    #[test]
    fn test_prefix_matching_does_not_flag_unarmed() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.verdict("Unarmed civilians crossing"), ThreatLevel::Safe);
    }

    #[test]
    fn test_blank_report_is_unknown() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.verdict("  ... "), ThreatLevel::Unknown);
    }

    #[tokio::test]
    async fn test_custom_keywords_through_trait() {
        let classifier: Box<dyn ReportClassifier> =
            Box::new(KeywordClassifier::new(["drone"], ["bird"]));
        assert_eq!(classifier.classify("enemy DRONE inbound").await, ThreatLevel::Threat);
        assert_eq!(classifier.classify("a bird").await, ThreatLevel::Suspicious);
    }
}
