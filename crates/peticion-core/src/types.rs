//! Domain types produced by the orchestrator and rendered by the wizard.
//!
//! These are the stable, English-named shapes handed to callers. The model's
//! Spanish-keyed JSON is decoded separately and converted into these after
//! validation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Result of the first wizard stage: what the document is and how sure we are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document_type: String,
    /// Length of the analysed document in characters.
    pub length: usize,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub analysis_date: NaiveDate,
    /// Markdown narrative for display.
    pub narrative: String,
}

/// Three-step rating used for problem severity and recommendation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    /// Parse a rating label by prefix, so "ALTA (justificada por ...)" reads as `High`.
    ///
    /// Accepts Spanish and English labels, case- and accent-insensitive.
    pub fn parse(label: &str) -> Option<Self> {
        let folded = fold_label(label);
        let word = folded.trim_start();
        if ["ALTA", "ALTO", "HIGH", "CRITICA"].iter().any(|p| word.starts_with(p)) {
            Some(Self::High)
        } else if ["MEDIA", "MEDIO", "MEDIUM", "MODERADA"]
            .iter()
            .any(|p| word.starts_with(p))
        {
            Some(Self::Medium)
        } else if ["BAJA", "BAJO", "LOW", "MENOR"].iter().any(|p| word.starts_with(p)) {
            Some(Self::Low)
        } else {
            None
        }
    }

    /// Label used in the model's response schema.
    pub fn spanish_label(&self) -> &'static str {
        match self {
            Self::High => "ALTA",
            Self::Medium => "MEDIA",
            Self::Low => "BAJA",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problem category. Known labels map onto fixed variants; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProblemCategory {
    Formal,
    Substantive,
    Constitutional,
    Administrative,
    Procedural,
    Legal,
    Structural,
    Communication,
    Other(String),
}

impl ProblemCategory {
    /// Parse a category label as emitted by the model or the local analyzer.
    ///
    /// The first word decides, so "FORMAL/PROCEDIMENTAL" reads as `Formal`.
    pub fn parse(label: &str) -> Self {
        let folded = fold_label(label);
        let head = folded
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|w| !w.is_empty())
            .unwrap_or("");
        match head {
            "FORMAL" => Self::Formal,
            "SUSTANCIAL" | "SUBSTANTIVE" | "SUSTANTIVO" => Self::Substantive,
            "CONSTITUCIONAL" | "CONSTITUTIONAL" => Self::Constitutional,
            "ADMINISTRATIVO" | "ADMINISTRATIVE" => Self::Administrative,
            "PROCEDIMENTAL" | "PROCESAL" | "PROCEDURAL" => Self::Procedural,
            "LEGAL" => Self::Legal,
            "ESTRUCTURAL" | "STRUCTURAL" => Self::Structural,
            "COMUNICACION" | "COMMUNICATION" => Self::Communication,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    /// Label used in the model's response schema. Unknown labels pass through.
    pub fn spanish_label(&self) -> &str {
        match self {
            Self::Formal => "FORMAL",
            Self::Substantive => "SUSTANCIAL",
            Self::Constitutional => "CONSTITUCIONAL",
            Self::Administrative => "ADMINISTRATIVO",
            Self::Procedural => "PROCEDIMENTAL",
            Self::Legal => "LEGAL",
            Self::Structural => "ESTRUCTURAL",
            Self::Communication => "COMUNICACIÓN",
            Self::Other(label) => label,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Formal => "FORMAL",
            Self::Substantive => "SUBSTANTIVE",
            Self::Constitutional => "CONSTITUTIONAL",
            Self::Administrative => "ADMINISTRATIVE",
            Self::Procedural => "PROCEDURAL",
            Self::Legal => "LEGAL",
            Self::Structural => "STRUCTURAL",
            Self::Communication => "COMMUNICATION",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ProblemCategory {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<ProblemCategory> for String {
    fn from(category: ProblemCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A defect found in the document. Sequences keep detection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub category: ProblemCategory,
    pub description: String,
    pub severity: Level,
    /// Approximate line reference, "N/A" when unknown.
    pub line: String,
    pub legal_basis: String,
    pub impact: String,
    pub short_recommendation: String,
}

/// An actionable suggestion, usually tracing back to one or more problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Level,
    pub action: String,
    pub legal_basis: String,
    pub estimated_time: String,
    pub resources_needed: String,
    pub expected_impact: String,
    pub risks: String,
}

/// One question/answer exchange in the follow-up chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Uppercase and strip Spanish diacritics so labels compare on plain ASCII.
pub fn fold_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'A',
            'é' | 'É' => 'E',
            'í' | 'Í' => 'I',
            'ó' | 'Ó' => 'O',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'U',
            'ñ' | 'Ñ' => 'N',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_spanish_and_english() {
        assert_eq!(Level::parse("ALTA"), Some(Level::High));
        assert_eq!(Level::parse("media"), Some(Level::Medium));
        assert_eq!(Level::parse("Low"), Some(Level::Low));
        assert_eq!(Level::parse("  BAJA "), Some(Level::Low));
    }

    #[test]
    fn level_ignores_trailing_justification() {
        assert_eq!(
            Level::parse("ALTA (afecta la validez del trámite)"),
            Some(Level::High)
        );
    }

    #[test]
    fn level_rejects_unknown_label() {
        assert_eq!(Level::parse("urgente"), None);
        assert_eq!(Level::parse(""), None);
    }

    #[test]
    fn category_maps_spanish_labels() {
        assert_eq!(ProblemCategory::parse("SUSTANCIAL"), ProblemCategory::Substantive);
        assert_eq!(ProblemCategory::parse("procedimental"), ProblemCategory::Procedural);
        assert_eq!(ProblemCategory::parse("COMUNICACIÓN"), ProblemCategory::Communication);
        assert_eq!(ProblemCategory::parse("Administrativo"), ProblemCategory::Administrative);
    }

    #[test]
    fn category_uses_first_word_of_compound_label() {
        assert_eq!(ProblemCategory::parse("FORMAL/PROCEDIMENTAL"), ProblemCategory::Formal);
    }

    #[test]
    fn category_keeps_unknown_label() {
        let cat = ProblemCategory::parse(" Tributario ");
        assert_eq!(cat, ProblemCategory::Other("Tributario".into()));
        assert_eq!(cat.as_str(), "Tributario");
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProblemCategory::Formal).unwrap();
        assert_eq!(json, "\"FORMAL\"");
        let parsed: ProblemCategory = serde_json::from_str("\"CONSTITUCIONAL\"").unwrap();
        assert_eq!(parsed, ProblemCategory::Constitutional);
    }

    #[test]
    fn spanish_labels_parse_back() {
        for level in [Level::High, Level::Medium, Level::Low] {
            assert_eq!(Level::parse(level.spanish_label()), Some(level));
        }
        for category in [
            ProblemCategory::Substantive,
            ProblemCategory::Procedural,
            ProblemCategory::Communication,
            ProblemCategory::Other("Tributario".into()),
        ] {
            assert_eq!(ProblemCategory::parse(category.spanish_label()), category);
        }
        assert_eq!(ProblemCategory::Substantive.spanish_label(), "SUSTANCIAL");
        assert_eq!(Level::Low.spanish_label(), "BAJA");
    }

    #[test]
    fn fold_label_strips_accents() {
        assert_eq!(fold_label("petición"), "PETICION");
        assert_eq!(fold_label("Año"), "ANO");
    }
}
