use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabi_core::Amount;

/// Raw output of a recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    /// Engine certainty, 0.0–100.0.
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 100.0) } else { 0.0 };
        Self { text: text.into(), confidence }
    }
}

/// A recognition language, rendered as a Tesseract traineddata code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    Japanese,
    English,
    Other(String),
}

impl Language {
    pub fn code(&self) -> &str {
        match self {
            Language::Japanese => "jpn",
            Language::English => "eng",
            Language::Other(code) => code,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "jpn" | "ja" | "japanese" => Language::Japanese,
            "eng" | "en" | "english" => Language::English,
            _ => Language::Other(s),
        }
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

/// The pair of scripts the recognizer should expect on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageHints {
    pub primary: Language,
    pub secondary: Language,
}

impl LanguageHints {
    /// Engine language string, e.g. `jpn+eng`.
    pub fn engine_string(&self) -> String {
        format!("{}+{}", self.primary, self.secondary)
    }
}

impl Default for LanguageHints {
    fn default() -> Self {
        Self { primary: Language::Japanese, secondary: Language::English }
    }
}

/// Which date shape produced a parsed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY年MM月DD日`
    YearFirst,
    /// `DD-MM-YYYY`, `DD/MM/YYYY`
    DayFirst,
    /// `YYYYMMDD`
    Compact,
}

/// How the extracted date was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSource {
    /// Read directly from the text.
    Parsed { pattern: DatePattern },
    /// Read from the text but later than today, so replaced by today.
    Clamped { pattern: DatePattern, parsed: NaiveDate },
    /// Nothing usable in the text; today was substituted.
    Fallback,
}

impl DateSource {
    pub fn is_from_text(&self) -> bool {
        matches!(self, DateSource::Parsed { .. })
    }
}

/// Structured fields pulled from one receipt scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub amount: Option<Amount>,
    pub date: Option<NaiveDate>,
    pub date_source: Option<DateSource>,
    /// Pass-through of the recognizer confidence (0.0–100.0).
    pub confidence: f32,
}

impl ExtractionResult {
    /// Whether a human should confirm the fields before they pre-populate a form.
    pub fn needs_review(&self, threshold: f32) -> bool {
        self.confidence < threshold
            || self.amount.is_none()
            || !self.date_source.is_some_and(|s| s.is_from_text())
    }
}
