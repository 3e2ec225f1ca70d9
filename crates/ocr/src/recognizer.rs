use thiserror::Error;
use tokio::sync::mpsc;

use crate::preprocess::EncodedImage;
use crate::types::{LanguageHints, RecognitionResult};

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine returned malformed output: {0}")]
    MalformedOutput(String),
    #[error("OCR engine rejected the image: {0}")]
    UnsupportedImage(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Advisory recognition progress, 0–100 %. Has no bearing on the result.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<u8>>,
}

impl ProgressReporter {
    /// Reports are only logged.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A reporter plus the receiving end for a UI progress bar.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// `fraction` is 0.0–1.0; out-of-range values are clamped.
    pub fn report(&self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        tracing::debug!("OCR progress: {percent}%");
        if let Some(tx) = &self.tx {
            // The receiver may already be gone; progress is advisory.
            let _ = tx.send(percent);
        }
    }
}

/// Abstraction over a text-recognition engine.
/// Implementations accept an encoded image and return the recognized text with
/// the engine's own confidence score. Calls may block for several seconds.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        image: &EncodedImage,
        languages: &LanguageHints,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, RecognitionError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set result — useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
    pub confidence: f32,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), confidence: 90.0 }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(
        &self,
        _image: &EncodedImage,
        _languages: &LanguageHints,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, RecognitionError> {
        progress.report(0.0);
        progress.report(1.0);
        Ok(RecognitionResult::new(self.text.clone(), self.confidence))
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{ProgressReporter, RecognitionError, TextRecognizer};
    use crate::config::OcrConfig;
    use crate::preprocess::EncodedImage;
    use crate::types::{LanguageHints, RecognitionResult};
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }

        pub fn from_config(config: &OcrConfig) -> Self {
            Self::new(config.tessdata_path.as_ref().map(|p| p.display().to_string()))
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(
            &self,
            image: &EncodedImage,
            languages: &LanguageHints,
            progress: &ProgressReporter,
        ) -> Result<RecognitionResult, RecognitionError> {
            progress.report(0.0);
            let mut lt = LepTess::new(self.data_path.as_deref(), &languages.engine_string())
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image.bytes())
                .map_err(|e| RecognitionError::UnsupportedImage(e.to_string()))?;
            progress.report(0.1);
            let text = lt
                .get_utf8_text()
                .map_err(|e| RecognitionError::MalformedOutput(e.to_string()))?;
            let confidence = lt.mean_text_conf() as f32;
            progress.report(1.0);
            Ok(RecognitionResult::new(text, confidence))
        }
    }
}
