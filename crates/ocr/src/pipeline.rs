use std::path::Path;
use std::sync::Arc;

use tabi_core::{Clock, SystemClock};
use thiserror::Error;

use crate::config::OcrConfig;
use crate::extract::Extractor;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{ProgressReporter, RecognitionError, TextRecognizer};
use crate::types::ExtractionResult;

/// Any failure that aborts a receipt scan. No partial result is ever returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("receipt reading failed: IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("receipt reading failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("receipt reading failed: {0}")]
    Recognition(#[from] RecognitionError),
    #[error("receipt reading failed: worker task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Io(_) | PipelineError::Preprocess(_) => "could not read image",
            PipelineError::Recognition(_) | PipelineError::Aborted(_) => "failed to read receipt",
        }
    }
}

/// Orchestrates: preprocess → recognize → extract.
///
/// Holds no per-call state, so one pipeline can serve concurrent scans.
pub struct ReceiptPipeline<R: TextRecognizer, C: Clock = SystemClock> {
    recognizer: Arc<R>,
    clock: C,
    config: OcrConfig,
    extractor: Extractor,
}

impl<R: TextRecognizer + 'static> ReceiptPipeline<R, SystemClock> {
    pub fn new(recognizer: R) -> Self {
        Self::with_clock(recognizer, SystemClock)
    }
}

impl<R: TextRecognizer + 'static, C: Clock> ReceiptPipeline<R, C> {
    pub fn with_clock(recognizer: R, clock: C) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
            clock,
            config: OcrConfig::default(),
            extractor: Extractor::default(),
        }
    }

    pub fn with_config(mut self, config: OcrConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Process an image file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ExtractionResult, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::warn!("Cannot read receipt {}: {e}", path.display());
            e
        })?;
        tracing::info!("Processing receipt: {}", path.display());
        self.process_bytes(bytes).await
    }

    /// Process raw bytes (from camera capture or file read).
    pub async fn process_bytes(&self, data: Vec<u8>) -> Result<ExtractionResult, PipelineError> {
        self.process_bytes_with_progress(data, ProgressReporter::silent()).await
    }

    pub async fn process_bytes_with_progress(
        &self,
        data: Vec<u8>,
        progress: ProgressReporter,
    ) -> Result<ExtractionResult, PipelineError> {
        match self.run(data, progress).await {
            Ok(result) => {
                tracing::info!(
                    amount = ?result.amount,
                    date = ?result.date,
                    confidence = result.confidence,
                    "Receipt extracted"
                );
                if result.needs_review(self.config.review_threshold) {
                    tracing::debug!("Receipt extraction should be confirmed by the user");
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Receipt pipeline error: {e}");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        data: Vec<u8>,
        progress: ProgressReporter,
    ) -> Result<ExtractionResult, PipelineError> {
        // 1. Preprocess image. The raw buffer is dropped with the task.
        let contrast = self.config.contrast;
        let image = tokio::task::spawn_blocking(move || {
            preprocess::prepare_with_contrast(&data, &contrast)
        })
        .await??;
        let (width, height) = image.dimensions();
        tracing::debug!("Preprocessed {width}x{height} {:?} image", image.format());

        // 2. Run OCR off the async executor; engines block for seconds.
        let recognizer = Arc::clone(&self.recognizer);
        let languages = self.config.languages.clone();
        let recognition = tokio::task::spawn_blocking(move || {
            recognizer.recognize(&image, &languages, &progress)
        })
        .await??;
        tracing::debug!(
            "Recognized {} chars at confidence {:.1}",
            recognition.text.chars().count(),
            recognition.confidence
        );

        // 3. Extract structured fields.
        Ok(self.extractor.extract(recognition, &self.clock))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
