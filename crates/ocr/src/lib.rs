pub mod config;
pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use config::{ConfigError, ContrastConfig, OcrConfig};
pub use extract::{
    default_amount_matchers, extract_amount, extract_date, extract_date_detailed, AmountMatcher,
    DateExtraction, Extractor, RegexAmountMatcher,
};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr, prepare_for_ocr_from_bytes, EncodedImage, PreprocessError};
pub use recognizer::{MockRecognizer, ProgressReporter, RecognitionError, TextRecognizer};
pub use types::{
    DatePattern, DateSource, ExtractionResult, Language, LanguageHints, RecognitionResult,
};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
