pub mod content_extractor;
pub mod grading_service;
pub mod llm_service;
pub mod ocr_service;
pub mod pdf_text;
pub mod result_store;
pub mod understanding_service;

pub use content_extractor::{ContentExtractor, ExtractedContent, ExtractionSource};
pub use grading_service::{parse_grading_response, DeepSeekGrader, GradingBackend, GradingClient};
pub use llm_service::LlmService;
pub use ocr_service::{DocumentOcr, MistralOcr, OcrPage};
pub use pdf_text::{PdfTextLayer, TextLayerExtractor};
pub use result_store::{GradedFileRecord, PersistenceBackend, ResultStore, SupabaseStore};
pub use understanding_service::{ContentUnderstanding, MistralUnderstanding};
