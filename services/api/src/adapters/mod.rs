pub mod db;
pub mod downloader;
pub mod extractor;
pub mod flashcard_llm;

pub use db::DbAdapter;
pub use downloader::HttpDownloadAdapter;
pub use extractor::{DocumentExtractor, ExtractionError};
pub use flashcard_llm::OpenAiFlashcardAdapter;
