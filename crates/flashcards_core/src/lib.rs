pub mod chunker;
pub mod domain;
pub mod generation;
pub mod ports;
pub mod prompt;

pub use chunker::{reassemble, Chunker, ChunkerError};
pub use domain::{
    Chunk, Document, DocumentFormat, Flashcard, FlashcardRequest, FlashcardSet,
    FlashcardSetDetail, RemoteDocument, RequestError, SavedFlashcard, SavedFlashcardSet,
};
pub use generation::{generate_flashcards, GenerationError, MalformedOutput};
pub use ports::{
    DatabaseService, DocumentDownloadService, PortError, PortResult, TextGenerationService,
};
pub use prompt::{build_prompt, render_context};
