//! crates/flashcards_core/src/prompt.rs
//!
//! Builds the instruction string sent to the language model.

use crate::domain::Chunk;

pub const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 8;

const OUTPUT_EXAMPLE: &str = r#"[
    {"question": "What is the capital of France?", "answer": "Paris"},
    {"question": "When did World War II end?", "answer": "1945"}
]"#;

/// Renders the first `max_chunks` chunks as numbered excerpts.
pub fn render_context(chunks: &[Chunk], max_chunks: usize) -> String {
    chunks
        .iter()
        .take(max_chunks)
        .map(|chunk| format!("Excerpt {}:\n{}", chunk.index + 1, chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the flashcard prompt for `count` cards over `context`.
pub fn build_prompt(context: &str, count: usize, instructions: Option<&str>) -> String {
    let mut prompt = format!(
        "DOCUMENT CONTENT:\n---\n{context}\n---\n\n\
         Based on the document content, create exactly {count} high-quality question-answer pairs.\n\
         Each question should be clear, specific, and test understanding of key concepts.\n\
         Each answer should be concise but complete.\n\n\
         Format the response as a JSON array of exactly {count} objects with 'question' and 'answer' fields.\n\
         Example format:\n{OUTPUT_EXAMPLE}\n"
    );

    if let Some(extra) = instructions.filter(|text| !text.trim().is_empty()) {
        prompt.push_str("\nAdditional instructions: ");
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt.push_str("\nReturn ONLY the JSON array, nothing else.");
    prompt
}
