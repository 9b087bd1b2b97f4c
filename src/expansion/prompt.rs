
use crate::index::ScoredChunk;
use crate::EXPANSION_COUNT;

/// Characters of each context chunk shown to the model.
pub const CONTEXT_CHUNK_CHARS: usize = 1000;


pub const SYSTEM_PROMPT: &str = r#"You are a search expert helping users find documents in a knowledge base.

You rewrite a user's search query into alternative phrasings that a retrieval system can use to surface more relevant passages.

Always respond with a JSON array of strings and nothing else."#;


pub fn build_expansion_prompt(seed: &str, context: Option<&[ScoredChunk]>) -> String {
    let total = EXPANSION_COUNT + 1;
    // JSON-encode the seed so the model can copy it character for character.
    let quoted_seed = serde_json::to_string(seed).unwrap_or_else(|_| format!("\"{seed}\""));

    let mut prompt = format!(
        r#"Generate {EXPANSION_COUNT} alternative search queries for the query below.

**Query:**
{quoted_seed}

**Rules:**
- Each alternative must ask for the same information using different wording.
- Keep each alternative to a single short search query.
- Do not number the queries or add explanations."#
    );

    if let Some(chunks) = context.filter(|c| !c.is_empty()) {
        let excerpts = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i + 1, crate::safe_truncate_ellipsis(c.chunk.content.trim(), CONTEXT_CHUNK_CHARS)))
            .collect::<Vec<_>>()
            .join("\n\n");

        prompt.push_str(&format!(
            r#"
- Stay within the topics covered by the document excerpts below; do not introduce subjects they do not mention.

**Document excerpts:**
{excerpts}"#
        ));
    }

    prompt.push_str(&format!(
        r#"

**Response Format:**
A JSON array of exactly {total} double-quoted strings. The first string is the original query exactly as given above, followed by the {EXPANSION_COUNT} alternatives:
[{quoted_seed}, "alternative 1", "alternative 2", "alternative 3", "alternative 4"]"#
    ));

    prompt
}
