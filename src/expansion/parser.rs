//! Strict decoding of the model's expansion reply.
//!
//! Grammar: a JSON array of exactly [`CandidateSet::SIZE`] non-empty strings
//! whose first element equals the seed query. A single Markdown code fence
//! around the whole reply is tolerated; anything else is a [`ParseError`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::models::CandidateSet;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```(?:json)?[ \t]*\n?(.*?)\n?[ \t]*```$")
        .expect("code fence pattern is valid");
}


#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("reply is not a sequence of strings: {0}")]
    NotASequence(String),

    #[error("element {index} is a {found}, expected a string")]
    NonStringElement { index: usize, found: &'static str },

    #[error("element {index} is empty")]
    EmptyElement { index: usize },

    #[error("expected {expected} elements, found {found}")]
    WrongCardinality { expected: usize, found: usize },

    #[error("first element must be the seed query {expected:?}, found {found:?}")]
    SeedMismatch { expected: String, found: String },
}


pub fn parse_candidates(raw: &str, seed: &str) -> Result<CandidateSet, ParseError> {
    let body = strip_code_fence(raw.trim());

    let value: Value = serde_json::from_str(body).map_err(|e| ParseError::NotASequence(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ParseError::NotASequence(format!("got JSON {}", json_kind(&other)))),
    };

    let queries = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(s) => Ok(s),
            other => Err(ParseError::NonStringElement {
                index,
                found: json_kind(&other),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    CandidateSet::try_new(seed, queries)
}


fn strip_code_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str().trim())
}


fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "How to catch fish USA";

    #[test]
    fn test_valid_reply() {
        let raw = r#"["How to catch fish USA", "Fishing techniques in the United States", "Where to fish in America", "Best fishing spots USA", "US fishing regulations"]"#;
        let set = parse_candidates(raw, SEED).unwrap();
        assert_eq!(set.seed(), SEED);
        assert_eq!(set.expansions().len(), 4);
        assert_eq!(set.expansions()[1], "Where to fish in America");
    }

    #[test]
    fn test_fenced_reply_and_whitespace() {
        let raw = "\n```json\n[\"How to catch fish USA\", \"a\", \"b\", \"c\", \"d\"]\n```\n";
        assert!(parse_candidates(raw, SEED).is_ok());

        let raw = "```[\"How to catch fish USA\", \"a\", \"b\", \"c\", \"d\"]```";
        assert!(parse_candidates(raw, SEED).is_ok());
    }

    #[test]
    fn test_escaped_quotes_survive() {
        let raw = r#"["How to catch fish USA", "\"catch and release\" rules", "b", "c", "d"]"#;
        let set = parse_candidates(raw, SEED).unwrap();
        assert_eq!(set.expansions()[0], "\"catch and release\" rules");
    }

    #[test]
    fn test_prose_is_rejected() {
        let raw = "Sure! Here are some queries:\n1. How to catch fish USA";
        assert!(matches!(parse_candidates(raw, SEED), Err(ParseError::NotASequence(_))));
    }

    #[test]
    fn test_python_literal_is_rejected() {
        let raw = "['How to catch fish USA', 'a', 'b', 'c', 'd']";
        assert!(matches!(parse_candidates(raw, SEED), Err(ParseError::NotASequence(_))));
    }

    #[test]
    fn test_object_is_rejected() {
        let raw = r#"{"queries": ["How to catch fish USA"]}"#;
        let err = parse_candidates(raw, SEED).unwrap_err();
        assert_eq!(err, ParseError::NotASequence("got JSON object".to_string()));
    }

    #[test]
    fn test_non_string_element() {
        let raw = r#"["How to catch fish USA", "a", 3, "c", "d"]"#;
        assert_eq!(
            parse_candidates(raw, SEED).unwrap_err(),
            ParseError::NonStringElement { index: 2, found: "number" }
        );
    }

    #[test]
    fn test_cardinality() {
        let four = r#"["How to catch fish USA", "a", "b", "c"]"#;
        assert_eq!(
            parse_candidates(four, SEED).unwrap_err(),
            ParseError::WrongCardinality { expected: 5, found: 4 }
        );

        let six = r#"["How to catch fish USA", "a", "b", "c", "d", "e"]"#;
        assert_eq!(
            parse_candidates(six, SEED).unwrap_err(),
            ParseError::WrongCardinality { expected: 5, found: 6 }
        );

        assert!(matches!(
            parse_candidates("[]", SEED),
            Err(ParseError::WrongCardinality { found: 0, .. })
        ));
    }

    #[test]
    fn test_seed_must_come_first() {
        let raw = r#"["Fishing in the USA", "How to catch fish USA", "b", "c", "d"]"#;
        assert!(matches!(parse_candidates(raw, SEED), Err(ParseError::SeedMismatch { .. })));

        let raw = r#"["how to catch fish usa", "a", "b", "c", "d"]"#;
        assert!(matches!(parse_candidates(raw, SEED), Err(ParseError::SeedMismatch { .. })));
    }

    #[test]
    fn test_seed_surrounding_whitespace_ignored() {
        let raw = r#"[" How to catch fish USA ", "a", "b", "c", "d"]"#;
        assert!(parse_candidates(raw, SEED).is_ok());
    }
}
