//! Pulls test code out of a model reply.
//!
//! Rules, in order:
//! 1. Fenced regions (a line starting with ```, optional info string)
//!    are collected. An unclosed fence runs to the end of the text.
//! 2. The longest region by bytes wins; ties go to the first.
//! 3. With no fence at all, the whole reply is the code.
//! 4. Empty replies, or replies whose fences are all blank, are errors.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

const FENCE: &str = "```";

pub fn extract_code(response: &str) -> Result<String> {
    if response.trim().is_empty() {
        return Err(Error::Materialization("model returned an empty response".into()));
    }

    let blocks = fenced_blocks(response);

    if blocks.is_empty() {
        return Ok(response.to_string());
    }

    let mut best = blocks[0];
    for &b in &blocks[1..] {
        if b.len() > best.len() {
            best = b;
        }
    }

    if best.trim().is_empty() {
        return Err(Error::Materialization(
            "response contains only empty code blocks".into(),
        ));
    }

    Ok(best.to_string())
}

fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut open_at: Option<usize> = None;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if !line.trim_start().starts_with(FENCE) {
            continue;
        }

        match open_at.take() {
            None => open_at = Some(offset),
            Some(start) => blocks.push(&text[start..line_start]),
        }
    }

    if let Some(start) = open_at {
        blocks.push(&text[start..]);
    }

    blocks
}

fn test_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(?:async\s+)?def\s+test").expect("test def regex"))
}

/// Number of pytest-collectable functions in `code`.
pub fn count_tests(code: &str) -> usize {
    test_def_re().find_iter(code).count()
}
