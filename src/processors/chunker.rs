//! Splits LaTeX source into translation-sized chunks
//!
//! Boundaries are found textually: sectioning commands first, blank-line
//! paragraphs as a fallback. Chunks always concatenate back to the exact input.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::core::tokenizer::TokenEstimator;

/// `\chapter{..}` through `\subsubsection{..}`. Titles containing `}` are not
/// matched as a whole.
fn section_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\\(?:chapter|section|subsection|subsubsection)\{[^}]*\}")
            .expect("section pattern is valid")
    })
}

/// A blank line, possibly holding spaces or tabs
fn paragraph_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"))
}

/// Token-budgeted LaTeX chunker
#[derive(Debug, Clone)]
pub struct LatexChunker {
    budget: usize,
    estimator: Arc<TokenEstimator>,
}

impl LatexChunker {
    pub fn new(budget: usize, estimator: Arc<TokenEstimator>) -> Self {
        Self { budget, estimator }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Split `text` into chunks under the token budget.
    ///
    /// Whitespace-only input yields no chunks. Otherwise concatenating the
    /// result reproduces `text`. A single section or paragraph larger than the
    /// budget is returned whole.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chunks = self.accumulate(split_sections(text));

        if chunks.len() == 1 && self.estimator.estimate(&chunks[0]) > self.budget {
            debug!("Single section exceeds {} tokens, splitting by paragraphs", self.budget);
            return self.accumulate(split_paragraphs(&chunks[0]));
        }

        chunks
    }

    /// Pack segments greedily, flushing before the one that would overflow
    fn accumulate<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for segment in segments {
            if segment.trim().is_empty() {
                // Glued on so no whitespace is lost; never starts a chunk on its own
                current.push_str(segment);
                continue;
            }

            let has_content = !current.trim().is_empty();
            if has_content
                && self.estimator.estimate(&format!("{}{}", current, segment)) > self.budget
            {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(segment);
        }

        if current.trim().is_empty() {
            if let Some(last) = chunks.last_mut() {
                last.push_str(&current);
            }
        } else {
            chunks.push(current);
        }

        chunks
    }
}

/// Cut before every sectioning command; the command starts its segment
fn split_sections(text: &str) -> Vec<&str> {
    split_at_starts(text, section_pattern().find_iter(text).map(|m| m.start()))
}

/// Cut after every blank-line separator; the separator ends its paragraph
fn split_paragraphs(text: &str) -> Vec<&str> {
    split_at_starts(text, paragraph_pattern().find_iter(text).map(|m| m.end()))
}

fn split_at_starts(text: &str, cuts: impl Iterator<Item = usize>) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for cut in cuts {
        if cut > start {
            segments.push(&text[start..cut]);
            start = cut;
        }
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(budget: usize) -> LatexChunker {
        LatexChunker::new(budget, Arc::new(TokenEstimator::word_heuristic()))
    }

    fn words(n: usize) -> String {
        vec!["palabra"; n].join(" ")
    }

    #[test]
    fn test_two_sections_under_budget_per_chunk() {
        let text = format!(
            "\\section{{Uno}}\n{}\n\n\\section{{Dos}}\n{}\n",
            words(20),
            words(20)
        );
        // Each section is ~28 tokens, both together ~55
        let chunks = chunker(40).chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("\\section{Uno}"));
        assert!(chunks[1].starts_with("\\section{Dos}"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_small_document_is_one_chunk() {
        let text = "\\section{Uno}\nHola.\n\\subsection{Dos}\nAdiós.\n";
        let chunks = chunker(3000).chunk(text);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_preamble_stays_with_first_chunk() {
        let text = format!(
            "\\documentclass{{article}}\n\\begin{{document}}\n\\chapter{{A}}\n{}\n\\chapter{{B}}\n{}\n",
            words(30),
            words(30)
        );
        let chunks = chunker(45).chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("\\documentclass"));
        assert!(chunks[0].contains("\\chapter{A}"));
        assert!(chunks[1].starts_with("\\chapter{B}"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_paragraph_fallback_for_oversized_single_section() {
        let paragraphs: Vec<String> = (0..6).map(|_| words(10)).collect();
        let text = paragraphs.join("\n\n");
        // 60 words is ~78 tokens, far over the budget, with no sections
        let chunks = chunker(30).chunk(&text);

        assert!(chunks.len() >= 2, "expected a paragraph split, got {:?}", chunks);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(TokenEstimator::word_heuristic().estimate(chunk) <= 30);
        }
    }

    #[test]
    fn test_paragraph_separators_with_spaces_are_kept() {
        let text = format!("{}\n  \n{}\n\t\n{}", words(10), words(10), words(10));
        let chunks = chunker(15).chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].ends_with("\n  \n"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_oversized_paragraph_is_not_split_further() {
        let text = words(100);
        let chunks = chunker(10).chunk(&text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_oversized_section_among_others_is_kept_whole() {
        let text = format!(
            "\\section{{A}} {}\n\\section{{B}} {}\n\\section{{C}} {}\n",
            words(5),
            words(50),
            words(5)
        );
        let chunks = chunker(20).chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].starts_with("\\section{B}"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_whitespace_only_input_yields_no_chunks() {
        assert!(chunker(10).chunk("").is_empty());
        assert!(chunker(10).chunk("  \n\n\t\n").is_empty());
    }

    #[test]
    fn test_no_whitespace_only_chunks() {
        let text = format!("\n\n\\section{{A}}\n{}\n\n\n\\section{{B}}\n{}\n\n\n", words(15), words(15));
        let chunks = chunker(25).chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_title_with_nested_braces_splits_at_the_command_only() {
        // `[^}]*` stops at the first closing brace; the command is still a boundary
        let text = format!(
            "\\section{{The \\emph{{real}} one}} {}\n\\section{{Plain}} {}",
            words(20),
            words(20)
        );
        let chunks = chunker(30).chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("\\section{Plain}"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_concatenation_reproduces_varied_inputs() {
        let inputs = [
            "plain text without structure".to_string(),
            format!("\\chapter{{X}}{}\\section{{Y}}{}", words(40), words(40)),
            format!("{}\n\n\n\n{}\n \n{}", words(25), words(25), words(25)),
            format!("\\subsubsection{{ñandú}}\nÁrbol {}\n\n\\subsection{{é}}", words(30)),
            "\\section{}\\section{}\\section{}".to_string(),
        ];

        for budget in [1, 5, 20, 100, 3000] {
            for input in &inputs {
                let chunks = chunker(budget).chunk(input);
                assert_eq!(&chunks.concat(), input, "budget {}", budget);
            }
        }
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(
            split_sections("intro\\section{A}a\\subsection{B}b"),
            vec!["intro", "\\section{A}a", "\\subsection{B}b"]
        );
        assert_eq!(split_sections("\\section{A}a"), vec!["\\section{A}a"]);
        assert_eq!(split_paragraphs("a\n\nb\n \nc"), vec!["a\n\n", "b\n \n", "c"]);
    }
}
