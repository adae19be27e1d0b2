//! Structure-aware text chunking with bounded chunk size
//!
//! Markdown headers delimit sections; within a section, paragraphs
//! accumulate into chunks up to the size bound, oversized paragraphs fall
//! back to sentence splitting, and oversized sentences to a fixed-step
//! character window. Concatenating the chunk texts reproduces every
//! non-whitespace character of the input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartinsight_core::{KnowledgeError, Result};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static ATX_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").expect("header regex must compile"));

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={2,}|-{2,})\s*$").expect("setext regex must compile"));

static PARAGRAPH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex must compile"));

/// Sentence boundary: terminal punctuation, whitespace, then an uppercase
/// letter
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+[A-Z]").expect("sentence regex must compile"));

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,

    /// Overlap in characters for window splits; clamped to half the size
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// A chunk of a document sized for embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Chunk text
    pub text: String,

    /// Sequential position across the whole document
    pub position: usize,

    /// Most recent header above this chunk, when any
    pub section: Option<String>,

    /// Source identifier, filled by the document embedder
    pub source_id: Option<String>,

    /// Extension metadata
    pub metadata: HashMap<String, Value>,
}

impl TextChunk {
    fn new(text: String, position: usize, section: Option<String>) -> Self {
        Self {
            text,
            position,
            section,
            source_id: None,
            metadata: HashMap::new(),
        }
    }
}

/// Structure-aware chunker
#[derive(Debug, Default)]
pub struct StructureAwareChunker;

impl StructureAwareChunker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Split a document into ordered chunks
    ///
    /// Empty or whitespace-only input yields the empty sequence; input at
    /// or below the size bound yields exactly one chunk.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `max_chunk_size` is zero.
    pub fn chunk_document(
        &self,
        text: &str,
        title: Option<&str>,
        config: &ChunkingConfig,
    ) -> Result<Vec<TextChunk>> {
        if config.max_chunk_size == 0 {
            return Err(KnowledgeError::invalid_argument(
                "max_chunk_size must be positive",
            ));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let overlap = config.overlap.min(config.max_chunk_size / 2);
        let default_section = title.unwrap_or("Document").to_string();

        let mut chunks = Vec::new();
        for (section, body) in Self::split_sections(text, &default_section) {
            Self::chunk_section(
                &body,
                &section,
                config.max_chunk_size,
                overlap,
                &mut chunks,
            );
        }

        for (position, chunk) in chunks.iter_mut().enumerate() {
            chunk.position = position;
        }
        debug!(chunks = chunks.len(), "document chunked");
        Ok(chunks)
    }

    /// Split into `(section name, section body)` pairs by Markdown headers
    fn split_sections(text: &str, default_section: &str) -> Vec<(String, String)> {
        let mut sections = Vec::new();
        let mut current_name = default_section.to_string();
        let mut buffer: Vec<&str> = Vec::new();
        let lines: Vec<&str> = text.lines().collect();

        let flush = |name: &str, buffer: &mut Vec<&str>, sections: &mut Vec<(String, String)>| {
            let body = buffer.join("\n");
            if !body.trim().is_empty() {
                sections.push((name.to_string(), body));
            }
            buffer.clear();
        };

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if let Some(captures) = ATX_HEADER.captures(line) {
                flush(&current_name, &mut buffer, &mut sections);
                current_name = captures[2].to_string();
            } else if i + 1 < lines.len()
                && SETEXT_UNDERLINE.is_match(lines[i + 1])
                && !line.trim().is_empty()
            {
                flush(&current_name, &mut buffer, &mut sections);
                current_name = line.trim().to_string();
                i += 1;
            } else {
                buffer.push(line);
            }
            i += 1;
        }
        flush(&current_name, &mut buffer, &mut sections);
        sections
    }

    /// Paragraph-level chunking of one section body
    fn chunk_section(
        body: &str,
        section: &str,
        max_chunk_size: usize,
        overlap: usize,
        chunks: &mut Vec<TextChunk>,
    ) {
        let mut current = String::new();
        let flush = |current: &mut String, chunks: &mut Vec<TextChunk>| {
            if !current.trim().is_empty() {
                chunks.push(TextChunk::new(
                    current.trim().to_string(),
                    0,
                    Some(section.to_string()),
                ));
            }
            current.clear();
        };

        for paragraph in PARAGRAPH_SPLIT.split(body) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            if paragraph.chars().count() > max_chunk_size {
                flush(&mut current, chunks);
                for piece in Self::split_oversized(paragraph, max_chunk_size, overlap) {
                    chunks.push(TextChunk::new(piece, 0, Some(section.to_string())));
                }
                continue;
            }

            let current_len = current.chars().count();
            let added = paragraph.chars().count() + if current.is_empty() { 0 } else { 2 };
            if current_len + added <= max_chunk_size {
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(paragraph);
            } else {
                flush(&mut current, chunks);
                current.push_str(paragraph);
            }
        }
        flush(&mut current, chunks);
    }

    /// Sentence split, falling back to a fixed-step window per sentence
    fn split_oversized(paragraph: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for sentence in Self::split_sentences(paragraph) {
            let sentence_len = sentence.chars().count();
            if sentence_len > max_chunk_size {
                if !current.trim().is_empty() {
                    pieces.push(current.trim().to_string());
                }
                current = String::new();
                pieces.extend(Self::window_split(&sentence, max_chunk_size, overlap));
                continue;
            }

            if current.chars().count() + sentence_len <= max_chunk_size {
                current.push_str(&sentence);
            } else {
                if !current.trim().is_empty() {
                    pieces.push(current.trim().to_string());
                }
                current = sentence;
            }
        }
        if !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
        }
        pieces
    }

    /// Cut after terminal punctuation followed by whitespace and an
    /// uppercase letter
    fn split_sentences(paragraph: &str) -> Vec<String> {
        let mut cuts: Vec<usize> = SENTENCE_BOUNDARY
            .find_iter(paragraph)
            .map(|m| m.start() + 1)
            .collect();
        cuts.push(paragraph.len());

        let mut sentences = Vec::new();
        let mut start = 0;
        for cut in cuts {
            if cut > start {
                sentences.push(paragraph[start..cut].to_string());
                start = cut;
            }
        }
        sentences
    }

    /// Fixed-step character window with `max_chunk_size - overlap` stride
    fn window_split(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
        let step = (max_chunk_size - overlap).max(1);
        let chars: Vec<char> = text.chars().collect();
        let mut windows = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + max_chunk_size).min(chars.len());
            let piece: String = chars[start..end].iter().collect();
            if !piece.trim().is_empty() {
                windows.push(piece.trim().to_string());
            }
            if end >= chars.len() {
                break;
            }
            start += step;
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> StructureAwareChunker {
        StructureAwareChunker::new()
    }

    /// Non-whitespace characters, for coverage checks
    fn solid(text: &str) -> Vec<char> {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunks = chunker()
            .chunk_document("", None, &ChunkingConfig::default())
            .unwrap();
        assert!(chunks.is_empty());

        let chunks = chunker()
            .chunk_document("   \n\n  ", None, &ChunkingConfig::default())
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let chunks = chunker()
            .chunk_document("One short paragraph.", Some("Title"), &ChunkingConfig::default())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "One short paragraph.");
        assert_eq!(chunks[0].section.as_deref(), Some("Title"));
        assert_eq!(chunks[0].position, 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ChunkingConfig {
            max_chunk_size: 0,
            overlap: 0,
        };
        assert!(chunker().chunk_document("text", None, &config).is_err());
    }

    #[test]
    fn test_headers_set_sections() {
        let text = "intro paragraph\n\n# Setup\n\nInstall it.\n\n## Usage\n\nRun it.";
        let chunks = chunker()
            .chunk_document(text, Some("Guide"), &ChunkingConfig::default())
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].section.as_deref(), Some("Guide"));
        assert_eq!(chunks[1].section.as_deref(), Some("Setup"));
        assert_eq!(chunks[2].section.as_deref(), Some("Usage"));
    }

    #[test]
    fn test_setext_headers_detected() {
        let text = "Overview\n========\n\nBody text here.\n\nDetails\n-------\n\nMore body.";
        let chunks = chunker()
            .chunk_document(text, None, &ChunkingConfig::default())
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section.as_deref(), Some("Overview"));
        assert_eq!(chunks[1].section.as_deref(), Some("Details"));
    }

    #[test]
    fn test_paragraphs_accumulate_up_to_limit() {
        let config = ChunkingConfig {
            max_chunk_size: 50,
            overlap: 0,
        };
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunker().chunk_document(text, None, &config).unwrap();

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 50);
        }
        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_long_text_coverage() {
        // 2500 characters of sentence-free text exercises the window path
        let text = "word ".repeat(500);
        let config = ChunkingConfig {
            max_chunk_size: 1000,
            overlap: 200,
        };
        let chunks = chunker().chunk_document(&text, None, &config).unwrap();

        assert!(chunks.len() >= 3, "2500 chars should need at least 3 chunks");
        let mut concatenated = String::new();
        for chunk in &chunks {
            concatenated.push_str(&chunk.text);
            concatenated.push(' ');
        }
        // Every non-whitespace character of the input appears in order
        // within the concatenation (overlap may repeat some)
        let input_solid = solid(&text);
        let output_solid = solid(&concatenated);
        let mut cursor = 0;
        for c in input_solid {
            let found = output_solid[cursor..].iter().position(|&o| o == c);
            assert!(found.is_some(), "dropped character {c:?}");
            cursor += found.unwrap();
        }
    }

    #[test]
    fn test_oversized_paragraph_splits_on_sentences() {
        let config = ChunkingConfig {
            max_chunk_size: 60,
            overlap: 10,
        };
        let text = "This is the first sentence of the paragraph. Here comes a second one. And a third sentence closes it.";
        let chunks = chunker().chunk_document(text, None, &config).unwrap();

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 60);
        }
        assert!(chunks[0].text.starts_with("This is the first"));
    }

    #[test]
    fn test_overlap_clamped_to_half() {
        let config = ChunkingConfig {
            max_chunk_size: 100,
            overlap: 90,
        };
        // A single unbroken 300-char "sentence" forces window splitting
        let text = "x".repeat(300);
        let chunks = chunker().chunk_document(&text, None, &config).unwrap();

        // Effective overlap is 50, so the step is 50 chars
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
    }
}
