//! Size-bounded segmentation of source text.
//!
//! Paragraph boundaries are preferred, then sentence boundaries, then
//! whitespace. A single token longer than the target is cut at a char boundary.

use tracing::debug;

/// Configuration for chunking.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// A chunk is only closed once it exceeds this many characters.
    pub min_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            min_size: 500,
        }
    }
}

/// Split text into chunks of roughly `chunk_size` characters.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunk_size = config.chunk_size.max(1);

    let pieces: Vec<String> = split_paragraphs(text)
        .into_iter()
        .flat_map(|p| {
            if char_len(&p) > chunk_size {
                split_long(&p, chunk_size)
            } else {
                vec![p]
            }
        })
        .collect();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0;

    for piece in pieces {
        let len = char_len(&piece);
        if current_len + len > chunk_size && current_len > config.min_size {
            chunks.push(current.join("\n\n"));
            current.clear();
            current_len = 0;
        }
        current_len += len;
        current.push(piece);
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    debug!("Text split into {} chunks", chunks.len());
    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Paragraphs separated by blank lines, trimmed, empty ones dropped.
fn split_paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Break an oversized paragraph into sentence-aligned pieces no longer than `max`.
fn split_long(paragraph: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(paragraph) {
        let units = if char_len(sentence) > max {
            split_words(sentence, max)
        } else {
            vec![sentence.to_string()]
        };

        for unit in units {
            let extra = if current.is_empty() { 0 } else { 1 };
            if !current.is_empty() && char_len(&current) + extra + char_len(&unit) > max {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&unit);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Sentences end at `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_i, next)) = chars.peek() {
                if next.is_whitespace() {
                    let sentence = text[start..next_i].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = next_i;
                }
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Pack whitespace-separated words into pieces no longer than `max`.
fn split_words(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        if word_len > max {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for slice in chars.chunks(max) {
                pieces.push(slice.iter().collect());
            }
            continue;
        }

        let extra = if current.is_empty() { 0 } else { 1 };
        if char_len(&current) + extra + word_len > max {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
