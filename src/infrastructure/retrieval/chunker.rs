//! Recursive text chunker with overlap
//!
//! Splits paragraphs, then sentences, then words, then graphemes, merging
//! neighbouring parts up to the target size. Each chunk after the first is
//! prefixed with the tail of its predecessor so that sentences straddling a
//! boundary stay searchable.

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DomainError> {
        if chunk_size == 0 {
            return Err(DomainError::configuration("chunk_size must be greater than 0"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::configuration(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `content` into chunks of at most `chunk_size` bytes
    pub fn chunk(&self, content: &str) -> Vec<String> {
        let normalized = content.replace("\r\n", "\n");
        let content = normalized.trim();

        if content.is_empty() {
            return Vec::new();
        }

        if content.len() <= self.chunk_size {
            return vec![content.to_string()];
        }

        // Room left for the overlap prefix and its separator
        let target = self.chunk_size - self.chunk_overlap;
        let pieces = Self::recursive_chunk(content, target, 0);

        self.apply_overlap(pieces)
    }

    fn split_by_paragraphs(text: &str) -> Vec<&str> {
        text.split("\n\n")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn split_by_sentences(text: &str) -> Vec<&str> {
        text.unicode_sentences()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn recursive_chunk(text: &str, target: usize, level: usize) -> Vec<String> {
        if text.len() <= target {
            return vec![text.to_string()];
        }

        let (parts, separator) = match level {
            0 => (Self::split_by_paragraphs(text), "\n\n"),
            1 => (Self::split_by_sentences(text), " "),
            2 => (text.split_whitespace().collect(), " "),
            _ => return Self::split_by_graphemes(text, target),
        };

        if parts.len() <= 1 {
            return Self::recursive_chunk(text, target, level + 1);
        }

        let mut result = Vec::new();
        let mut current = String::new();

        for part in parts {
            if current.is_empty() {
                current = part.to_string();
            } else if current.len() + separator.len() + part.len() <= target {
                current.push_str(separator);
                current.push_str(part);
            } else {
                Self::flush(&mut result, std::mem::take(&mut current), target, level);
                current = part.to_string();
            }
        }

        if !current.is_empty() {
            Self::flush(&mut result, current, target, level);
        }

        result
    }

    fn flush(result: &mut Vec<String>, current: String, target: usize, level: usize) {
        if current.len() > target {
            result.extend(Self::recursive_chunk(&current, target, level + 1));
        } else {
            result.push(current);
        }
    }

    fn split_by_graphemes(text: &str, target: usize) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = String::new();

        for grapheme in text.graphemes(true) {
            if !current.is_empty() && current.len() + grapheme.len() > target {
                result.push(std::mem::take(&mut current));
            }
            current.push_str(grapheme);
        }

        if !current.is_empty() {
            result.push(current);
        }

        result
    }

    fn apply_overlap(&self, pieces: Vec<String>) -> Vec<String> {
        if self.chunk_overlap == 0 {
            return pieces;
        }

        let mut chunks: Vec<String> = Vec::with_capacity(pieces.len());
        let mut previous: Option<String> = None;

        for piece in pieces {
            let chunk = match previous.as_deref().map(|p| self.overlap_tail(p)) {
                Some(tail) if !tail.is_empty() => format!("{} {}", tail, piece),
                _ => piece.clone(),
            };
            chunks.push(chunk);
            previous = Some(piece);
        }

        chunks
    }

    /// Trailing words of `text` fitting in the overlap budget, minus one byte
    /// for the joining space
    fn overlap_tail<'a>(&self, text: &'a str) -> &'a str {
        let budget = self.chunk_overlap.saturating_sub(1);

        if text.len() <= budget {
            return text;
        }

        let mut start = text.len() - budget;
        while !text.is_char_boundary(start) {
            start += 1;
        }

        // Never start in the middle of a word
        match text[start..].find(char::is_whitespace) {
            Some(offset) => text[start + offset..].trim_start(),
            None => "",
        }
    }
}
