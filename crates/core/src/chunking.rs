use crate::error::ChunkError;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Window size and overlap, both counted in characters.
///
/// Constructed through [`ChunkingConfig::new`], which rejects an overlap that
/// would keep the window from advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Lazily slices `text` into overlapping windows.
///
/// Windows that are empty after trimming are skipped. Iteration stops once a
/// window reaches the end of the text.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    // Byte offset of every char start, plus `text.len()` as a sentinel.
    boundaries: Vec<usize>,
    config: ChunkingConfig,
    next_start: Option<usize>,
}

impl<'a> Chunks<'a> {
    pub fn new(text: &'a str, config: ChunkingConfig) -> Self {
        let mut boundaries = text
            .char_indices()
            .map(|(offset, _)| offset)
            .collect::<Vec<_>>();
        boundaries.push(text.len());
        let next_start = if text.is_empty() { None } else { Some(0) };

        Self {
            text,
            boundaries,
            config,
            next_start,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let char_count = self.boundaries.len() - 1;

        while let Some(start) = self.next_start {
            let end = start.saturating_add(self.config.size).min(char_count);
            self.next_start = if end == char_count {
                None
            } else {
                Some(start + self.config.stride())
            };

            let piece = &self.text[self.boundaries[start]..self.boundaries[end]];
            if !piece.trim().is_empty() {
                return Some(piece);
            }
        }

        None
    }
}

pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    Chunks::new(text, config).map(str::to_string).collect()
}
