//! Character-window chunking of site text.

use std::collections::HashSet;

use outreach_shared::PipelineConfig;

/// Window parameters, all measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub size: usize,
    pub overlap: usize,
    pub min_len: usize,
}

impl ChunkParams {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            size: config.chunk_size,
            overlap: config.chunk_overlap,
            min_len: config.min_chunk_length,
        }
    }

    fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into overlapping windows, then filter and dedup them.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Vec<String> {
    filter_chunks(windows(text, params), params.min_len)
}

/// Overlapping windows of `params.size` characters advancing by `size - overlap`.
///
/// The last window ends exactly at the end of the text, so it may overlap its
/// predecessor by more than `overlap`. Text no longer than one window is
/// returned whole.
pub fn windows(text: &str, params: &ChunkParams) -> Vec<String> {
    let size = params.size.max(1);
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = bounds.len();
    bounds.push(text.len());

    if char_count == 0 {
        return Vec::new();
    }
    if char_count <= size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start + size < char_count {
        chunks.push(text[bounds[start]..bounds[start + size]].to_string());
        start += params.step();
    }
    chunks.push(text[bounds[char_count - size]..].to_string());
    chunks
}

/// Drop chunks whose trimmed length is below `min_len` and exact duplicates,
/// keeping first-seen order.
pub fn filter_chunks<I>(chunks: I, min_len: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| chunk.trim().chars().count() >= min_len)
        .filter(|chunk| seen.insert(chunk.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, overlap: usize, min_len: usize) -> ChunkParams {
        ChunkParams {
            size,
            overlap,
            min_len,
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(windows("hello", &params(10, 2, 1)), vec!["hello"]);
        assert!(windows("", &params(10, 2, 1)).is_empty());
    }

    #[test]
    fn final_window_is_aligned_to_end() {
        let chunks = windows("abcdefghij", &params(4, 2, 1));
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij"]);

        let chunks = windows("abcdefghijk", &params(4, 1, 1));
        assert_eq!(chunks, vec!["abcd", "defg", "ghij", "hijk"]);
        assert!(chunks.iter().all(|c| c.chars().count() == 4));
    }

    #[test]
    fn windows_cover_the_source() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let chunks = windows(text, &params(10, 3, 1));
        assert!(text.starts_with(chunks.first().unwrap().as_str()));
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.contains(&b[..3]), "{a:?} and {b:?} do not overlap");
        }
    }

    #[test]
    fn windows_respect_char_boundaries() {
        let text = "héllo wörld ünïcode";
        let chunks = windows(text, &params(5, 1, 1));
        assert!(chunks.iter().all(|c| c.chars().count() == 5));
        assert_eq!(chunks.last().unwrap(), "ïcode");
    }

    #[test]
    fn short_and_duplicate_chunks_are_dropped() {
        let chunks = vec![
            "alpha beta".to_string(),
            "   x   ".to_string(),
            "gamma delta".to_string(),
            "alpha beta".to_string(),
        ];
        assert_eq!(
            filter_chunks(chunks, 5),
            vec!["alpha beta".to_string(), "gamma delta".to_string()]
        );
    }

    #[test]
    fn repeated_windows_are_deduplicated() {
        let text = format!("{}{}{}", "a".repeat(10), "b".repeat(10), "a".repeat(10));
        let chunks = chunk_text(&text, &params(10, 0, 1));
        assert_eq!(chunks, vec!["a".repeat(10), "b".repeat(10)]);
    }
}
