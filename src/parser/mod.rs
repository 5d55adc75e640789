pub mod api;
pub mod loader;

/// Split text into chunks of at most `chunk_size` characters (plus the
/// carried overlap), preferring paragraph, line, and sentence boundaries.
/// Consecutive chunks share roughly `chunk_overlap` trailing characters.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let units = segment(text, &["\n\n", "\n", ". ", " "], chunk_size);
    pack(&units, chunk_size, chunk_overlap)
}

/// Recursively break text into units no larger than `max_len`, keeping each
/// separator attached to the piece it terminates.
fn segment(text: &str, separators: &[&str], max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let Some((sep, rest)) = separators.split_first() else {
        return hard_split(text, max_len);
    };

    let mut units = Vec::new();
    let mut remaining = text;
    while let Some(pos) = remaining.find(sep) {
        let (piece, tail) = remaining.split_at(pos + sep.len());
        if piece.len() > max_len {
            units.extend(segment(piece, rest, max_len));
        } else {
            units.push(piece.to_string());
        }
        remaining = tail;
    }
    if !remaining.is_empty() {
        if remaining.len() > max_len {
            units.extend(segment(remaining, rest, max_len));
        } else {
            units.push(remaining.to_string());
        }
    }
    units
}

/// Character-boundary-safe split for text with no usable separators.
fn hard_split(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::with_capacity(max_len);
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > max_len && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedily pack units into chunks, seeding each new chunk with the tail of
/// the previous one for overlap.
fn pack(units: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut seed_len = 0usize;

    for unit in units {
        if current.len() + unit.len() > chunk_size && current.len() > seed_len {
            let seed = char_safe_tail(&current, chunk_overlap).to_string();
            chunks.push(std::mem::take(&mut current));
            seed_len = seed.len();
            current = seed;
        }
        current.push_str(unit);
    }

    if current.len() > seed_len {
        chunks.push(current);
    }
    chunks
}

/// Last `max_bytes` of `s`, adjusted backward to a char boundary.
fn char_safe_tail(s: &str, max_bytes: usize) -> &str {
    if max_bytes == 0 || s.is_empty() {
        return "";
    }
    let mut start = s.len().saturating_sub(max_bytes);
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_text("hello world", 1000, 200);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_text("", 1000, 200).is_empty());
        assert!(split_text("   \n  ", 1000, 200).is_empty());
    }

    #[test]
    fn test_multiple_chunks_within_bounds() {
        let text = (0..20)
            .map(|i| format!("Paragraph {i}. {}", "x".repeat(80)))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = split_text(&text, 300, 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.len() <= 300 + 50,
                "chunk of {} chars exceeds bound",
                chunk.len()
            );
        }
    }

    #[test]
    fn test_overlap_carried_between_chunks() {
        let text = (0..10)
            .map(|i| format!("Sentence number {i} with some padding text. "))
            .collect::<String>();
        let chunks = split_text(&text, 120, 30);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail = char_safe_tail(&pair[0], 30);
            assert!(pair[1].starts_with(tail));
        }
    }

    #[test]
    fn test_no_separator_hard_split() {
        let text = "a".repeat(250);
        let chunks = split_text(&text, 100, 10);
        assert!(chunks.len() >= 3);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert!(total >= 250);
    }

    #[test]
    fn test_multibyte_boundary_safety() {
        let text = "é".repeat(300);
        let chunks = split_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }
}
