use common::error::AppError;

/// Splits extracted text into retrieval-sized chunks.
///
/// Sentences are packed greedily up to `max_chunk_chars`, so chunks end on
/// sentence boundaries whenever possible. A single sentence longer than the
/// budget falls back to word-boundary splitting. Sizes are measured in
/// characters, not bytes, so multi-byte text does not get shortchanged.
pub fn chunk_text(text: &str, max_chunk_chars: usize) -> Result<Vec<String>, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Cannot chunk empty text content".to_string(),
        ));
    }
    let max_chunk_chars = max_chunk_chars.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if sentence_len > max_chunk_chars {
            // Flush whatever is packed, then break the oversize sentence on
            // word boundaries.
            flush(&mut chunks, &mut current, &mut current_len);
            chunks.extend(split_oversize(&sentence, max_chunk_chars));
            continue;
        }

        // +1 for the joining space when the chunk already has content.
        let projected = if current_len == 0 {
            sentence_len
        } else {
            current_len + 1 + sentence_len
        };

        if projected > max_chunk_chars {
            flush(&mut chunks, &mut current, &mut current_len);
            current.push_str(&sentence);
            current_len = sentence_len;
        } else {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(&sentence);
            current_len = projected;
        }
    }

    flush(&mut chunks, &mut current, &mut current_len);
    Ok(chunks)
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if *current_len > 0 {
        chunks.push(std::mem::take(current));
        *current_len = 0;
    }
}

/// Splits on sentence terminators, keeping the terminator with its sentence.
/// Text after the last terminator is treated as a final sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Word-boundary fallback for a sentence that alone exceeds the budget. A
/// single word longer than the budget is kept whole rather than cut mid-word.
fn split_oversize(sentence: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        let projected = if current_len == 0 {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if projected > max_chunk_chars && current_len > 0 {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = projected;
        }
    }

    if current_len > 0 {
        pieces.push(current);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            chunk_text("   \n  ", 1000),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("One sentence. Another one.", 1000).expect("chunking failed");
        assert_eq!(chunks, vec!["One sentence. Another one.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_character_budget() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(60);
        let chunks = chunk_text(&text, 100).expect("chunking failed");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 100,
                "chunk exceeded budget: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn test_2500_chars_of_sentences_makes_three_chunks() {
        // 50 sentences of 49 chars + terminator = 2500 chars of content,
        // which packs into 3 chunks under a 1000 char budget.
        let sentence = format!("{}.", "a".repeat(49));
        let text = vec![sentence; 50].join(" ");
        assert_eq!(text.chars().count(), 2549);

        let chunks = chunk_text(&text, 1000).expect("chunking failed");
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_content_survives_chunking() {
        let text = "First point. Second point! Third question? Trailing fragment";
        let chunks = chunk_text(text, 30).expect("chunking failed");
        let rejoined = chunks.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rejoined), normalize(text));
    }

    #[test]
    fn test_oversize_sentence_splits_on_words() {
        let sentence = format!("{}.", "word ".repeat(50).trim_end());
        let chunks = chunk_text(&sentence, 40).expect("chunking failed");
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
            assert!(!chunk.contains("wo rd"), "word was cut mid-way");
        }
    }

    #[test]
    fn test_single_giant_word_is_kept_whole() {
        let word = "x".repeat(120);
        let chunks = chunk_text(&word, 40).expect("chunking failed");
        assert_eq!(chunks, vec![word]);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = "Alpha beta. Gamma delta! Epsilon? ".repeat(20);
        let first = chunk_text(&text, 80).expect("chunking failed");
        let second = chunk_text(&text, 80).expect("chunking failed");
        assert_eq!(first, second);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("three little words"), 3);
        assert_eq!(count_words("  spaced   out  "), 2);
        assert_eq!(count_words(""), 0);
    }
}
