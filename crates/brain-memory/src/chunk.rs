/// Splits `content` into chunks not exceeding `max_chars`, along sentence
/// boundaries; a single sentence longer than the cap is word-split. Empty
/// chunks are dropped. Pure function of its inputs — deterministic and
/// idempotent.
pub fn chunk_content(content: &str, max_chars: usize) -> Vec<String> {
    let sentences = split_sentences(content);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if sentence.chars().count() > max_chars {
            flush(&mut chunks, &mut current);
            chunks.extend(word_split(&sentence, max_chars));
            continue;
        }

        let joined_len = current.chars().count() + if current.is_empty() { 0 } else { 1 } + sentence.chars().count();
        if !current.is_empty() && joined_len > max_chars {
            flush(&mut chunks, &mut current);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
    }
    flush(&mut chunks, &mut current);

    chunks.into_iter().filter(|c| !c.is_empty()).collect()
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

fn word_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        let joined_len = current.chars().count() + if current.is_empty() { 0 } else { 1 } + word.chars().count();
        if !current.is_empty() && joined_len > max_chars {
            chunks.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Splits on `.`/`!`/`?` followed by whitespace or end-of-string.
pub fn split_sentences(content: &str) -> Vec<String> {
    let bytes = content.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let boundary = bytes.get(i + 1).map_or(true, |next| next.is_ascii_whitespace());
            if boundary {
                let piece = content[start..=i].trim();
                if !piece.is_empty() {
                    sentences.push(piece.to_string());
                }
                start = i + 1;
            }
        }
    }
    let tail = content[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_sentences_under_the_cap() {
        let content = "One sentence here. Another one follows. And a third.";
        let chunks = chunk_content(content, 40);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert!(!chunks.is_empty());
    }

    #[test]
    fn word_splits_an_over_long_sentence() {
        let sentence = "wordwordwordword wordwordwordword wordwordwordword wordwordwordword";
        let chunks = chunk_content(sentence, 20);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn is_deterministic() {
        let content = "Hello there. How are you doing today? Fine, thanks!";
        assert_eq!(chunk_content(content, 25), chunk_content(content, 25));
    }

    #[test]
    fn rechunking_the_reassembled_chunks_is_stable() {
        let content = "Hello there. How are you doing today? Fine, thanks!";
        let chunks = chunk_content(content, 80);
        let reassembled = chunks.join(" ");
        assert_eq!(chunk_content(&reassembled, 80), chunks);
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(chunk_content("   ", 100).is_empty());
    }
}
