/// Buffers streamed text and yields complete sentences (or hard-capped
/// chunks) ready to hand to a [`crate::tts::TtsEngine`].
///
/// A segment is flushed when the buffer contains either a
/// sentence-terminating punctuation mark followed by whitespace, or
/// `max_chars` worth of content with no terminator in sight — the hard
/// boundary exists so a long run of tokens without punctuation can't stall
/// audio output indefinitely.
pub struct SentenceAccumulator {
    buf: String,
    max_chars: usize,
}

impl SentenceAccumulator {
    pub fn new(max_chars: usize) -> Self {
        Self { buf: String::new(), max_chars }
    }

    /// Feed more text, returning zero or more segments ready to synthesize.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buf.push_str(text);
        let mut out = Vec::new();

        loop {
            if let Some(boundary) = find_sentence_boundary(&self.buf) {
                let segment: String = self.buf.drain(..boundary).collect();
                push_nonempty(&mut out, segment);
                continue;
            }

            if self.buf.chars().count() >= self.max_chars {
                let split_at = self
                    .buf
                    .char_indices()
                    .nth(self.max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(self.buf.len());
                let segment: String = self.buf.drain(..split_at).collect();
                push_nonempty(&mut out, segment);
                continue;
            }

            break;
        }

        out
    }

    /// Flush whatever remains at end-of-stream.
    pub fn flush(&mut self) -> Option<String> {
        let remaining = std::mem::take(&mut self.buf);
        let trimmed = remaining.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn push_nonempty(out: &mut Vec<String>, segment: String) {
    let trimmed = segment.trim().to_string();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

fn find_sentence_boundary(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            if let Some(next) = bytes.get(i + 1) {
                if next.is_ascii_whitespace() {
                    return Some(i + 2);
                }
            }
        }
    }
    None
}
