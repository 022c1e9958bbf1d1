//! Lossy incremental UTF-8 decoding of transport reads

/// Decodes byte chunks to text without ever failing.
///
/// Invalid sequences become U+FFFD. A multi-byte character cut off at the end
/// of a chunk is held back and completed by the next chunk.
#[derive(Debug, Default)]
pub struct LossyDecoder {
    pending: Vec<u8>,
}

impl LossyDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, prefixed by any bytes held back from the previous call
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut text = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    // `valid_up_to` marks an already validated prefix
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match error.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Flush held-back bytes as replacement text
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Number of bytes waiting for the rest of a character
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_passes_through() {
        let mut decoder = LossyDecoder::new();
        assert_eq!(decoder.decode(b"<2,1,2,3,P>"), "<2,1,2,3,P>");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = LossyDecoder::new();
        let text = decoder.decode(b"<1,\xff50>\xfe");
        assert_eq!(text, "<1,\u{FFFD}50>\u{FFFD}");
    }

    #[test]
    fn split_character_is_completed_by_next_chunk() {
        let degree = "°".as_bytes();
        let mut decoder = LossyDecoder::new();

        assert_eq!(decoder.decode(&[b'a', degree[0]]), "a");
        assert_eq!(decoder.pending(), 1);
        assert_eq!(decoder.decode(&[degree[1], b'b']), "°b");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn finish_flushes_incomplete_tail() {
        let mut decoder = LossyDecoder::new();
        decoder.decode(&[0xE2, 0x82]);
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending(), 0);
    }
}
