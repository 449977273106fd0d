//! Stateful UTF-8 decoding across chunk boundaries

const REPLACEMENT: char = '\u{FFFD}';

/// Carries the bytes of a character that is split between two chunks.
///
/// Invalid sequences decode to U+FFFD; an incomplete sequence at the end of a
/// chunk is held until the next one arrives.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> String {
        let joined;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
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
        out
    }

    /// Flushes held bytes at end of input. Returns the replacement text, if any.
    pub(crate) fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(REPLACEMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multibyte_character() {
        let text = "مرحبا";
        let bytes = text.as_bytes();
        let mut decoder = Utf8Decoder::default();
        let mut out = decoder.decode(&bytes[..3]);
        out.push_str(&decoder.decode(&bytes[3..]));
        assert_eq!(out, text);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_byte_at_a_time() {
        let text = "a❤️b🩺";
        let mut decoder = Utf8Decoder::default();
        let out: String = text
            .as_bytes()
            .iter()
            .map(|byte| decoder.decode(std::slice::from_ref(byte)))
            .collect();
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_dangling_bytes_at_finish() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), Some(REPLACEMENT));
        assert_eq!(decoder.finish(), None);
    }
}
