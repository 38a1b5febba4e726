/// Incremental UTF-8 decoding across read boundaries.
///
/// Bytes of a multi-byte character split between two reads are carried
/// over to the next call. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.carry);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            self.carry = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush carried bytes of an unfinished character.
    pub fn finish(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&carry).into_owned()
    }
}

/// Rebuilds complete lines from arbitrarily split output chunks.
///
/// `\n`, `\r\n` and a lone `\r` all terminate a line. A `\r` that ends a
/// chunk is remembered so that a `\n` opening the next chunk is not
/// reported as an extra empty line. The result is independent of where
/// the input was split.
#[derive(Debug, Default)]
pub struct LineReconstructor {
    pending: String,
    pending_cr: bool,
    decoder: Utf8Decoder,
}

impl LineReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text; returns the lines completed by it, without terminators.
    pub fn on_text_available(&mut self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for c in text.chars() {
            match c {
                '\n' if self.pending_cr => self.pending_cr = false,
                '\n' | '\r' => {
                    self.pending_cr = c == '\r';
                    lines.push(std::mem::take(&mut self.pending));
                }
                _ => {
                    self.pending_cr = false;
                    self.pending.push(c);
                }
            }
        }
        lines
    }

    /// Feed raw bytes, decoding UTF-8 across calls.
    pub fn on_bytes_available(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(bytes);
        self.on_text_available(&text)
    }

    /// Text after the last terminator, e.g. a prompt awaiting input.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// End of stream: the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.decoder.finish();
        if !tail.is_empty() {
            self.on_text_available(&tail);
        }
        self.pending_cr = false;
        let rest = std::mem::take(&mut self.pending);
        (!rest.is_empty()).then_some(rest)
    }
}
