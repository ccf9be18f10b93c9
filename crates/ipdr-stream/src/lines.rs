//! Line reassembly across chunk boundaries.
//!
//! Decoded text is appended to a carry-over buffer; everything up to the
//! last newline is emitted as complete lines and the remainder waits for the
//! next chunk. Blank lines are dropped and a trailing `\r` is trimmed.

#[derive(Debug, Default)]
pub struct LineAssembler {
    leftover: String,
}

fn push_line(out: &mut Vec<String>, line: &str) {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if !line.trim().is_empty() {
        out.push(line.to_string());
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete lines available after appending `text`.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.leftover.push_str(text);
        let Some(last_newline) = self.leftover.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.leftover.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.leftover, tail);

        let mut lines = Vec::new();
        for line in complete[..last_newline].split('\n') {
            push_line(&mut lines, line);
        }
        lines
    }

    /// The held-back final line, if any, at end of stream.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.leftover);
        let mut lines = Vec::new();
        push_line(&mut lines, &rest);
        lines
    }

    /// Bytes currently held back.
    pub fn pending_len(&self) -> usize {
        self.leftover.len()
    }
}

/// Non-blank lines of a complete text, as `LineAssembler` would yield them.
pub fn split_complete(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        push_line(&mut lines, line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(text: &str, size: usize) -> Vec<String> {
        let mut assembler = LineAssembler::new();
        let mut lines = Vec::new();
        let bytes = text.as_bytes();
        for chunk in bytes.chunks(size) {
            lines.extend(assembler.push(std::str::from_utf8(chunk).unwrap()));
        }
        lines.extend(assembler.finish());
        lines
    }

    #[test]
    fn lines_split_across_chunks_are_rejoined() {
        let text = "header,a\r\nrow1,x\n\nrow2,y\r\nrow3,z";
        let expected = split_complete(text);
        assert_eq!(expected, vec!["header,a", "row1,x", "row2,y", "row3,z"]);
        for size in 1..=text.len() {
            assert_eq!(assemble(text, size), expected, "chunk size {size}");
        }
    }

    #[test]
    fn partial_line_is_held_back() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assembler.push("abc,de"), Vec::<String>::new());
        assert_eq!(assembler.pending_len(), 6);
        assert_eq!(assembler.push("f\ng"), vec!["abc,def"]);
        assert_eq!(assembler.finish(), vec!["g"]);
        assert_eq!(assembler.pending_len(), 0);
    }
}
