//! Splitting of single delimited lines into fields.
//!
//! Lines are split one at a time so the result never depends on how the
//! stream was chunked: an unbalanced quote affects only its own line.
//! Parsing runs on `csv_core`, reusing one set of buffers per worker batch.

use csv_core::{ReadRecordResult, Reader, ReaderBuilder};

use crate::detector::Delimiter;

const INITIAL_OUTPUT: usize = 1024;
const INITIAL_FIELDS: usize = 32;

/// Field splitter configuration for one delimiter.
#[derive(Debug, Clone)]
pub struct LineSplitter {
    reader: Reader,
    delimiter: Delimiter,
}

impl LineSplitter {
    pub fn new(delimiter: Delimiter) -> Self {
        let reader = ReaderBuilder::new().delimiter(delimiter.as_byte()).build();
        Self { reader, delimiter }
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// A parser that keeps its buffers between lines. One per worker.
    pub fn parser(&self) -> FieldParser {
        FieldParser {
            reader: self.reader.clone(),
            output: vec![0; INITIAL_OUTPUT],
            ends: vec![0; INITIAL_FIELDS],
        }
    }

    /// Fields of `line`, honouring double-quoted fields.
    pub fn split(&self, line: &str) -> Vec<String> {
        self.parser().parse(line)
    }
}

/// Stateful line parser with reusable output and field-boundary buffers.
#[derive(Debug)]
pub struct FieldParser {
    reader: Reader,
    output: Vec<u8>,
    ends: Vec<usize>,
}

impl FieldParser {
    /// Trimmed fields of the first record in `line`; empty for an empty line.
    ///
    /// Invalid UTF-8 inside a field is replaced rather than rejected.
    pub fn parse(&mut self, line: &str) -> Vec<String> {
        self.reader.reset();
        let mut input = line.as_bytes();
        let mut out_len = 0;
        let mut end_len = 0;

        // An empty input slice tells csv_core the line is over.
        loop {
            let (result, read, written, ended) = self.reader.read_record(
                input,
                &mut self.output[out_len..],
                &mut self.ends[end_len..],
            );
            input = &input[read..];
            out_len += written;
            end_len += ended;
            match result {
                ReadRecordResult::InputEmpty => {}
                ReadRecordResult::OutputFull => {
                    let grown = self.output.len() * 2;
                    self.output.resize(grown, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let grown = self.ends.len() * 2;
                    self.ends.resize(grown, 0);
                }
                ReadRecordResult::Record => break,
                ReadRecordResult::End => return Vec::new(),
            }
        }

        let mut start = 0;
        self.ends[..end_len]
            .iter()
            .map(|&end| {
                let field = String::from_utf8_lossy(&self.output[start..end]).trim().to_string();
                start = end;
                field
            })
            .collect()
    }
}
