//! Delimiter and file-format detection.

use std::path::Path;

/// Field separator of a delimited IPDR file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// How a file's content is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Json,
}

/// Tab when the header holds more tabs than commas, comma otherwise.
///
/// Ties, including a header with neither, resolve to comma.
pub fn detect_delimiter(header: &str) -> Delimiter {
    let tabs = header.bytes().filter(|b| *b == b'\t').count();
    let commas = header.bytes().filter(|b| *b == b',').count();
    if tabs > commas {
        Delimiter::Tab
    } else {
        Delimiter::Comma
    }
}

/// `.json` (any case) is JSON; every other or missing extension is delimited.
pub fn detect_format(filename: &str) -> FileFormat {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Delimited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_wins_when_it_outnumbers_commas() {
        assert_eq!(detect_delimiter("a\tb\tc"), Delimiter::Tab);
        assert_eq!(detect_delimiter("a,b\tc\td"), Delimiter::Tab);
    }

    #[test]
    fn comma_wins_majority_and_ties() {
        assert_eq!(detect_delimiter("a,b,c"), Delimiter::Comma);
        assert_eq!(detect_delimiter("a,b\tc"), Delimiter::Comma);
        assert_eq!(detect_delimiter("single"), Delimiter::Comma);
        assert_eq!(detect_delimiter(""), Delimiter::Comma);
    }

    #[test]
    fn format_routes_on_extension() {
        assert_eq!(detect_format("records.json"), FileFormat::Json);
        assert_eq!(detect_format("RECORDS.JSON"), FileFormat::Json);
        assert_eq!(detect_format("jio_ipdr.csv"), FileFormat::Delimited);
        assert_eq!(detect_format("airtel.tsv"), FileFormat::Delimited);
        assert_eq!(detect_format("dump.xlsx"), FileFormat::Delimited);
        assert_eq!(detect_format("no_extension"), FileFormat::Delimited);
    }
}
