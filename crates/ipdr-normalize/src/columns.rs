//! Column-synonym resolution.
//!
//! Operators name the same field differently (`SourceIP`, `src_ip`,
//! `A_Party`, ...). `ColumnSynonyms` lists the accepted spellings per field
//! in priority order; the first spelling with a non-empty value wins.
//!
//! Two row shapes are supported: keyed rows (`RowView`, e.g. JSON objects)
//! and positional rows from delimited files, for which `HeaderLayout`
//! resolves the header once so each row is a plain index lookup.

use std::collections::{BTreeMap, HashMap};

use ipdr_core::config::ColumnSynonyms;

/// Logical fields of a canonical record that come from the source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AParty,
    APort,
    BParty,
    BPort,
    Protocol,
    StartTime,
    EndTime,
    Bytes,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::AParty,
        Field::APort,
        Field::BParty,
        Field::BPort,
        Field::Protocol,
        Field::StartTime,
        Field::EndTime,
        Field::Bytes,
    ];

    fn synonyms(self, columns: &ColumnSynonyms) -> &[String] {
        match self {
            Field::AParty => &columns.a_party,
            Field::APort => &columns.a_port,
            Field::BParty => &columns.b_party,
            Field::BPort => &columns.b_port,
            Field::Protocol => &columns.protocol,
            Field::StartTime => &columns.start_time,
            Field::EndTime => &columns.end_time,
            Field::Bytes => &columns.bytes,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Raw, trimmed string values of every logical field for one row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawFields<'a> {
    values: [Option<&'a str>; 8],
}

impl<'a> RawFields<'a> {
    pub fn get(&self, field: Field) -> Option<&'a str> {
        self.values[field.slot()]
    }

    fn set(&mut self, field: Field, value: Option<&'a str>) {
        self.values[field.slot()] = value;
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// A row addressed by column name.
pub trait RowView {
    fn column(&self, name: &str) -> Option<&str>;
}

impl RowView for HashMap<String, String> {
    fn column(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RowView for BTreeMap<String, String> {
    fn column(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Resolve every field of a keyed row.
pub fn resolve_keyed<'a, R: RowView + ?Sized>(row: &'a R, columns: &ColumnSynonyms) -> RawFields<'a> {
    let mut fields = RawFields::default();
    for field in Field::ALL {
        let value = field
            .synonyms(columns)
            .iter()
            .find_map(|name| row.column(name).and_then(non_empty));
        fields.set(field, value);
    }
    fields
}

/// Per-field candidate column positions of a delimited header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    positions: [Vec<usize>; 8],
    width: usize,
}

impl HeaderLayout {
    /// Map each field to the header positions of its synonyms, in synonym
    /// priority order.
    pub fn new<S: AsRef<str>>(header: &[S], columns: &ColumnSynonyms) -> Self {
        let cleaned: Vec<&str> = header
            .iter()
            .map(|h| h.as_ref().trim_start_matches('\u{feff}').trim())
            .collect();

        let positions = Field::ALL.map(|field| {
            field
                .synonyms(columns)
                .iter()
                .flat_map(|name| {
                    cleaned
                        .iter()
                        .enumerate()
                        .filter(move |(_, h)| *h == name)
                        .map(|(i, _)| i)
                })
                .collect::<Vec<usize>>()
        });

        Self {
            positions,
            width: cleaned.len(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// True when both party columns were found in the header.
    pub fn has_parties(&self) -> bool {
        !self.positions[Field::AParty.slot()].is_empty()
            && !self.positions[Field::BParty.slot()].is_empty()
    }

    /// Resolve every field of a positional row.
    pub fn resolve<'a, S: AsRef<str>>(&self, row: &'a [S]) -> RawFields<'a> {
        let mut fields = RawFields::default();
        for field in Field::ALL {
            let value = self.positions[field.slot()]
                .iter()
                .find_map(|&i| row.get(i).and_then(|v| non_empty(v.as_ref())));
            fields.set(field, value);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(line: &str) -> Vec<String> {
        line.split(',').map(str::to_string).collect()
    }

    #[test]
    fn layout_resolves_primary_spellings() {
        let columns = ColumnSynonyms::default();
        let layout = HeaderLayout::new(
            &header("SourceIP,SourcePort,DestinationIP,DestinationPort,Protocol,StartTime,EndTime,Bytes"),
            &columns,
        );
        assert!(layout.has_parties());
        assert_eq!(layout.width(), 8);

        let row = header("10.0.0.1,5050,8.8.8.8,53,udp,a,b,12");
        let fields = layout.resolve(&row);
        assert_eq!(fields.get(Field::AParty), Some("10.0.0.1"));
        assert_eq!(fields.get(Field::BPort), Some("53"));
        assert_eq!(fields.get(Field::Bytes), Some("12"));
    }

    #[test]
    fn layout_falls_back_to_later_synonym_when_value_is_empty() {
        let columns = ColumnSynonyms::default();
        let layout = HeaderLayout::new(&header("SourceIP,src_ip,dst_ip"), &columns);
        let record = header(" ,192.168.1.9,1.1.1.1");
        let fields = layout.resolve(&record);
        assert_eq!(fields.get(Field::AParty), Some("192.168.1.9"));
        assert_eq!(fields.get(Field::BParty), Some("1.1.1.1"));
    }

    #[test]
    fn layout_strips_bom_and_whitespace_from_header() {
        let columns = ColumnSynonyms::default();
        let layout = HeaderLayout::new(&header("\u{feff}SourceIP , DestinationIP"), &columns);
        assert!(layout.has_parties());
    }

    #[test]
    fn short_rows_resolve_missing_fields_to_none() {
        let columns = ColumnSynonyms::default();
        let layout = HeaderLayout::new(&header("SourceIP,DestinationIP,Bytes"), &columns);
        let record = header("10.0.0.1");
        let fields = layout.resolve(&record);
        assert_eq!(fields.get(Field::AParty), Some("10.0.0.1"));
        assert_eq!(fields.get(Field::BParty), None);
        assert_eq!(fields.get(Field::Bytes), None);
    }

    #[test]
    fn keyed_rows_use_first_non_empty_synonym() {
        let columns = ColumnSynonyms::default();
        let mut row = HashMap::new();
        row.insert("SrcIP".to_string(), "".to_string());
        row.insert("source_ip".to_string(), "172.16.0.4".to_string());
        row.insert("B_Party".to_string(), " 9.9.9.9 ".to_string());

        let fields = resolve_keyed(&row, &columns);
        assert_eq!(fields.get(Field::AParty), Some("172.16.0.4"));
        assert_eq!(fields.get(Field::BParty), Some("9.9.9.9"));
        assert_eq!(fields.get(Field::Protocol), None);
    }
}
