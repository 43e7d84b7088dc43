use crate::error::{FiberPrepError, Result};
use dbase::{FieldName, FieldValue, Reader, Record, TableWriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// A shapefile attribute table (`.dbf`) loaded into memory for editing.
///
/// New fields are registered first, record values are mutated in place, and
/// `save` rewrites the whole table: the source schema is copied, the pending
/// fields are appended, and the rewritten file replaces the original. The
/// sibling geometry and index files are untouched because record order and
/// count never change.
#[derive(Debug)]
pub struct AttributeTable {
    path: PathBuf,
    records: Vec<Record>,
    pending: Vec<PendingField>,
}

#[derive(Debug)]
enum PendingField {
    Character { name: String, width: u8 },
    Numeric { name: String, width: u8, decimals: u8 },
}

impl AttributeTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut reader = Reader::from_path(&path).map_err(|e| table_error(&path, e))?;
        let records = reader.read().map_err(|e| table_error(&path, e))?;

        Ok(Self {
            path,
            records,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Register a new character field to be added on save. Values must be
    /// inserted into each record before saving.
    pub fn add_character_field(&mut self, name: &str, width: u8) {
        self.pending.push(PendingField::Character {
            name: name.to_string(),
            width,
        });
    }

    pub fn add_numeric_field(&mut self, name: &str, width: u8, decimals: u8) {
        self.pending.push(PendingField::Numeric {
            name: name.to_string(),
            width,
            decimals,
        });
    }

    /// Rewrite the table with the source schema plus any pending fields.
    pub fn save(&mut self) -> Result<()> {
        let source_reader = Reader::from_path(&self.path).map_err(|e| table_error(&self.path, e))?;
        let mut builder = TableWriterBuilder::from_reader(source_reader);

        for field in &self.pending {
            builder = match field {
                PendingField::Character { name, width } => {
                    builder.add_character_field(parse_field_name(name)?, *width)
                }
                PendingField::Numeric {
                    name,
                    width,
                    decimals,
                } => builder.add_numeric_field(parse_field_name(name)?, *width, *decimals),
            };
        }

        let tmp_path = self.path.with_extension("dbf.tmp");

        let writer = builder
            .build_with_file_dest(&tmp_path)
            .map_err(|e| table_error(&tmp_path, e))?;

        writer
            .write_records(&self.records)
            .map_err(|e| table_error(&tmp_path, e))?;

        fs::remove_file(&self.path)?;
        fs::rename(&tmp_path, &self.path)?;

        self.pending.clear();

        Ok(())
    }
}

/// A character value read defensively: absent fields, null values and
/// non-character types all come back as `None`.
pub fn character_value(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(value))) => Some(value.clone()),
        _ => None,
    }
}

pub fn numeric_value(record: &Record, field: &str) -> Option<f64> {
    match record.get(field) {
        Some(FieldValue::Numeric(Some(value))) => Some(*value),
        _ => None,
    }
}

fn parse_field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|_| FiberPrepError::Config {
        message: format!("Invalid attribute field name '{}'", name),
    })
}

fn table_error(path: &Path, source: dbase::Error) -> FiberPrepError {
    FiberPrepError::Table {
        path: path.display().to_string(),
        source,
    }
}
