//! Decoded tables
//!
//! Parquet files are decoded row by row through the `parquet` record API into
//! scalar rows. Column types are whatever the file carries.

use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;

use super::errors::{ExecutorError, ExecutorResult};
use crate::planner::{Scalar, TableName};

/// An in-memory table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: TableName,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Build a table from literal rows
    pub fn from_rows(name: TableName, columns: &[&str], rows: Vec<Vec<Scalar>>) -> Self {
        Self {
            name,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Decode a Parquet file
    pub fn read_parquet(name: TableName, path: &Path) -> ExecutorResult<Self> {
        let file = File::open(path).map_err(|e| ExecutorError::table_read(name, e))?;
        let reader =
            SerializedFileReader::new(file).map_err(|e| ExecutorError::table_read(name, e))?;

        let metadata = reader.metadata().file_metadata();
        let columns: Vec<String> = metadata
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        let mut rows = Vec::with_capacity(metadata.num_rows().max(0) as usize);
        let iter = reader
            .get_row_iter(None)
            .map_err(|e| ExecutorError::table_read(name, e))?;
        for row in iter {
            let row = row.map_err(|e| ExecutorError::table_read(name, e))?;
            let mut values = vec![Scalar::Null; columns.len()];
            for (slot, (_, field)) in values.iter_mut().zip(row.get_column_iter()) {
                *slot = field_to_scalar(field);
            }
            rows.push(values);
        }

        Ok(Self { name, columns, rows })
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn field_to_scalar(field: &Field) -> Scalar {
    match field {
        Field::Null => Scalar::Null,
        Field::Bool(b) => Scalar::Bool(*b),
        Field::Byte(v) => Scalar::Int(*v as i64),
        Field::Short(v) => Scalar::Int(*v as i64),
        Field::Int(v) => Scalar::Int(*v as i64),
        Field::Long(v) => Scalar::Int(*v),
        Field::UByte(v) => Scalar::Int(*v as i64),
        Field::UShort(v) => Scalar::Int(*v as i64),
        Field::UInt(v) => Scalar::Int(*v as i64),
        Field::ULong(v) => i64::try_from(*v).map_or(Scalar::Float(*v as f64), Scalar::Int),
        Field::Float(v) => Scalar::Float(*v as f64),
        Field::Double(v) => Scalar::Float(*v),
        Field::Str(s) => Scalar::Str(s.clone()),
        Field::Bytes(b) => Scalar::Str(String::from_utf8_lossy(b.data()).into_owned()),
        other => Scalar::Str(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversion() {
        assert_eq!(field_to_scalar(&Field::Null), Scalar::Null);
        assert_eq!(field_to_scalar(&Field::Int(2022)), Scalar::Int(2022));
        assert_eq!(field_to_scalar(&Field::Str("TX".into())), Scalar::str("TX"));
        assert_eq!(field_to_scalar(&Field::Double(1.5)), Scalar::Float(1.5));
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/ghg.parquet");
        let result = Table::read_parquet(TableName::Facilities, path);
        assert!(matches!(result, Err(ExecutorError::TableRead { .. })));
    }

    #[test]
    fn test_not_parquet() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.parquet");
        std::fs::write(&path, b"not parquet").unwrap();
        assert!(Table::read_parquet(TableName::DimSector, &path).is_err());
    }
}
