//! In-memory tabular artifact passed between nodes.

use std::{io::Read, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{Result, TabflowError};

/// Artifacts are shared between a producer and all of its dependents.
pub type Artifact = Arc<Table>;

/// Column names plus rows of string cells.
///
/// Cells stay strings: column types are never inferred, transforms parse
/// numbers where their options say they should.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Where the column names of a CSV file come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// first row
    Infer,
    /// no header row, columns are named `0..n`
    None,
    /// the given 0-based row, rows above it are discarded
    Row(usize),
}

impl FromStr for Header {
    type Err = TabflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "infer" | "" => Ok(Header::Infer),
            "none" => Ok(Header::None),
            other => other
                .parse::<usize>()
                .map(Header::Row)
                .map_err(|_| TabflowError::Convert(format!("header must be 'infer', 'none' or a row number, got '{}'", other))),
        }
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(
        columns: &[&str],
        rows: &[&[&str]],
    ) -> Result<Self> {
        let mut table = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|c| c.to_string()).collect())?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn push_row(
        &mut self,
        row: Vec<String>,
    ) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TabflowError::Convert(format!("row has {} cells, table has {} columns", row.len(), self.columns.len())));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(
        &self,
        name: &str,
    ) -> Result<usize> {
        self.columns.iter().position(|c| c == name).ok_or_else(|| TabflowError::Convert(format!("column '{}' not found", name)))
    }

    /// Cells of one column, top to bottom.
    pub fn column(
        &self,
        name: &str,
    ) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Parse delimited text. Short rows are padded with empty cells, rows
    /// longer than the header are rejected.
    pub fn from_csv<R: Read>(
        reader: R,
        sep: u8,
        header: Header,
    ) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().delimiter(sep).has_headers(false).flexible(true).from_reader(reader);

        let mut records: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            records.push(record.iter().map(|c| c.to_string()).collect());
        }

        let (columns, body): (Vec<String>, Vec<Vec<String>>) = match header {
            Header::None => {
                let width = records.iter().map(|r| r.len()).max().unwrap_or(0);
                ((0..width).map(|i| i.to_string()).collect(), records)
            }
            Header::Infer => Self::split_header(records, 0)?,
            Header::Row(n) => Self::split_header(records, n)?,
        };

        let mut table = Self::new(columns);
        for (line, mut row) in body.into_iter().enumerate() {
            if row.len() > table.num_columns() {
                return Err(TabflowError::Convert(format!(
                    "data row {} has {} fields, expected {}",
                    line + 1,
                    row.len(),
                    table.num_columns()
                )));
            }
            row.resize(table.num_columns(), String::new());
            table.rows.push(row);
        }
        Ok(table)
    }

    fn split_header(
        mut records: Vec<Vec<String>>,
        row: usize,
    ) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        if row >= records.len() {
            return Err(TabflowError::Convert(format!("header row {} is past the end of the data ({} rows)", row, records.len())));
        }
        let body = records.split_off(row + 1);
        let columns = records.pop().unwrap_or_default();
        Ok((columns, body))
    }

    /// Render as delimited text; with `index` a leading row-number column is written.
    pub fn to_csv(
        &self,
        sep: u8,
        index: bool,
    ) -> Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new().delimiter(sep).from_writer(Vec::new());

        let mut header: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
        if index {
            header.push("");
        }
        header.extend(self.columns.iter().map(|c| c.as_str()));
        wtr.write_record(&header)?;

        for (i, row) in self.rows.iter().enumerate() {
            if index {
                let mut record = vec![i.to_string()];
                record.extend(row.iter().cloned());
                wtr.write_record(&record)?;
            } else {
                wtr.write_record(row)?;
            }
        }

        wtr.into_inner().map_err(|e| TabflowError::IoError(e.to_string()))
    }
}

/// Single-byte delimiter from an option value.
pub fn delimiter(sep: &str) -> Result<u8> {
    match sep {
        "\\t" => Ok(b'\t'),
        s if s.len() == 1 => Ok(s.as_bytes()[0]),
        s => Err(TabflowError::Convert(format!("delimiter must be a single byte, got '{}'", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "name,region,sales\nann,emea,10\nbob,apac,20\n";

    #[test]
    fn test_from_csv_infer_header() {
        let table = Table::from_csv(CSV.as_bytes(), b',', Header::Infer).unwrap();
        assert_eq!(table.columns(), &["name", "region", "sales"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("sales").unwrap(), vec!["10", "20"]);
    }

    #[test]
    fn test_from_csv_no_header() {
        let table = Table::from_csv("1;2\n3;4\n".as_bytes(), b';', Header::None).unwrap();
        assert_eq!(table.columns(), &["0", "1"]);
        assert_eq!(table.rows()[1], vec!["3", "4"]);
    }

    #[test]
    fn test_from_csv_header_row() {
        let data = "generated by tool\nid,value\n1,a\n";
        let table = Table::from_csv(data.as_bytes(), b',', Header::Row(1)).unwrap();
        assert_eq!(table.columns(), &["id", "value"]);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_from_csv_pads_short_rows_and_rejects_long() {
        let table = Table::from_csv("a,b,c\n1,2\n".as_bytes(), b',', Header::Infer).unwrap();
        assert_eq!(table.rows()[0], vec!["1", "2", ""]);

        assert!(Table::from_csv("a,b\n1,2,3\n".as_bytes(), b',', Header::Infer).is_err());
    }

    #[test]
    fn test_header_past_end() {
        assert!(Table::from_csv("".as_bytes(), b',', Header::Infer).is_err());
    }

    #[test]
    fn test_to_csv_with_index() {
        let table = Table::from_rows(&["a", "b"], &[&["1", "x"], &["2", "y"]]).unwrap();
        let out = String::from_utf8(table.to_csv(b',', true).unwrap()).unwrap();
        assert_eq!(out, ",a,b\n0,1,x\n1,2,y\n");

        let out = String::from_utf8(table.to_csv(b'|', false).unwrap()).unwrap();
        assert_eq!(out, "a|b\n1|x\n2|y\n");
    }

    #[test]
    fn test_header_parse() {
        assert_eq!("infer".parse::<Header>().unwrap(), Header::Infer);
        assert_eq!("none".parse::<Header>().unwrap(), Header::None);
        assert_eq!("2".parse::<Header>().unwrap(), Header::Row(2));
        assert!("first".parse::<Header>().is_err());
    }

    #[test]
    fn test_delimiter() {
        assert_eq!(delimiter(",").unwrap(), b',');
        assert_eq!(delimiter("\\t").unwrap(), b'\t');
        assert!(delimiter(",,").is_err());
    }

    #[test]
    fn test_push_row_width_mismatch() {
        let mut table = Table::new(vec!["a".to_string()]);
        assert!(table.push_row(vec!["1".to_string(), "2".to_string()]).is_err());
    }
}
