use std::io::Read;

use anyhow::Result;
use serde::de::DeserializeOwned;

/// Failures that stop a feed from loading at all. Everything else about a malformed row is
/// recovered locally.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LoadError {
    #[error("{table} is missing required column {column}")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("feed has no {table}")]
    MissingTable { table: &'static str },
}

/// Reads every row of a header-driven table. Column order doesn't matter, headers are matched
/// case-insensitively, and required columns are checked up front. Rows that can't be decoded at
/// all are skipped with a warning.
pub fn read_rows<R: Read, T: DeserializeOwned>(
    table: &'static str,
    reader: R,
    required: &[&'static str],
) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn { table, column }.into());
        }
    }
    rdr.set_headers(headers);

    let mut rows = Vec::new();
    let mut skipped = 0;
    for rec in rdr.deserialize() {
        match rec {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                debug!("{table}: skipping row: {err}");
            }
        }
    }
    if skipped > 0 {
        warn!("{table}: skipped {skipped} undecodable rows");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default)]
        a: Option<String>,
        #[serde(default, deserialize_with = "csv::invalid_option")]
        b: Option<f64>,
    }

    #[test]
    fn headers_are_case_insensitive_and_reorderable() {
        let input = "\u{feff}B , A\n 1.5 , x\nnope,y\n";
        let rows: Vec<Row> = read_rows("test.txt", input.as_bytes(), &["a", "b"]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].a.as_deref(), Some("x"));
        assert_eq!(rows[0].b, Some(1.5));
        assert_eq!(rows[1].b, None);
    }

    #[test]
    fn missing_required_column() {
        let err = read_rows::<_, Row>("test.txt", "a\n1\n".as_bytes(), &["a", "b"]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MissingColumn {
                table: "test.txt",
                column: "b"
            })
        );
    }

    #[test]
    fn short_rows_leave_optional_columns_empty() {
        let rows: Vec<Row> = read_rows("test.txt", "a,b\nx\n".as_bytes(), &["a"]).unwrap();
        assert_eq!(rows[0].a.as_deref(), Some("x"));
        assert_eq!(rows[0].b, None);
    }
}
