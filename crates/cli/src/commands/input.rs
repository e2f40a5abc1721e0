use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use saleslens_core::RawTable;
use tracing::debug;

/// Reads a headed CSV file into an untyped table. Cells are trimmed and rows
/// may be shorter or longer than the header; the normalizer deals with both.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let file = File::open(path).with_context(|| format!("could not open `{}`", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("could not read header row of `{}`", path.display()))?
        .clone();
    let mut table = RawTable::new(headers.iter());

    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("could not read data row {} of `{}`", index + 1, path.display())
        })?;
        table.push_row(record.iter());
    }

    debug!(
        event_name = "cli.input.loaded",
        path = %path.display(),
        columns = table.headers().len(),
        rows = table.len(),
        "csv input loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::read_table;

    #[test]
    fn trims_cells_and_tolerates_ragged_rows() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, " TransactionID , CustomerID,ProductName").expect("write");
        writeln!(file, " T1 ,C1 , Milk").expect("write");
        writeln!(file, "T2,C2").expect("write");

        let table = read_table(file.path()).expect("readable csv");
        assert_eq!(table.headers(), ["TransactionID", "CustomerID", "ProductName"]);
        assert_eq!(table.rows()[0], vec!["T1", "C1", "Milk"]);
        assert_eq!(table.rows()[1].len(), 2);
    }

    #[test]
    fn missing_file_is_an_error_naming_the_path() {
        let error = read_table(std::path::Path::new("/definitely/not/here.csv"))
            .expect_err("file does not exist");
        assert!(format!("{error:#}").contains("/definitely/not/here.csv"));
    }
}
