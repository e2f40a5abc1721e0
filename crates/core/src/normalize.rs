//! Raw table cleaning.
//!
//! Turns an untyped table into a [`TransactionSet`] in four passes: date
//! parsing, exact-duplicate removal, missing-field removal and numeric
//! parsing with `total_price` derivation. Rows that fail a pass are dropped
//! and reported through [`NormalizationReport`], never raised. Only a missing
//! column is fatal.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::NormalizeConfig;
use crate::domain::transaction::{Transaction, TransactionSet};
use crate::errors::{ParseWarning, SchemaError, WarningKind};

/// Required input columns, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    TransactionId,
    CustomerId,
    ProductName,
    Region,
    Date,
    Quantity,
    PricePerUnit,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::TransactionId,
        Column::CustomerId,
        Column::ProductName,
        Column::Region,
        Column::Date,
        Column::Quantity,
        Column::PricePerUnit,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::TransactionId => "TransactionID",
            Self::CustomerId => "CustomerID",
            Self::ProductName => "ProductName",
            Self::Region => "Region",
            Self::Date => "Date",
            Self::Quantity => "Quantity",
            Self::PricePerUnit => "PriceperUnit",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

/// Untyped input as handed over by the ingestion side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<H: Into<String>>(headers: impl IntoIterator<Item = H>) -> Self {
        Self {
            headers: headers.into_iter().map(|header| header.into().trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<C: Into<String>>(&mut self, cells: impl IntoIterator<Item = C>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn with_row<C: Into<String>>(mut self, cells: impl IntoIterator<Item = C>) -> Self {
        self.push_row(cells);
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: Column) -> Option<usize> {
        self.headers.iter().position(|header| header == column.header())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub rows_read: usize,
    pub dropped_invalid_date: usize,
    pub dropped_duplicates: usize,
    pub dropped_missing_fields: usize,
    pub dropped_invalid_values: usize,
    pub rows_kept: usize,
    pub warnings: Vec<ParseWarning>,
}

impl NormalizationReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_invalid_date
            + self.dropped_duplicates
            + self.dropped_missing_fields
            + self.dropped_invalid_values
    }

    fn record(&mut self, warning: ParseWarning) {
        match warning.kind {
            WarningKind::InvalidDate => self.dropped_invalid_date += 1,
            WarningKind::Duplicate => self.dropped_duplicates += 1,
            WarningKind::MissingField => self.dropped_missing_fields += 1,
            WarningKind::InvalidValue => self.dropped_invalid_values += 1,
        }
        self.warnings.push(warning);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
    pub records: TransactionSet,
    pub report: NormalizationReport,
}

struct StagedRow {
    row: usize,
    cells: [String; 7],
    date: Option<NaiveDate>,
}

impl StagedRow {
    fn cell(&self, column: Column) -> &str {
        &self.cells[column.position()]
    }
}

#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn normalize(&self, table: &RawTable) -> Result<Normalized, SchemaError> {
        let indices = resolve_columns(table)?;
        let mut report = NormalizationReport { rows_read: table.len(), ..Default::default() };

        let staged = table
            .rows()
            .iter()
            .enumerate()
            .map(|(row, cells)| StagedRow {
                row,
                cells: indices.map(|index| {
                    cells.get(index).map(|cell| cell.trim().to_string()).unwrap_or_default()
                }),
                date: None,
            })
            .collect::<Vec<_>>();

        let dated = self.parse_dates(staged, &mut report);
        let unique = drop_duplicates(dated, &mut report);
        let complete = self.drop_missing(unique, &mut report);
        let records = build_transactions(complete, &mut report);

        report.rows_kept = records.len();
        info!(
            event_name = "engine.normalize.completed",
            rows_read = report.rows_read,
            dropped_invalid_date = report.dropped_invalid_date,
            dropped_duplicates = report.dropped_duplicates,
            dropped_missing_fields = report.dropped_missing_fields,
            dropped_invalid_values = report.dropped_invalid_values,
            rows_kept = report.rows_kept,
            "normalization completed"
        );

        Ok(Normalized { records, report })
    }

    fn parse_dates(&self, rows: Vec<StagedRow>, report: &mut NormalizationReport) -> Vec<StagedRow> {
        let before = report.dropped_invalid_date;
        let kept = rows
            .into_iter()
            .filter_map(|mut staged| {
                let raw = staged.cell(Column::Date);
                if self.config.is_missing(raw) {
                    return Some(staged);
                }
                match NaiveDate::parse_from_str(raw, &self.config.date_format) {
                    Ok(date) => {
                        staged.date = Some(date);
                        Some(staged)
                    }
                    Err(error) => {
                        report.record(ParseWarning {
                            row: staged.row,
                            column: Some(Column::Date.header().to_string()),
                            kind: WarningKind::InvalidDate,
                            detail: format!("`{raw}` does not match `{}`: {error}", self.config.date_format),
                        });
                        None
                    }
                }
            })
            .collect();
        debug!(
            event_name = "engine.normalize.dates",
            dropped = report.dropped_invalid_date - before,
            "date parsing pass finished"
        );
        kept
    }

    fn drop_missing(&self, rows: Vec<StagedRow>, report: &mut NormalizationReport) -> Vec<StagedRow> {
        let before = report.dropped_missing_fields;
        let kept = rows
            .into_iter()
            .filter(|staged| {
                let missing: Vec<&'static str> = Column::ALL
                    .iter()
                    .filter(|column| self.config.is_missing(staged.cell(**column)))
                    .map(|column| column.header())
                    .collect();
                let Some(first) = missing.first() else {
                    return true;
                };
                report.record(ParseWarning {
                    row: staged.row,
                    column: Some((*first).to_string()),
                    kind: WarningKind::MissingField,
                    detail: format!("missing value(s) in {}", missing.join(", ")),
                });
                false
            })
            .collect();
        debug!(
            event_name = "engine.normalize.missing",
            dropped = report.dropped_missing_fields - before,
            "missing field pass finished"
        );
        kept
    }
}

/// Normalizes with the default configuration.
pub fn normalize(table: &RawTable) -> Result<Normalized, SchemaError> {
    Normalizer::default().normalize(table)
}

fn resolve_columns(table: &RawTable) -> Result<[usize; 7], SchemaError> {
    let mut indices = [0; 7];
    let mut missing = Vec::new();

    for column in Column::ALL {
        match table.column_index(column) {
            Some(index) => indices[column.position()] = index,
            None => missing.push(column.header().to_string()),
        }
    }

    if !missing.is_empty() {
        warn!(
            event_name = "engine.normalize.schema_rejected",
            missing_columns = %missing.join(","),
            rows = table.len(),
            "input rejected before normalization"
        );
        return Err(SchemaError::MissingColumns { columns: missing, rows: table.len() });
    }

    Ok(indices)
}

fn drop_duplicates(rows: Vec<StagedRow>, report: &mut NormalizationReport) -> Vec<StagedRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|staged| {
            let mut key = staged.cells.clone();
            if let Some(date) = staged.date {
                key[Column::Date.position()] = date.to_string();
            }
            if seen.contains(&key) {
                report.record(ParseWarning {
                    row: staged.row,
                    column: None,
                    kind: WarningKind::Duplicate,
                    detail: "identical to an earlier row".to_string(),
                });
                return false;
            }
            seen.insert(key);
            true
        })
        .collect()
}

fn build_transactions(rows: Vec<StagedRow>, report: &mut NormalizationReport) -> TransactionSet {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for staged in rows {
        let transaction = match parse_transaction(&staged) {
            Ok(transaction) => transaction,
            Err((column, detail)) => {
                report.record(ParseWarning {
                    row: staged.row,
                    column: column.map(|column| column.header().to_string()),
                    kind: WarningKind::InvalidValue,
                    detail,
                });
                continue;
            }
        };

        // Rows that differ only in numeric spelling ("2.5" vs "2.50") are the
        // same transaction once parsed.
        if seen.contains(&transaction) {
            report.record(ParseWarning {
                row: staged.row,
                column: None,
                kind: WarningKind::Duplicate,
                detail: "identical to an earlier row after parsing".to_string(),
            });
            continue;
        }
        seen.insert(transaction.clone());
        records.push(transaction);
    }

    TransactionSet::from_unique(records)
}

fn parse_transaction(staged: &StagedRow) -> Result<Transaction, (Option<Column>, String)> {
    let date = staged
        .date
        .ok_or_else(|| (Some(Column::Date), "date was not parsed".to_string()))?;
    let quantity = parse_quantity(staged.cell(Column::Quantity))
        .ok_or_else(|| {
            (
                Some(Column::Quantity),
                format!("`{}` is not a positive integer", staged.cell(Column::Quantity)),
            )
        })?;
    let price = Decimal::from_str(staged.cell(Column::PricePerUnit)).map_err(|error| {
        (
            Some(Column::PricePerUnit),
            format!("`{}` is not a decimal: {error}", staged.cell(Column::PricePerUnit)),
        )
    })?;

    Transaction::new(
        staged.cell(Column::TransactionId),
        staged.cell(Column::CustomerId),
        staged.cell(Column::ProductName),
        staged.cell(Column::Region),
        date,
        quantity,
        price,
    )
    .map_err(|error| (None, error.to_string()))
}

/// Accepts integral values written either as `3` or `3.0`.
fn parse_quantity(raw: &str) -> Option<u32> {
    let value = Decimal::from_str(raw).ok()?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_u32().filter(|quantity| *quantity > 0)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{normalize, Normalizer, RawTable};
    use crate::config::NormalizeConfig;
    use crate::errors::{SchemaError, WarningKind};

    const HEADERS: [&str; 7] =
        ["TransactionID", "CustomerID", "ProductName", "Region", "Date", "Quantity", "PriceperUnit"];

    fn table(rows: &[[&str; 7]]) -> RawTable {
        rows.iter().fold(RawTable::new(HEADERS), |table, row| table.with_row(*row))
    }

    #[test]
    fn computes_total_price_for_every_kept_row() {
        let normalized = normalize(&table(&[
            ["T1", "C1", "Milk", "North", "01/15/2024", "3", "1.10"],
            ["T2", "C2", "Bread", "South", "02/01/2024", "2", "2.25"],
        ]))
        .expect("schema is complete");

        assert_eq!(normalized.records.len(), 2);
        for record in &normalized.records {
            assert_eq!(
                record.total_price(),
                Decimal::from(record.quantity()) * record.price_per_unit()
            );
        }
        assert_eq!(
            normalized.records.as_slice()[0].total_price(),
            Decimal::from_str("3.30").expect("decimal")
        );
    }

    #[test]
    fn identical_rows_collapse_to_one_transaction() {
        let row = ["T1", "C1", "Milk", "North", "01/15/2024", "3", "1.10"];
        let normalized = normalize(&table(&[row, row])).expect("schema is complete");

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.report.dropped_duplicates, 1);
        assert_eq!(normalized.report.warnings[0].kind, WarningKind::Duplicate);
        assert_eq!(normalized.report.warnings[0].row, 1);
    }

    #[test]
    fn different_spellings_of_one_date_or_price_are_duplicates() {
        let normalized = normalize(&table(&[
            ["T1", "C1", "Milk", "North", "01/05/2024", "3", "1.10"],
            ["T1", "C1", "Milk", "North", "1/5/2024", "3", "1.10"],
            ["T1", "C1", "Milk", "North", "01/05/2024", "3.0", "1.1"],
        ]))
        .expect("schema is complete");

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.report.dropped_duplicates, 2);
    }

    #[test]
    fn missing_region_column_is_a_schema_error() {
        let table = RawTable::new(["TransactionID", "CustomerID", "ProductName", "Date", "Quantity", "PriceperUnit"])
            .with_row(["T1", "C1", "Milk", "01/15/2024", "3", "1.10"]);

        let error = normalize(&table).expect_err("Region column is absent");
        assert_eq!(
            error,
            SchemaError::MissingColumns { columns: vec!["Region".to_string()], rows: 1 }
        );
    }

    #[test]
    fn column_order_and_extra_columns_do_not_matter() {
        let table = RawTable::new([
            " PriceperUnit ",
            "Notes",
            "Date",
            "Quantity",
            "Region",
            "ProductName",
            "CustomerID",
            "TransactionID",
        ])
        .with_row(["4.00", "gift", "12/31/2023", "2", "West", "Cheese", "C9", "T9"]);

        let normalized = normalize(&table).expect("all required columns exist");
        let record = &normalized.records.as_slice()[0];
        assert_eq!(record.product_name(), "Cheese");
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2023, 12, 31).expect("date"));
        assert_eq!(record.total_price(), Decimal::from(8));
    }

    #[test]
    fn drops_unparseable_dates_and_counts_them() {
        let normalized = normalize(&table(&[
            ["T1", "C1", "Milk", "North", "2024-01-15", "3", "1.10"],
            ["T2", "C1", "Milk", "North", "02/30/2024", "3", "1.10"],
            ["T3", "C1", "Milk", "North", "03/01/2024", "3", "1.10"],
        ]))
        .expect("schema is complete");

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.report.dropped_invalid_date, 2);
        assert!(normalized
            .report
            .warnings
            .iter()
            .all(|warning| warning.column.as_deref() == Some("Date")));
    }

    #[test]
    fn drops_rows_with_missing_values_in_any_column() {
        let normalized = normalize(&table(&[
            ["T1", "", "Milk", "North", "01/15/2024", "3", "1.10"],
            ["T2", "C1", "Milk", "NA", "01/15/2024", "3", "1.10"],
            ["T3", "C1", "Milk", "North", "", "3", "1.10"],
            ["T4", "C1", "Milk", "North", "01/15/2024", "3", "1.10"],
        ]))
        .expect("schema is complete");

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.report.dropped_missing_fields, 3);
        assert_eq!(normalized.report.rows_dropped(), 3);
        assert_eq!(normalized.report.rows_kept, 1);
        assert_eq!(normalized.report.rows_read, 4);
    }

    #[test]
    fn short_rows_count_as_missing_fields() {
        let mut table = table(&[]);
        table.push_row(["T1", "C1", "Milk"]);

        let normalized = normalize(&table).expect("schema is complete");
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.report.dropped_missing_fields, 1);
        assert!(normalized.report.warnings[0].detail.contains("Region"));
    }

    #[test]
    fn drops_invalid_quantities_and_prices() {
        let normalized = normalize(&table(&[
            ["T1", "C1", "Milk", "North", "01/15/2024", "0", "1.10"],
            ["T2", "C1", "Milk", "North", "01/15/2024", "1.5", "1.10"],
            ["T3", "C1", "Milk", "North", "01/15/2024", "two", "1.10"],
            ["T4", "C1", "Milk", "North", "01/15/2024", "1", "-3"],
            ["T5", "C1", "Milk", "North", "01/15/2024", "1", "abc"],
            ["T6", "C1", "Milk", "North", "01/15/2024", "1", "0"],
        ]))
        .expect("schema is complete");

        assert_eq!(normalized.report.dropped_invalid_values, 5);
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records.as_slice()[0].transaction_id().0, "T6");
    }

    #[test]
    fn custom_date_format_and_markers_are_honored() {
        let normalizer = Normalizer::new(NormalizeConfig {
            date_format: "%Y-%m-%d".to_string(),
            missing_markers: vec!["-".to_string()],
        });

        let normalized = normalizer
            .normalize(&table(&[
                ["T1", "C1", "Milk", "North", "2024-01-15", "3", "1.10"],
                ["T2", "C1", "Milk", "-", "2024-01-16", "3", "1.10"],
                ["T3", "C1", "Milk", "NA", "2024-01-17", "3", "1.10"],
            ]))
            .expect("schema is complete");

        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.report.dropped_missing_fields, 1);
    }

    #[test]
    fn empty_table_normalizes_to_empty_set() {
        let normalized = normalize(&table(&[])).expect("schema is complete");
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.report.rows_read, 0);
    }
}
