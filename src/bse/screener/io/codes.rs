use std::collections::HashSet;
use std::fs;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::bse::screener::error::{Result, ScreenerError};
use crate::bse::screener::model::{BSE_CODE_DIGITS, EntityId, is_bse_code};

/// Marker preceding the scrip code in the exchange description list.
pub const BOM_DELIMITER: &str = "|BOM";

/// Extracts scrip codes from the exchange description list. Each line that
/// contains [`BOM_DELIMITER`] contributes the text after it when that text is
/// a six digit code. Order is kept and duplicates are dropped.
pub fn parse_stock_list(text: &str) -> Vec<EntityId> {
    let mut codes = CodeSet::default();
    for line in text.lines() {
        let Some(candidate) = line.split(BOM_DELIMITER).nth(1) else {
            continue;
        };
        codes.push_text(candidate);
    }
    codes.into_vec()
}

/// Reads scrip codes from an equity listing. The first row is a header and
/// `column` is zero-based. `.csv` and `.xlsx` files are read as tables; any
/// other file is treated as the exchange description list.
pub fn read_codes(path: &Path, column: usize) -> Result<Vec<EntityId>> {
    if !path.exists() {
        return Err(ScreenerError::MissingInput(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let codes = match extension.as_deref() {
        Some("csv") => read_csv_codes(path, column)?,
        Some("xlsx") => read_xlsx_codes(path, column)?,
        _ => parse_stock_list(&fs::read_to_string(path)?),
    };
    debug!(code_count = codes.len(), path = %path.display(), "read stock codes");
    Ok(codes)
}

fn read_csv_codes(path: &Path, column: usize) -> Result<Vec<EntityId>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header_width = reader.headers()?.len();
    if column >= header_width {
        return Err(ScreenerError::InvalidStockList(format!(
            "column {column} not present; header has {header_width} columns"
        )));
    }

    let mut codes = CodeSet::default();
    for record in reader.records() {
        let record = record?;
        if let Some(field) = record.get(column) {
            codes.push_text(field);
        }
    }
    Ok(codes.into_vec())
}

fn read_xlsx_codes(path: &Path, column: usize) -> Result<Vec<EntityId>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScreenerError::InvalidStockList("workbook has no sheets".into()))?
        .map_err(ScreenerError::from)?;

    let mut codes = CodeSet::default();
    for row in range.rows().skip(1) {
        match row.get(column) {
            Some(DataType::Float(value)) => codes.push_number(*value),
            Some(DataType::Int(value)) => codes.push_number(*value as f64),
            Some(DataType::String(value)) => codes.push_text(value),
            _ => {}
        }
    }
    Ok(codes.into_vec())
}

#[derive(Default)]
struct CodeSet {
    seen: HashSet<String>,
    ordered: Vec<EntityId>,
}

impl CodeSet {
    fn push_text(&mut self, raw: &str) {
        let candidate = raw.trim();
        if is_bse_code(candidate) {
            self.accept(candidate.to_string());
        } else {
            debug!(value = candidate, "ignoring value that is not a scrip code");
        }
    }

    // Spreadsheet cells lose leading zeros; pad them back.
    fn push_number(&mut self, value: f64) {
        let limit = 10f64.powi(BSE_CODE_DIGITS as i32);
        if value.fract() == 0.0 && value >= 0.0 && value < limit {
            self.accept(format!("{:0width$}", value as u64, width = BSE_CODE_DIGITS));
        } else {
            debug!(value, "ignoring numeric cell that is not a scrip code");
        }
    }

    fn accept(&mut self, code: String) {
        if self.seen.insert(code.clone()) {
            self.ordered.push(EntityId::new(code));
        }
    }

    fn into_vec(self) -> Vec<EntityId> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ids(codes: &[EntityId]) -> Vec<&str> {
        codes.iter().map(EntityId::as_str).collect()
    }

    #[test]
    fn description_list_keeps_six_digit_codes() {
        let text = "Reliance Industries|BOM500325\n\
                    Header line without marker\n\
                    Short code|BOM5003\n\
                    Tata Steel|BOM500470\n\
                    Reliance duplicate|BOM500325\n\
                    Letters|BOM50A470";
        assert_eq!(ids(&parse_stock_list(text)), vec!["500325", "500470"]);
    }

    #[test]
    fn csv_listing_reads_configured_column() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temporary csv");
        writeln!(file, "Security Code,Issuer Name,Security Id").expect("header written");
        writeln!(file, "500325,Reliance Industries Ltd,RELIANCE").expect("row written");
        writeln!(file, " 500470 ,Tata Steel Ltd,TATASTEEL").expect("row written");
        writeln!(file, "n/a,Broken,BROKEN").expect("row written");

        let codes = read_codes(file.path(), 0).expect("codes read");
        assert_eq!(ids(&codes), vec!["500325", "500470"]);
    }

    #[test]
    fn csv_column_outside_header_is_an_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temporary csv");
        writeln!(file, "Security Code").expect("header written");
        writeln!(file, "500325").expect("row written");

        let error = read_codes(file.path(), 3).expect_err("column rejected");
        assert!(matches!(error, ScreenerError::InvalidStockList(_)));
    }

    #[test]
    fn numeric_cells_are_zero_padded() {
        let mut codes = CodeSet::default();
        codes.push_number(532540.0);
        codes.push_number(12345.0);
        codes.push_number(1234567.0);
        codes.push_number(5.5);
        assert_eq!(ids(&codes.into_vec()), vec!["532540", "012345"]);
    }
}
