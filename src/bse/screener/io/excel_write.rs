use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::bse::screener::error::Result;
use crate::bse::screener::flatten::{EntityFailure, FlattenedTable};
use crate::bse::screener::model::Scalar;
use crate::bse::screener::screen::{STOCK_COLUMNS, ScreenReport};

/// Sheet holding the flattened company data.
pub const DATA_SHEET: &str = "Data";
/// Sheet listing entities that were left out, written only when non-empty.
pub const FAILURES_SHEET: &str = "Failures";
/// Sheet holding one row per screened stock.
pub const SCREEN_SHEET: &str = "Screen";
/// Sheet holding missing-value counters of a screening run.
pub const MISSING_SHEET: &str = "Missing";
/// Header of the entity identifier column.
pub const CODE_HEADER: &str = "code";

/// Writes a flattened table. The header grid takes the first rows, one per
/// tree depth, with the entity code in column 0; data rows follow.
pub fn write_flattened(path: &Path, table: &FlattenedTable) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(DATA_SHEET)?;

    let grid = table.layout.grid();
    let header_rows = grid.row_count().max(1);
    worksheet.write_string_with_format(0, 0, CODE_HEADER, &header_format)?;
    for (row_idx, labels) in grid.rows().iter().enumerate() {
        for (col_idx, label) in labels.iter().enumerate() {
            if let Some(label) = label {
                worksheet.write_string_with_format(
                    row_idx as u32,
                    (col_idx + 1) as u16,
                    *label,
                    &header_format,
                )?;
            }
        }
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = (header_rows + row_idx) as u32;
        worksheet.write_string(excel_row, 0, row.entity.as_str())?;
        for (col_idx, cell) in row.cells.iter().enumerate() {
            write_cell(worksheet, excel_row, (col_idx + 1) as u16, cell)?;
        }
    }
    worksheet.set_freeze_panes(header_rows as u32, 1)?;

    if !table.failures.is_empty() {
        write_failures(&mut workbook_writer, &table.failures)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}

/// Writes a screening report: one row per stock plus the missing-value
/// summary.
pub fn write_screen(path: &Path, report: &ScreenReport) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    let rows: Vec<Vec<Option<Scalar>>> = report.items.iter().map(|item| item.cells()).collect();
    write_table(&mut workbook_writer, SCREEN_SHEET, &STOCK_COLUMNS, &rows)?;

    let stats = &report.stats;
    let mut summary: Vec<Vec<Option<Scalar>>> = STOCK_COLUMNS
        .iter()
        .zip(stats.per_field.iter())
        .map(|(column, missing)| vec![text(column), count(*missing)])
        .collect();
    summary.push(vec![text("TOTAL COMPANIES"), count(stats.total_companies)]);
    summary.push(vec![
        text("COMPANIES WITH MISSING INFO"),
        count(stats.companies_with_missing_info),
    ]);
    summary.push(vec![text("MISSING FIELDS"), count(stats.missing_fields)]);
    write_table(&mut workbook_writer, MISSING_SHEET, &["field", "missing"], &summary)?;

    if !report.failures.is_empty() {
        write_failures(&mut workbook_writer, &report.failures)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}

fn write_failures(workbook_writer: &mut Workbook, failures: &[EntityFailure]) -> Result<()> {
    let rows: Vec<Vec<Option<Scalar>>> = failures
        .iter()
        .map(|failure| vec![text(failure.entity.as_str()), text(&failure.message)])
        .collect();
    write_table(workbook_writer, FAILURES_SHEET, &[CODE_HEADER, "error"], &rows)
}

fn write_table(
    workbook_writer: &mut Workbook,
    sheet_name: &str,
    columns: &[&str],
    rows: &[Vec<Option<Scalar>>],
) -> Result<()> {
    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col_idx, header) in columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, (row_idx + 1) as u32, col_idx as u16, cell)?;
        }
    }

    let mut excel_table = rust_xlsxwriter::Table::new();
    excel_table.set_autofilter(true);

    let col_end = (columns.len() as u16).saturating_sub(1);
    let row_end = if rows.is_empty() { 1 } else { rows.len() as u32 };
    worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Option<Scalar>) -> Result<()> {
    match cell {
        Some(Scalar::String(value)) => {
            worksheet.write_string(row, col, value.as_str())?;
        }
        Some(Scalar::Number(value)) => match value.as_f64() {
            Some(number) => {
                worksheet.write_number(row, col, number)?;
            }
            None => {
                worksheet.write_string(row, col, &value.to_string())?;
            }
        },
        Some(Scalar::Bool(value)) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        Some(Scalar::Null) | None => {}
    }
    Ok(())
}

fn text(value: &str) -> Option<Scalar> {
    Some(Scalar::String(value.to_string()))
}

fn count(value: usize) -> Option<Scalar> {
    Some(Scalar::Number(value.into()))
}
