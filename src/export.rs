use crate::compliance::Compliance;
use crate::error::AppError;
use crate::output::{write_csv, write_json};
use crate::reports::{ExportTable, IndicatorReport};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SHEET_NAME: &str = "Datos";

/// Font color for a classified cell. Undetermined cells keep the default.
pub fn compliance_color(c: Compliance) -> Option<&'static str> {
    match c {
        Compliance::Compliant => Some("006100"),
        Compliance::NonCompliant => Some("9C0006"),
        Compliance::Undetermined => None,
    }
}

/// `datos_{characteristic}_{year}.{ext}`; path separators in the
/// characteristic become `_`.
pub fn export_file_name(characteristic: &str, year: i32, ext: &str) -> String {
    format!("datos_{}.{}", file_stem(characteristic, year), ext)
}

fn file_stem(characteristic: &str, year: i32) -> String {
    let safe: String = characteristic
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_{}", safe, year)
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_border(FormatBorder::Thin)
}

/// Single-sheet workbook with the flat table. Percent cells are formatted
/// `0.0%` and colored by compliance.
pub fn to_xlsx(table: &ExportTable) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_sheet(&mut wb, table)?;
    Ok(wb.save_to_buffer()?)
}

fn write_sheet(wb: &mut Workbook, table: &ExportTable) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(SHEET_NAME)?;

    let hdr = header_format();
    for (col, h) in ExportTable::HEADERS.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    let pct = Format::new().set_num_format("0.0%");
    for (i, p) in table.rows.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, p.period.as_str())?;
        if let Some(n) = p.numerator {
            ws.write(row, 1, n as f64)?;
        }
        if let Some(d) = p.denominator {
            ws.write(row, 2, d as f64)?;
        }
        if let Some(r) = p.ratio {
            let fmt = match compliance_color(p.compliance) {
                Some(color) => pct.clone().set_font_color(color),
                None => pct.clone(),
            };
            ws.write_with_format(row, 3, r, &fmt)?;
        }
    }

    ws.set_column_width(0, 16)?;
    ws.set_column_width(1, 12)?;
    ws.set_column_width(2, 12)?;
    ws.set_column_width(3, 12)?;
    Ok(())
}

/// Files written by [`export_report`].
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub xlsx: PathBuf,
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Write the spreadsheet, the flat CSV and the full report JSON into `dir`.
pub fn export_report(report: &IndicatorReport, dir: &Path) -> Result<ExportedFiles, AppError> {
    let sel = &report.selection;
    let table = report.export_table();

    let xlsx = dir.join(export_file_name(&sel.characteristic, sel.year, "xlsx"));
    std::fs::write(&xlsx, to_xlsx(&table)?)?;

    let csv = dir.join(export_file_name(&sel.characteristic, sel.year, "csv"));
    write_csv(&csv, &table.flat_rows())?;

    let json = dir.join(format!(
        "reporte_{}.json",
        file_stem(&sel.characteristic, sel.year)
    ));
    write_json(&json, report)?;

    info!(
        xlsx = %xlsx.display(),
        rows = table.rows.len(),
        "report exported"
    );
    Ok(ExportedFiles { xlsx, csv, json })
}
