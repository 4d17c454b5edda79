// Console sinks for the dashboard: tables, text charts and file writers.
use crate::compliance::Compliance;
use crate::error::AppError;
use crate::loader::LoadReport;
use crate::reports::{ExportTable, IndicatorDetails, IndicatorReport};
use crate::target::Direction;
use crate::types::{ChartRow, DetailTableRow};
use crate::util::{format_int, format_percent, format_percent_delta};
use crossterm::style::{Color, Stylize};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Bars span 0–110% over this many characters.
const CHART_WIDTH: usize = 44;
const CHART_MAX: f64 = 1.1;

pub const NO_CURRENT_DATA: &str =
    "No hay datos de medición para este indicador en el año seleccionado.";
pub const NO_HISTORY_DATA: &str = "No hay datos históricos disponibles para este indicador.";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T])
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        println!("(sin filas)\n");
        return;
    }
    let table_str = Table::new(rows.to_vec()).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn print_notice(msg: &str) {
    println!("ℹ {}\n", msg);
}

pub fn print_load_report(report: &LoadReport) {
    println!(
        "Procesando datos... ({} indicadores, {} mediciones, {} filas combinadas)",
        format_int(Some(report.indicators as i64)),
        format_int(Some(report.measurements as i64)),
        format_int(Some(report.joined_rows as i64))
    );
    if let Some(ts) = report.source_modified {
        println!("Fuente: {} (modificado {})", report.source, ts.format("%Y-%m-%d %H:%M"));
    }
    if report.definitions_without_measurements > 0 {
        println!(
            "Nota: {} indicadores sin mediciones.",
            format_int(Some(report.definitions_without_measurements as i64))
        );
    }
    if report.rows_without_period > 0 {
        println!(
            "Nota: {} filas sin periodo válido (se omiten de los gráficos).",
            format_int(Some(report.rows_without_period as i64))
        );
    }
    if report.skipped_rows > 0 {
        println!(
            "Nota: {} filas ilegibles omitidas.",
            format_int(Some(report.skipped_rows as i64))
        );
    }
    println!();
}

pub fn print_details(details: Option<&IndicatorDetails>) {
    println!("📋 Detalles del Indicador");
    let Some(d) = details else {
        print_notice("Indicador sin definición.");
        return;
    };
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("Ámbito: {}", show(&d.scope));
    println!("Indicador: {}", show(&d.name));
    println!("Numerador: {}", show(&d.numerator_desc));
    println!("Denominador: {}", show(&d.denominator_desc));
    println!("Meta: {}", show(&d.target_text));
    println!("Periodicidad: {}\n", show(&d.periodicity));
}

/// KPI cards. Nothing is shown when the selected year has no measurements.
pub fn print_kpis(report: &IndicatorReport) {
    if report.kpi.observations == 0 {
        return;
    }
    println!(
        "Cumplimiento Promedio {}: {} ({})",
        report.selection.year,
        format_percent(report.kpi.mean),
        report.kpi.compliance.label()
    );
    if let Some(trend) = report.trend {
        let delta = trend
            .delta
            .map(format_percent_delta)
            .unwrap_or_else(|| "N/D".to_string());
        println!(
            "Tendencia vs Periodo Anterior: {} ({})",
            format_percent(trend.latest),
            delta
        );
    }
    println!();
}

/// Terminal color for a classified row. Undetermined rows stay uncolored.
pub fn compliance_term_color(c: Compliance) -> Option<Color> {
    match c {
        Compliance::Compliant => Some(Color::Green),
        Compliance::NonCompliant => Some(Color::Red),
        Compliance::Undetermined => None,
    }
}

fn paint(text: String, c: Compliance) -> String {
    match compliance_term_color(c) {
        Some(color) => text.with(color).to_string(),
        None => text,
    }
}

/// Detail table rows with the percentage and status cells colored by
/// compliance.
pub fn colored_detail_rows(table: &ExportTable) -> Vec<DetailTableRow> {
    table
        .display_rows()
        .into_iter()
        .zip(&table.rows)
        .map(|(mut row, point)| {
            row.ratio = paint(row.ratio, point.compliance);
            row.status = paint(row.status, point.compliance);
            row
        })
        .collect()
}

/// Text bar chart with an optional target marker (`|`).
pub fn render_chart(points: &[(String, Option<f64>)], reference: Option<f64>) -> String {
    let rows: Vec<ChartRow> = points
        .iter()
        .map(|(label, value)| ChartRow {
            label: label.clone(),
            value: format_percent(*value),
            bar: bar(*value, reference),
        })
        .collect();
    Table::new(rows).with(Style::markdown()).to_string()
}

fn scale(v: f64) -> usize {
    let pos = (v.clamp(0.0, CHART_MAX) / CHART_MAX * CHART_WIDTH as f64).round() as usize;
    pos.min(CHART_WIDTH)
}

fn bar(value: Option<f64>, reference: Option<f64>) -> String {
    let mut cells = vec![' '; CHART_WIDTH + 1];
    if let Some(v) = value {
        for c in cells.iter_mut().take(scale(v)) {
            *c = '█';
        }
    }
    if let Some(r) = reference {
        cells[scale(r)] = '|';
    }
    cells.into_iter().collect::<String>().trim_end().to_string()
}

pub fn print_report(report: &IndicatorReport) {
    println!("🏥 Indicadores de Acreditación");
    println!(
        "{} · {} · {}\n",
        report.selection.service, report.selection.characteristic, report.selection.year
    );
    print_kpis(report);
    print_details(report.details.as_ref());

    let reference = report.target.map(|t| t.ratio);
    if let Some(t) = report.target {
        let symbol = match t.direction {
            Direction::AtMost => "≤",
            Direction::AtLeast => "≥",
        };
        println!("Línea de meta: {} {}\n", symbol, format_percent(Some(t.ratio)));
    }

    println!("📊 Cumplimiento en {}", report.selection.year);
    if report.current.is_empty() {
        print_notice(NO_CURRENT_DATA);
    } else {
        let points: Vec<(String, Option<f64>)> = report
            .current
            .iter()
            .map(|p| (p.period.clone(), p.ratio))
            .collect();
        println!("{}\n", render_chart(&points, reference));
        println!("Datos Detallados");
        preview_table_rows(&colored_detail_rows(&report.export_table()));
    }

    println!("📈 Evolución Histórica del Cumplimiento");
    if report.history.is_empty() {
        print_notice(NO_HISTORY_DATA);
    } else {
        let points: Vec<(String, Option<f64>)> = report
            .history
            .iter()
            .map(|p| (p.label.clone(), p.ratio))
            .collect();
        println!("{}\n", render_chart(&points, reference));
    }
}
