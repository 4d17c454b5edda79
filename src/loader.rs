use crate::dataset::IndicatorDataset;
use crate::error::AppError;
use crate::types::{RawIndicatorRow, RawMeasurementRow, RawTables};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{DateTime, Local};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub const INDICATORS_SHEET: &str = "Indicadores";
pub const MEASUREMENTS_SHEET: &str = "BaseMediciones";

const INDICATOR_COLUMNS: [&str; 8] = [
    "Servicio",
    "Característica",
    "Ámbito",
    "Nombre del Indicador",
    "Nominador",
    "Denominador",
    "Meta",
    "Periodicidad",
];
const MEASUREMENT_COLUMNS: [&str; 7] = [
    "Servicio",
    "Característica",
    "Año",
    "Mes",
    "Numerador",
    "Denominador",
    "Porcentaje",
];

/// Where the two tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// One workbook holding both sheets.
    Workbook(PathBuf),
    /// Two CSV files with the same headers as the sheets.
    CsvPair {
        indicators: PathBuf,
        measurements: PathBuf,
    },
}

impl DataSource {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            DataSource::Workbook(p) => vec![p.as_path()],
            DataSource::CsvPair {
                indicators,
                measurements,
            } => vec![indicators.as_path(), measurements.as_path()],
        }
    }

    pub fn describe(&self) -> String {
        self.paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: String,
    pub indicators: usize,
    pub measurements: usize,
    pub skipped_rows: usize,
    pub joined_rows: usize,
    pub definitions_without_measurements: usize,
    pub rows_without_period: usize,
    pub source_modified: Option<DateTime<Local>>,
}

/// A built dataset plus the diagnostics of the load that produced it.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub dataset: Arc<IndicatorDataset>,
    pub report: LoadReport,
}

/// Read both tables and build the dataset. Always touches the filesystem;
/// use [`DatasetCache`] to avoid repeated reads.
pub fn load_dataset(source: &DataSource) -> Result<Loaded, AppError> {
    let (tables, skipped_rows) = match source {
        DataSource::Workbook(path) => (read_workbook(path)?, 0),
        DataSource::CsvPair {
            indicators,
            measurements,
        } => {
            let (indicators, s1) = read_csv::<RawIndicatorRow, _>(
                fs::File::open(indicators)?,
                &INDICATOR_COLUMNS,
            )?;
            let (measurements, s2) = read_csv::<RawMeasurementRow, _>(
                fs::File::open(measurements)?,
                &MEASUREMENT_COLUMNS,
            )?;
            (
                RawTables {
                    indicators,
                    measurements,
                },
                s1 + s2,
            )
        }
    };

    let dataset = IndicatorDataset::build(&tables);
    let source_modified = source_key(source)?
        .modified
        .into_iter()
        .flatten()
        .max()
        .map(DateTime::<Local>::from);
    let report = LoadReport {
        source: source.describe(),
        indicators: tables.indicators.len(),
        measurements: tables.measurements.len(),
        skipped_rows,
        joined_rows: dataset.len(),
        definitions_without_measurements: dataset.definitions_without_measurements(),
        rows_without_period: dataset.rows_without_period(),
        source_modified,
    };
    info!(
        source = %report.source,
        indicators = report.indicators,
        measurements = report.measurements,
        rows = report.joined_rows,
        "dataset loaded"
    );
    Ok(Loaded {
        dataset: Arc::new(dataset),
        report,
    })
}

/// Read CSV rows into `T`, checking the required headers first. Headers are
/// trimmed before both the check and deserialization. Rows that fail to
/// deserialize are skipped and counted.
pub fn read_csv<T, R>(reader: R, required: &[&str]) -> Result<(Vec<T>, usize), AppError>
where
    T: DeserializeOwned,
    R: io::Read,
{
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    check_columns(&headers, required)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<T>() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "skipping unreadable CSV row");
            }
        }
    }
    Ok((rows, skipped))
}

fn check_columns(headers: &[String], required: &[&str]) -> Result<(), AppError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !headers.iter().any(|h| h.as_str() == **c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingColumns(missing))
    }
}

pub fn read_workbook(path: &Path) -> Result<RawTables, AppError> {
    let mut wb = open_workbook_auto(path)?;
    let names = wb.sheet_names().to_owned();
    for sheet in [INDICATORS_SHEET, MEASUREMENTS_SHEET] {
        if !names.iter().any(|n| n == sheet) {
            return Err(AppError::MissingSheet(sheet.to_string()));
        }
    }

    let range = wb.worksheet_range(INDICATORS_SHEET)?;
    let indicators = sheet_rows(&range, &INDICATOR_COLUMNS)?
        .into_iter()
        .map(|row| RawIndicatorRow {
            service: cell_text(row.get("Servicio").copied()),
            characteristic: cell_text(row.get("Característica").copied()),
            scope: cell_text(row.get("Ámbito").copied()),
            name: cell_text(row.get("Nombre del Indicador").copied()),
            numerator_desc: cell_text(row.get("Nominador").copied()),
            denominator_desc: cell_text(row.get("Denominador").copied()),
            // A numeric target cell counts as non-text input.
            target: match row.get("Meta").copied() {
                Some(Data::String(s)) => Some(s.clone()),
                _ => None,
            },
            periodicity: cell_text(row.get("Periodicidad").copied()),
        })
        .collect();

    let range = wb.worksheet_range(MEASUREMENTS_SHEET)?;
    let measurements = sheet_rows(&range, &MEASUREMENT_COLUMNS)?
        .into_iter()
        .map(|row| RawMeasurementRow {
            service: cell_text(row.get("Servicio").copied()),
            characteristic: cell_text(row.get("Característica").copied()),
            year: cell_text(row.get("Año").copied()),
            month: cell_text(row.get("Mes").copied()),
            numerator: cell_text(row.get("Numerador").copied()),
            denominator: cell_text(row.get("Denominador").copied()),
            ratio: cell_text(row.get("Porcentaje").copied()),
        })
        .collect();

    Ok(RawTables {
        indicators,
        measurements,
    })
}

/// Map each data row of a sheet to `header → cell`, keeping only the required
/// columns. Fully empty rows are skipped.
fn sheet_rows<'a>(
    range: &'a Range<Data>,
    required: &[&'a str],
) -> Result<Vec<HashMap<&'a str, &'a Data>>, AppError> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(h) => h
            .iter()
            .map(|c| cell_text(Some(c)).unwrap_or_default().trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    check_columns(&headers, required)?;

    let index: Vec<(&'a str, usize)> = required
        .iter()
        .filter_map(|c| headers.iter().position(|h| h.as_str() == *c).map(|i| (*c, i)))
        .collect();

    Ok(rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            index
                .iter()
                .filter_map(|(name, i)| cells.get(*i).map(|c| (*name, c)))
                .collect()
        })
        .collect())
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Identity of a source: its paths and their modification times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub paths: Vec<PathBuf>,
    pub modified: Vec<Option<SystemTime>>,
}

pub fn source_key(source: &DataSource) -> Result<SourceKey, AppError> {
    let mut paths = Vec::new();
    let mut modified = Vec::new();
    for p in source.paths() {
        let meta = fs::metadata(p)?;
        paths.push(p.to_path_buf());
        modified.push(meta.modified().ok());
    }
    Ok(SourceKey { paths, modified })
}

/// Memoizes the last loaded dataset by source identity. A changed path or
/// modification time is a miss; [`DatasetCache::invalidate`] forces one.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(SourceKey, Loaded)>,
    loads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, source: &DataSource) -> Result<Loaded, AppError> {
        let key = source_key(source)?;
        if let Some((cached_key, loaded)) = &self.entry {
            if *cached_key == key {
                debug!(source = %source.describe(), "dataset cache hit");
                return Ok(loaded.clone());
            }
        }
        debug!(source = %source.describe(), "dataset cache miss");
        let loaded = load_dataset(source)?;
        self.loads += 1;
        self.entry = Some((key, loaded.clone()));
        Ok(loaded)
    }

    pub fn cached(&self) -> Option<&Loaded> {
        self.entry.as_ref().map(|(_, loaded)| loaded)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of actual reads performed so far.
    pub fn loads(&self) -> usize {
        self.loads
    }
}
