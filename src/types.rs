use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One row of the `Indicadores` sheet, as read. Everything is optional text;
/// coercion happens when the dataset is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIndicatorRow {
    #[serde(rename = "Servicio")]
    pub service: Option<String>,
    #[serde(rename = "Característica")]
    pub characteristic: Option<String>,
    #[serde(rename = "Ámbito")]
    pub scope: Option<String>,
    #[serde(rename = "Nombre del Indicador")]
    pub name: Option<String>,
    #[serde(rename = "Nominador")]
    pub numerator_desc: Option<String>,
    #[serde(rename = "Denominador")]
    pub denominator_desc: Option<String>,
    #[serde(rename = "Meta")]
    pub target: Option<String>,
    #[serde(rename = "Periodicidad")]
    pub periodicity: Option<String>,
}

/// One row of the `BaseMediciones` sheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMeasurementRow {
    #[serde(rename = "Servicio")]
    pub service: Option<String>,
    #[serde(rename = "Característica")]
    pub characteristic: Option<String>,
    #[serde(rename = "Año")]
    pub year: Option<String>,
    #[serde(rename = "Mes")]
    pub month: Option<String>,
    #[serde(rename = "Numerador")]
    pub numerator: Option<String>,
    #[serde(rename = "Denominador")]
    pub denominator: Option<String>,
    #[serde(rename = "Porcentaje")]
    pub ratio: Option<String>,
}

/// Both source tables, untouched.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub indicators: Vec<RawIndicatorRow>,
    pub measurements: Vec<RawMeasurementRow>,
}

/// A definition joined with one of its measurements (or with none, in which
/// case every measurement field is `None`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRecord {
    pub service: String,
    pub characteristic: String,
    pub scope: Option<String>,
    pub name: Option<String>,
    pub numerator_desc: Option<String>,
    pub denominator_desc: Option<String>,
    pub target_text: Option<String>,
    pub periodicity: Option<String>,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub numerator: Option<i64>,
    pub denominator: Option<i64>,
    pub ratio: Option<f64>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailTableRow {
    #[serde(rename = "Periodo")]
    #[tabled(rename = "Periodo")]
    pub period: String,
    #[serde(rename = "Numerador")]
    #[tabled(rename = "Numerador")]
    pub numerator: String,
    #[serde(rename = "Denominador")]
    #[tabled(rename = "Denominador")]
    pub denominator: String,
    #[serde(rename = "Porcentaje")]
    #[tabled(rename = "Porcentaje")]
    pub ratio: String,
    #[serde(rename = "Estado")]
    #[tabled(rename = "Estado")]
    pub status: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ChartRow {
    #[tabled(rename = "Periodo")]
    pub label: String,
    #[tabled(rename = "Porcentaje")]
    pub value: String,
    #[tabled(rename = "Gráfico")]
    pub bar: String,
}

/// Flat export row: numbers stay numbers so the CSV opens cleanly in a
/// spreadsheet.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExportCsvRow {
    #[serde(rename = "Periodo")]
    pub period: String,
    #[serde(rename = "Numerador")]
    pub numerator: Option<i64>,
    #[serde(rename = "Denominador")]
    pub denominator: Option<i64>,
    #[serde(rename = "Porcentaje")]
    pub ratio: Option<f64>,
}
