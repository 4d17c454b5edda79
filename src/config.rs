use crate::loader::DataSource;
use std::path::PathBuf;

pub const DEFAULT_WORKBOOK: &str = "SistemaIndicadores_Formulario.xlsm";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub source: DataSource,
    pub export_dir: PathBuf,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as
    /// unset. A CSV pair is used only when both CSV paths are given.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let source = match (
            get("INDICADORES_CSV_INDICADORES"),
            get("INDICADORES_CSV_MEDICIONES"),
        ) {
            (Some(indicators), Some(measurements)) => DataSource::CsvPair {
                indicators: indicators.into(),
                measurements: measurements.into(),
            },
            _ => DataSource::Workbook(
                get("INDICADORES_ARCHIVO")
                    .unwrap_or_else(|| DEFAULT_WORKBOOK.to_string())
                    .into(),
            ),
        };

        AppConfig {
            source,
            export_dir: get("INDICADORES_EXPORT_DIR")
                .unwrap_or_else(|| ".".to_string())
                .into(),
            log_filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
