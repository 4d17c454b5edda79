use crate::period::period_label;
use crate::types::{IndicatorRecord, RawIndicatorRow, RawMeasurementRow, RawTables};
use crate::util::{parse_f64_safe, parse_i32_safe, parse_i64_safe};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Indicator definitions left-joined with their measurements, each row tagged
/// with its period label. Built once per load and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorDataset {
    records: Vec<IndicatorRecord>,
    unmatched_definitions: usize,
}

impl IndicatorDataset {
    /// Join measurements onto definitions by (service, characteristic).
    ///
    /// Every definition appears at least once; one without measurements gets a
    /// single row with empty measurement fields. Measurements whose key has no
    /// definition are dropped. Numeric cells that do not parse become `None`.
    pub fn build(tables: &RawTables) -> Self {
        let mut by_key: HashMap<(&str, &str), Vec<&RawMeasurementRow>> = HashMap::new();
        for m in &tables.measurements {
            let key = (key_part(&m.service), key_part(&m.characteristic));
            by_key.entry(key).or_default().push(m);
        }

        let mut records = Vec::with_capacity(tables.measurements.len().max(tables.indicators.len()));
        let mut unmatched = 0usize;
        for def in &tables.indicators {
            let key = (key_part(&def.service), key_part(&def.characteristic));
            match by_key.get(&key) {
                Some(rows) => records.extend(rows.iter().map(|m| join_row(def, Some(*m)))),
                None => {
                    unmatched += 1;
                    records.push(join_row(def, None));
                }
            }
        }
        debug!(
            rows = records.len(),
            definitions_without_measurements = unmatched,
            "indicator dataset built"
        );
        IndicatorDataset {
            records,
            unmatched_definitions: unmatched,
        }
    }

    pub fn records(&self) -> &[IndicatorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Distinct years present, newest first.
    pub fn years_desc(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .records
            .iter()
            .filter_map(|r| r.year)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years
    }

    /// Distinct services in the order they first appear.
    pub fn services(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.service.as_str()))
    }

    /// Distinct characteristics of one service, in the order they first appear.
    pub fn characteristics_for(&self, service: &str) -> Vec<String> {
        distinct_in_order(
            self.records
                .iter()
                .filter(|r| r.service == service)
                .map(|r| r.characteristic.as_str()),
        )
    }

    pub fn definitions_without_measurements(&self) -> usize {
        self.unmatched_definitions
    }

    pub fn rows_without_period(&self) -> usize {
        self.records.iter().filter(|r| r.period.is_none()).count()
    }
}

fn key_part(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

fn join_row(def: &RawIndicatorRow, m: Option<&RawMeasurementRow>) -> IndicatorRecord {
    let month = m.and_then(|m| m.month.clone());
    let period = period_label(def.periodicity.as_deref(), month.as_deref());
    IndicatorRecord {
        service: key_part(&def.service).to_string(),
        characteristic: key_part(&def.characteristic).to_string(),
        scope: def.scope.clone(),
        name: def.name.clone(),
        numerator_desc: def.numerator_desc.clone(),
        denominator_desc: def.denominator_desc.clone(),
        target_text: def.target.clone(),
        periodicity: def.periodicity.clone(),
        year: m.and_then(|m| parse_i32_safe(m.year.as_deref())),
        month,
        numerator: m.and_then(|m| parse_i64_safe(m.numerator.as_deref())),
        denominator: m.and_then(|m| parse_i64_safe(m.denominator.as_deref())),
        ratio: m.and_then(|m| parse_f64_safe(m.ratio.as_deref())),
        period,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn def(service: &str, characteristic: &str, target: &str, periodicity: &str) -> RawIndicatorRow {
        RawIndicatorRow {
            service: Some(service.into()),
            characteristic: Some(characteristic.into()),
            scope: Some("Gestión Clínica".into()),
            name: Some(format!("Indicador {}", characteristic)),
            numerator_desc: Some("Pacientes con evaluación".into()),
            denominator_desc: Some("Total de pacientes".into()),
            target: Some(target.into()),
            periodicity: Some(periodicity.into()),
        }
    }

    pub(crate) fn meas(
        service: &str,
        characteristic: &str,
        year: &str,
        month: &str,
        num: &str,
        den: &str,
        ratio: &str,
    ) -> RawMeasurementRow {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        RawMeasurementRow {
            service: Some(service.into()),
            characteristic: Some(characteristic.into()),
            year: opt(year),
            month: opt(month),
            numerator: opt(num),
            denominator: opt(den),
            ratio: opt(ratio),
        }
    }

    #[test]
    fn test_definition_without_measurements_kept_once() {
        let tables = RawTables {
            indicators: vec![
                def("Urgencia", "GCL 1.2", "≥ 90%", "MENSUAL"),
                def("Pabellón", "GCL 2.1", "≤ 5%", "TRIMESTRAL"),
            ],
            measurements: vec![meas("Urgencia", "GCL 1.2", "2024", "Enero", "9", "10", "0.9")],
        };
        let ds = IndicatorDataset::build(&tables);
        assert_eq!(ds.len(), 2);
        let lonely: Vec<_> = ds
            .records()
            .iter()
            .filter(|r| r.service == "Pabellón")
            .collect();
        assert_eq!(lonely.len(), 1);
        let r = lonely[0];
        assert_eq!(r.year, None);
        assert_eq!(r.month, None);
        assert_eq!(r.numerator, None);
        assert_eq!(r.denominator, None);
        assert_eq!(r.ratio, None);
        assert_eq!(r.period, None);
        assert_eq!(r.target_text.as_deref(), Some("≤ 5%"));
        assert_eq!(ds.definitions_without_measurements(), 1);
    }

    #[test]
    fn test_join_coerces_numbers() {
        let tables = RawTables {
            indicators: vec![def("Urgencia", "GCL 1.2", "≥ 90%", "MENSUAL")],
            measurements: vec![
                meas("Urgencia", "GCL 1.2", "2024.0", "Enero", "9.0", "10", "0.9"),
                meas("Urgencia", "GCL 1.2", "2024", "Febrero", "n/a", "", "s/d"),
            ],
        };
        let ds = IndicatorDataset::build(&tables);
        let rows = ds.records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, Some(2024));
        assert_eq!(rows[0].numerator, Some(9));
        assert_eq!(rows[0].denominator, Some(10));
        assert_eq!(rows[0].ratio, Some(0.9));
        assert_eq!(rows[0].period.as_deref(), Some("Enero"));
        assert_eq!(rows[1].numerator, None);
        assert_eq!(rows[1].denominator, None);
        assert_eq!(rows[1].ratio, None);
    }

    #[test]
    fn test_quarterly_period_derivation() {
        let tables = RawTables {
            indicators: vec![def("Pabellón", "GCL 2.1", "≤ 5%", "TRIMESTRAL")],
            measurements: vec![
                meas("Pabellón", "GCL 2.1", "2024", "Marzo", "1", "50", "0.02"),
                meas("Pabellón", "GCL 2.1", "2024", "Mayo", "1", "50", "0.02"),
            ],
        };
        let ds = IndicatorDataset::build(&tables);
        assert_eq!(ds.records()[0].period.as_deref(), Some("Trimestre I"));
        assert_eq!(ds.records()[1].period, None);
        assert_eq!(ds.rows_without_period(), 1);
    }

    #[test]
    fn test_orphan_measurements_dropped() {
        let tables = RawTables {
            indicators: vec![def("Urgencia", "GCL 1.2", "≥ 90%", "MENSUAL")],
            measurements: vec![meas("Farmacia", "APF 1.3", "2024", "Enero", "1", "1", "1")],
        };
        let ds = IndicatorDataset::build(&tables);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].service, "Urgencia");
        assert_eq!(ds.records()[0].ratio, None);
    }

    #[test]
    fn test_build_is_idempotent() {
        let tables = RawTables {
            indicators: vec![def("Urgencia", "GCL 1.2", "≥ 90%", "MENSUAL")],
            measurements: vec![meas("Urgencia", "GCL 1.2", "2024", "Enero", "9", "10", "0.9")],
        };
        assert_eq!(IndicatorDataset::build(&tables), IndicatorDataset::build(&tables));
    }

    #[test]
    fn test_option_lists() {
        let tables = RawTables {
            indicators: vec![
                def("Urgencia", "GCL 1.2", "≥ 90%", "MENSUAL"),
                def("Urgencia", "GCL 1.3", "≥ 80%", "MENSUAL"),
                def("Pabellón", "GCL 2.1", "≤ 5%", "TRIMESTRAL"),
            ],
            measurements: vec![
                meas("Urgencia", "GCL 1.2", "2023", "Enero", "9", "10", "0.9"),
                meas("Urgencia", "GCL 1.2", "2025", "Enero", "9", "10", "0.9"),
                meas("Urgencia", "GCL 1.3", "2024", "Enero", "9", "10", "0.9"),
                meas("Urgencia", "GCL 1.3", "2024", "Febrero", "9", "10", "0.9"),
            ],
        };
        let ds = IndicatorDataset::build(&tables);
        assert_eq!(ds.years_desc(), vec![2025, 2024, 2023]);
        assert_eq!(ds.services(), vec!["Urgencia", "Pabellón"]);
        assert_eq!(ds.characteristics_for("Urgencia"), vec!["GCL 1.2", "GCL 1.3"]);
        assert_eq!(ds.characteristics_for("Pabellón"), vec!["GCL 2.1"]);
        assert!(ds.characteristics_for("Farmacia").is_empty());
    }
}
