use crate::compliance::{evaluate, Compliance};
use crate::dataset::IndicatorDataset;
use crate::filter::{current_view, full_history, Selection};
use crate::period::{period_rank, sort_chronologically};
use crate::target::{parse_target, ParsedTarget};
use crate::types::{DetailTableRow, ExportCsvRow, IndicatorRecord};
use crate::util::{average, format_int, format_percent};
use serde::Serialize;

/// Descriptive fields of the selected indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorDetails {
    pub scope: Option<String>,
    pub name: Option<String>,
    pub numerator_desc: Option<String>,
    pub denominator_desc: Option<String>,
    pub target_text: Option<String>,
    pub periodicity: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    /// Mean of the ratios present in the current-year view.
    pub mean: Option<f64>,
    pub compliance: Compliance,
    /// Rows in the current-year view, with or without a ratio.
    pub observations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub latest: Option<f64>,
    /// Latest minus previous, in chronological order.
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: String,
    pub numerator: Option<i64>,
    pub denominator: Option<i64>,
    pub ratio: Option<f64>,
    pub compliance: Compliance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub year: i32,
    pub period: String,
    /// `"{year}-{period}"`, used as the axis label.
    pub label: String,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub selection: Selection,
    pub details: Option<IndicatorDetails>,
    pub target: Option<ParsedTarget>,
    pub kpi: KpiSummary,
    pub trend: Option<Trend>,
    pub current: Vec<SeriesPoint>,
    pub history: Vec<HistoryPoint>,
}

/// Rectangular export of the current-year series. Compliance travels with
/// each row so renderers may color it; the flat form drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub rows: Vec<SeriesPoint>,
}

impl ExportTable {
    pub const HEADERS: [&'static str; 4] = ["Periodo", "Numerador", "Denominador", "Porcentaje"];

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn flat_rows(&self) -> Vec<ExportCsvRow> {
        self.rows
            .iter()
            .map(|p| ExportCsvRow {
                period: p.period.clone(),
                numerator: p.numerator,
                denominator: p.denominator,
                ratio: p.ratio,
            })
            .collect()
    }

    pub fn display_rows(&self) -> Vec<DetailTableRow> {
        self.rows
            .iter()
            .map(|p| DetailTableRow {
                period: p.period.clone(),
                numerator: format_int(p.numerator),
                denominator: format_int(p.denominator),
                ratio: format_percent(p.ratio),
                status: p.compliance.label().to_string(),
            })
            .collect()
    }
}

impl IndicatorReport {
    pub fn export_table(&self) -> ExportTable {
        ExportTable {
            rows: self.current.clone(),
        }
    }
}

/// Filter the dataset for a selection and assemble its report.
pub fn report_for(dataset: &IndicatorDataset, selection: &Selection) -> IndicatorReport {
    let history = full_history(dataset, &selection.service, &selection.characteristic);
    let current = current_view(dataset, selection);
    assemble(selection, &current, &history)
}

/// Build every dashboard section from a current-year slice and a full-history
/// slice of one indicator.
pub fn assemble(
    selection: &Selection,
    current: &[&IndicatorRecord],
    history: &[&IndicatorRecord],
) -> IndicatorReport {
    let info = history.first().or_else(|| current.first());
    let details = info.map(|r| IndicatorDetails {
        scope: r.scope.clone(),
        name: r.name.clone(),
        numerator_desc: r.numerator_desc.clone(),
        denominator_desc: r.denominator_desc.clone(),
        target_text: r.target_text.clone(),
        periodicity: r.periodicity.clone(),
    });
    let target = info.and_then(|r| parse_target(r.target_text.as_deref()));

    let mean = average(current.iter().map(|r| r.ratio));
    let kpi = KpiSummary {
        mean,
        compliance: evaluate(mean, target.as_ref()),
        observations: current.len(),
    };

    let series = current_series(current, target.as_ref());
    let trend = trend_of(&series);
    let history = historical_series(history);

    IndicatorReport {
        selection: selection.clone(),
        details,
        target,
        kpi,
        trend,
        current: series,
        history,
    }
}

/// Current-year rows in chronological order, each classified against the
/// target. Rows whose label has no rank are dropped.
pub fn current_series(current: &[&IndicatorRecord], target: Option<&ParsedTarget>) -> Vec<SeriesPoint> {
    sort_chronologically(current.to_vec(), |r| r.period.as_deref())
        .into_iter()
        .filter_map(|r| {
            Some(SeriesPoint {
                period: r.period.clone()?,
                numerator: r.numerator,
                denominator: r.denominator,
                ratio: r.ratio,
                compliance: evaluate(r.ratio, target),
            })
        })
        .collect()
}

/// `None` with fewer than two points.
pub fn trend_of(series: &[SeriesPoint]) -> Option<Trend> {
    let [.., previous, last] = series else {
        return None;
    };
    let delta = match (last.ratio, previous.ratio) {
        (Some(l), Some(p)) => Some(l - p),
        _ => None,
    };
    Some(Trend {
        latest: last.ratio,
        delta,
    })
}

/// All years of one indicator ordered by (year, period).
pub fn historical_series(history: &[&IndicatorRecord]) -> Vec<HistoryPoint> {
    let mut points: Vec<(i32, usize, HistoryPoint)> = history
        .iter()
        .filter_map(|r| {
            let year = r.year?;
            let period = r.period.as_deref()?;
            let rank = period_rank(period)?;
            Some((
                year,
                rank,
                HistoryPoint {
                    year,
                    period: period.to_string(),
                    label: format!("{}-{}", year, period),
                    ratio: r.ratio,
                },
            ))
        })
        .collect();
    points.sort_by_key(|(year, rank, _)| (*year, *rank));
    points.into_iter().map(|(_, _, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::{def, meas};
    use crate::types::RawTables;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sel(year: i32, service: &str, characteristic: &str) -> Selection {
        Selection {
            year,
            service: service.into(),
            characteristic: characteristic.into(),
        }
    }

    fn dataset() -> IndicatorDataset {
        IndicatorDataset::build(&RawTables {
            indicators: vec![
                def("Urgencia", "GCL 1.2", "≥ 84%", "MENSUAL"),
                def("Pabellón", "GCL 2.1", "≤ 5%", "TRIMESTRAL"),
                def("Farmacia", "APF 1.3", "Sin meta definida", "MENSUAL"),
            ],
            measurements: vec![
                meas("Urgencia", "GCL 1.2", "2024", "Febrero", "9", "10", "0.9"),
                meas("Urgencia", "GCL 1.2", "2024", "Enero", "8", "10", "0.8"),
                meas("Urgencia", "GCL 1.2", "2023", "Diciembre", "7", "10", "0.7"),
                meas("Urgencia", "GCL 1.2", "2023", "Marzo", "6", "10", "0.6"),
                meas("Pabellón", "GCL 2.1", "2024", "Mayo", "1", "50", "0.02"),
                meas("Pabellón", "GCL 2.1", "2024", "Agosto", "1", "50", "0.02"),
                meas("Farmacia", "APF 1.3", "2024", "Enero", "", "", ""),
            ],
        })
    }

    #[test]
    fn test_current_series_is_chronological() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2"));
        let periods: Vec<_> = report.current.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["Enero", "Febrero"]);
    }

    #[test]
    fn test_kpi_mean_and_compliance() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2"));
        assert!(approx(report.kpi.mean.unwrap(), 0.85));
        assert_eq!(report.kpi.observations, 2);
        assert_eq!(report.kpi.compliance, Compliance::Compliant);
        assert_eq!(report.current[0].compliance, Compliance::NonCompliant);
        assert_eq!(report.current[1].compliance, Compliance::Compliant);
    }

    #[test]
    fn test_trend_uses_chronological_order() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2"));
        let trend = report.trend.unwrap();
        assert!(approx(trend.latest.unwrap(), 0.9));
        assert!(approx(trend.delta.unwrap(), 0.1));
    }

    #[test]
    fn test_trend_absent_with_single_point() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2023, "Pabellón", "GCL 2.1"));
        assert!(report.trend.is_none());

        let single = vec![SeriesPoint {
            period: "Enero".into(),
            numerator: None,
            denominator: None,
            ratio: Some(0.5),
            compliance: Compliance::Undetermined,
        }];
        assert!(trend_of(&single).is_none());
    }

    #[test]
    fn test_trend_delta_missing_ratio() {
        let point = |period: &str, ratio| SeriesPoint {
            period: period.into(),
            numerator: None,
            denominator: None,
            ratio,
            compliance: Compliance::Undetermined,
        };
        let trend = trend_of(&[point("Enero", None), point("Febrero", Some(0.4))]).unwrap();
        assert_eq!(trend.latest, Some(0.4));
        assert_eq!(trend.delta, None);
    }

    #[test]
    fn test_history_sorted_by_year_then_period() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2"));
        let labels: Vec<_> = report.history.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2023-Marzo", "2023-Diciembre", "2024-Enero", "2024-Febrero"]
        );
    }

    #[test]
    fn test_quarterly_off_month_has_no_data() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Pabellón", "GCL 2.1"));
        assert!(report.current.is_empty());
        assert!(report.history.is_empty());
        assert!(report.trend.is_none());
        assert_eq!(report.kpi.observations, 0);
        assert_eq!(report.kpi.mean, None);
        assert_eq!(report.kpi.compliance, Compliance::Undetermined);
        assert!(report.export_table().is_empty());
        // Details still come from the definition.
        assert_eq!(
            report.details.unwrap().target_text.as_deref(),
            Some("≤ 5%")
        );
    }

    #[test]
    fn test_unparseable_target_is_undetermined() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Farmacia", "APF 1.3"));
        assert_eq!(report.target, None);
        assert_eq!(report.kpi.compliance, Compliance::Undetermined);
        assert_eq!(report.current.len(), 1);
        assert_eq!(report.current[0].compliance, Compliance::Undetermined);
    }

    #[test]
    fn test_unknown_selection_is_empty() {
        let ds = dataset();
        let report = report_for(&ds, &sel(2024, "Urgencia", "XYZ"));
        assert!(report.details.is_none());
        assert!(report.current.is_empty());
        assert!(report.history.is_empty());
    }

    #[test]
    fn test_unranked_monthly_label_dropped_from_series() {
        let ds = IndicatorDataset::build(&RawTables {
            indicators: vec![def("Urgencia", "GCL 1.2", "≥ 85%", "MENSUAL")],
            measurements: vec![
                meas("Urgencia", "GCL 1.2", "2024", "enero", "9", "10", "0.9"),
                meas("Urgencia", "GCL 1.2", "2024", "Marzo", "9", "10", "0.9"),
            ],
        });
        let report = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2"));
        assert_eq!(report.current.len(), 1);
        assert_eq!(report.current[0].period, "Marzo");
        assert_eq!(report.history.len(), 1);
    }

    #[test]
    fn test_export_table_shapes() {
        let ds = dataset();
        let table = report_for(&ds, &sel(2024, "Urgencia", "GCL 1.2")).export_table();
        let flat = table.flat_rows();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].period, "Enero");
        assert_eq!(flat[0].numerator, Some(8));
        assert_eq!(flat[0].denominator, Some(10));
        assert_eq!(flat[0].ratio, Some(0.8));

        let shown = table.display_rows();
        assert_eq!(shown[1].ratio, "90.0%");
        assert_eq!(shown[1].status, "Cumple Meta");
    }
}
