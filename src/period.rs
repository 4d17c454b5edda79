// Reporting periods.
//
// Monthly indicators are reported per month, quarterly ones ("TRIMESTRAL") at
// quarter-end months only. Both share one chronological axis: the twelve months
// in calendar order followed by the four quarters.

pub const QUARTERLY: &str = "TRIMESTRAL";

/// Every period label in chronological order. The position of a label is its
/// rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Enero,
    Febrero,
    Marzo,
    Abril,
    Mayo,
    Junio,
    Julio,
    Agosto,
    Septiembre,
    Octubre,
    Noviembre,
    Diciembre,
    TrimestreI,
    TrimestreII,
    TrimestreIII,
    TrimestreIV,
}

impl Period {
    pub const ALL: [Period; 16] = [
        Period::Enero,
        Period::Febrero,
        Period::Marzo,
        Period::Abril,
        Period::Mayo,
        Period::Junio,
        Period::Julio,
        Period::Agosto,
        Period::Septiembre,
        Period::Octubre,
        Period::Noviembre,
        Period::Diciembre,
        Period::TrimestreI,
        Period::TrimestreII,
        Period::TrimestreIII,
        Period::TrimestreIV,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Period::Enero => "Enero",
            Period::Febrero => "Febrero",
            Period::Marzo => "Marzo",
            Period::Abril => "Abril",
            Period::Mayo => "Mayo",
            Period::Junio => "Junio",
            Period::Julio => "Julio",
            Period::Agosto => "Agosto",
            Period::Septiembre => "Septiembre",
            Period::Octubre => "Octubre",
            Period::Noviembre => "Noviembre",
            Period::Diciembre => "Diciembre",
            Period::TrimestreI => "Trimestre I",
            Period::TrimestreII => "Trimestre II",
            Period::TrimestreIII => "Trimestre III",
            Period::TrimestreIV => "Trimestre IV",
        }
    }

    pub fn from_label(label: &str) -> Option<Period> {
        Period::ALL.iter().copied().find(|p| p.label() == label)
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    /// Quarter closed by a quarter-end month.
    fn quarter_ending_in(month: &str) -> Option<Period> {
        match month {
            "Marzo" => Some(Period::TrimestreI),
            "Junio" => Some(Period::TrimestreII),
            "Septiembre" => Some(Period::TrimestreIII),
            "Diciembre" => Some(Period::TrimestreIV),
            _ => None,
        }
    }
}

/// Derive the period label of a measurement.
///
/// Quarterly indicators map quarter-end months to their quarter and anything
/// else to `None`. Other cadences use the month text unchanged, even when it is
/// not a known month name; such labels have no rank and are dropped by
/// [`sort_chronologically`].
pub fn period_label(periodicity: Option<&str>, month: Option<&str>) -> Option<String> {
    let month = month?;
    if periodicity == Some(QUARTERLY) {
        Period::quarter_ending_in(month).map(|p| p.label().to_string())
    } else {
        Some(month.to_string())
    }
}

/// Rank of a label on the chronological axis; `None` for unknown labels.
pub fn period_rank(label: &str) -> Option<usize> {
    Period::from_label(label).map(Period::rank)
}

/// Sort items by the rank of their period label. Items without a label or with
/// an unknown label are removed first. The sort is stable.
pub fn sort_chronologically<T, F>(items: Vec<T>, label_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut ranked: Vec<(usize, T)> = items
        .into_iter()
        .filter_map(|item| {
            let rank = label_of(&item).and_then(period_rank)?;
            Some((rank, item))
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, item)| item).collect()
}
