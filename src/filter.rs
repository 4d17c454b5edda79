use crate::dataset::IndicatorDataset;
use crate::types::IndicatorRecord;
use serde::Serialize;

/// The three keys that scope a dashboard view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub year: i32,
    pub service: String,
    pub characteristic: String,
}

/// All rows of one indicator, every year.
pub fn full_history<'a>(
    dataset: &'a IndicatorDataset,
    service: &str,
    characteristic: &str,
) -> Vec<&'a IndicatorRecord> {
    dataset
        .records()
        .iter()
        .filter(|r| r.service == service && r.characteristic == characteristic)
        .collect()
}

/// Rows of one indicator for the selected year that carry a period.
pub fn current_view<'a>(
    dataset: &'a IndicatorDataset,
    selection: &Selection,
) -> Vec<&'a IndicatorRecord> {
    full_history(dataset, &selection.service, &selection.characteristic)
        .into_iter()
        .filter(|r| r.year == Some(selection.year) && r.period.is_some())
        .collect()
}

/// Current choices of the filter layer, kept consistent with the dataset.
///
/// Every choice defaults to the first available option. Changing the service
/// recomputes the characteristic options and resets the characteristic when
/// the previous one does not exist for the new service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub year: Option<i32>,
    pub service: Option<String>,
    pub characteristic: Option<String>,
}

impl FilterState {
    pub fn new(dataset: &IndicatorDataset) -> Self {
        let mut state = FilterState {
            year: dataset.years_desc().first().copied(),
            ..Default::default()
        };
        if let Some(service) = dataset.services().into_iter().next() {
            state.set_service(dataset, &service);
        }
        state
    }

    pub fn set_year(&mut self, year: i32) {
        self.year = Some(year);
    }

    pub fn set_service(&mut self, dataset: &IndicatorDataset, service: &str) {
        let options = dataset.characteristics_for(service);
        let keep = self
            .characteristic
            .as_ref()
            .map_or(false, |c| options.contains(c));
        if !keep {
            self.characteristic = options.into_iter().next();
        }
        self.service = Some(service.to_string());
    }

    /// Ignored when the characteristic does not belong to the current service.
    pub fn set_characteristic(&mut self, dataset: &IndicatorDataset, characteristic: &str) {
        let Some(service) = self.service.as_deref() else {
            return;
        };
        if dataset
            .characteristics_for(service)
            .iter()
            .any(|c| c == characteristic)
        {
            self.characteristic = Some(characteristic.to_string());
        }
    }

    pub fn characteristic_options(&self, dataset: &IndicatorDataset) -> Vec<String> {
        self.service
            .as_deref()
            .map(|s| dataset.characteristics_for(s))
            .unwrap_or_default()
    }

    pub fn selection(&self) -> Option<Selection> {
        Some(Selection {
            year: self.year?,
            service: self.service.clone()?,
            characteristic: self.characteristic.clone()?,
        })
    }
}
