use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::data::cache::DatasetCache;
use crate::data::filter::{run_staged, BoundsPolicy, StagedResult};
use crate::data::model::{BaseTable, ConstraintSet, IndexKind, Measure, NumericRange};
use crate::data::projection::{project, Projections};
use crate::error::InvalidConstraintError;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file loads successfully).
    pub cache: Option<DatasetCache>,

    /// Table the current filters run against.
    pub table: Option<Arc<BaseTable>>,

    pub bounds_policy: BoundsPolicy,

    /// Poll the source file and reload when it changes.
    pub watch_source: bool,

    /// Distinct years of the table, ascending.
    pub years: Vec<i32>,
    pub year_start: i32,
    pub year_end: i32,

    /// Indices in the order the user picked them.
    pub selected_indices: Vec<IndexKind>,

    /// Slider selections; a missing entry means the full bounds.
    pub selections: BTreeMap<Measure, NumericRange>,

    /// Last pipeline output: visible rows and slider bounds.
    pub staged: StagedResult,

    /// Chart inputs derived from `staged.view`.
    pub projections: Projections,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            cache: None,
            table: None,
            bounds_policy: BoundsPolicy::default(),
            watch_source: false,
            years: Vec::new(),
            year_start: 0,
            year_end: 0,
            selected_indices: IndexKind::ALL.to_vec(),
            selections: BTreeMap::new(),
            staged: StagedResult::default(),
            projections: Projections::default(),
            status_message: None,
        }
    }
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let mut state = Self {
            bounds_policy: config.bounds_policy,
            watch_source: config.watch_source,
            ..Self::default()
        };
        state.open(config.data_path.clone());
        state
    }

    /// Load a dataset from disk and make it current.
    pub fn open(&mut self, path: PathBuf) {
        match DatasetCache::open(&path) {
            Ok(cache) => {
                self.set_table(cache.table(), false);
                self.cache = Some(cache);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Re-read the current source, keeping the user's choices where they
    /// still apply.
    pub fn reload(&mut self) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        match cache.reload() {
            Ok(()) => {
                let table = cache.table();
                self.set_table(table, true);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to reload {}: {e}", cache.path().display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Reload when the watched source changed on disk. Returns whether a
    /// reload was attempted.
    pub fn poll_source(&mut self) -> bool {
        let stale = self.watch_source && self.cache.as_ref().is_some_and(|c| c.is_stale());
        if stale {
            self.reload();
        }
        stale
    }

    /// Install a table and rerun the pipeline.
    pub fn set_table(&mut self, table: Arc<BaseTable>, keep_choices: bool) {
        self.years = table.years();
        let first = self.years.first().copied().unwrap_or(0);
        let last = self.years.last().copied().unwrap_or(0);

        if !(keep_choices && self.years.contains(&self.year_start)) {
            self.year_start = first;
        }
        if !(keep_choices && self.years.contains(&self.year_end)) {
            self.year_end = last;
        }
        if !keep_choices {
            self.selected_indices = IndexKind::ALL.to_vec();
            self.selections.clear();
            self.staged = StagedResult::default();
        }

        self.table = Some(table);
        self.refilter();
    }

    /// The constraint set the sidebar currently describes.
    pub fn constraints(&self) -> ConstraintSet {
        let range = |m: Measure| {
            self.selections
                .get(&m)
                .copied()
                .unwrap_or(NumericRange::UNBOUNDED)
        };
        ConstraintSet {
            year_start: self.year_start,
            year_end: self.year_end,
            selected_indices: self.selected_indices.clone(),
            ipca12_range: range(Measure::Ipca12m),
            selic_range: range(Measure::Selic),
            minwage_range: range(Measure::MinimumWage),
        }
    }

    /// Rerun the pipeline after any change.
    ///
    /// A slider whose bounds moved starts over at its full span, which can
    /// in turn move later bounds under [`BoundsPolicy::Progressive`].
    pub fn refilter(&mut self) {
        if let Err(e) = self.try_refilter() {
            log::error!("Filter rejected: {e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    /// Output is only replaced, and the status cleared, when the run succeeds.
    fn try_refilter(&mut self) -> Result<(), InvalidConstraintError> {
        let Some(table) = self.table.clone() else {
            return Ok(());
        };

        loop {
            let staged = run_staged(&table, &self.constraints(), self.bounds_policy)?;

            let moved: Vec<Measure> = Measure::ALL
                .into_iter()
                .filter(|m| {
                    self.selections.contains_key(m)
                        && staged.bounds.get(m) != self.staged.bounds.get(m)
                })
                .collect();

            if moved.is_empty() {
                self.projections = project(&staged.view, &self.selected_indices);
                self.staged = staged;
                self.status_message = None;
                return Ok(());
            }
            for m in moved {
                log::warn!("Bounds of {m} changed, resetting its selection");
                self.selections.remove(&m);
            }
        }
    }

    pub fn set_years(&mut self, start: i32, end: i32) {
        self.year_start = start;
        self.year_end = end;
        self.refilter();
    }

    /// Selecting appends at the end; deselecting removes.
    pub fn toggle_index(&mut self, index: IndexKind) {
        if let Some(pos) = self.selected_indices.iter().position(|&k| k == index) {
            self.selected_indices.remove(pos);
        } else {
            self.selected_indices.push(index);
        }
        self.refilter();
    }

    /// A rejected range is reported and dropped, keeping the previous one.
    pub fn set_range(&mut self, measure: Measure, range: NumericRange) {
        let previous = self.selections.insert(measure, range);
        if let Err(e) = self.try_refilter() {
            match previous {
                Some(previous) => self.selections.insert(measure, previous),
                None => self.selections.remove(&measure),
            };
            self.refilter();
            log::error!("Filter rejected: {e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    pub fn reset_ranges(&mut self) {
        self.selections.clear();
        self.refilter();
    }

    /// Slider bounds and the selection to display inside them.
    pub fn slider(&self, measure: Measure) -> Option<(NumericRange, NumericRange)> {
        let bounds = *self.staged.bounds.get(&measure)?;
        let selection = self
            .selections
            .get(&measure)
            .copied()
            .unwrap_or(NumericRange::UNBOUNDED)
            .clamp_to(bounds);
        Some((bounds, selection))
    }

    pub fn visible_len(&self) -> usize {
        self.staged.view.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{record, Record};

    fn row(date: &str, year: i32, ipca: f64, ipca12: f64, selic: f64) -> Record {
        Record {
            ipca_variation: ipca,
            inpc_variation: ipca / 2.0,
            ipca_12m_accumulated: ipca12,
            selic_target: selic,
            minimum_wage: 1000.0 + year as f64,
            ..record(date, year)
        }
    }

    fn state(policy: BoundsPolicy) -> AppState {
        let table = BaseTable::from_records(vec![
            row("2020-01-01", 2020, 0.2, 4.0, 4.5),
            row("2021-01-01", 2021, 0.3, 5.0, 2.0),
            row("2022-01-01", 2022, 0.5, 10.0, 9.25),
            row("2023-01-01", 2023, 0.4, 6.0, 13.75),
        ])
        .unwrap();
        let mut state = AppState {
            bounds_policy: policy,
            ..AppState::default()
        };
        state.set_table(Arc::new(table), false);
        state
    }

    #[test]
    fn defaults_cover_the_whole_table() {
        let s = state(BoundsPolicy::YearFiltered);
        assert_eq!((s.year_start, s.year_end), (2020, 2023));
        assert_eq!(s.visible_len(), 4);
        assert_eq!(s.projections.index_share.len(), 3);
        assert_eq!(
            s.slider(Measure::Selic),
            Some((NumericRange::new(2.0, 13.75), NumericRange::new(2.0, 13.75)))
        );
    }

    #[test]
    fn toggled_indices_keep_pick_order() {
        let mut s = state(BoundsPolicy::YearFiltered);
        s.toggle_index(IndexKind::Ipca);
        s.toggle_index(IndexKind::Ipca);
        let labels: Vec<&str> = s.projections.index_share.iter().map(|x| x.label).collect();
        assert_eq!(labels, ["INPC", "IPCA-15", "IPCA"]);
    }

    #[test]
    fn moving_years_resets_slider_selection() {
        let mut s = state(BoundsPolicy::YearFiltered);
        s.set_range(Measure::Selic, NumericRange::new(4.0, 10.0));
        assert_eq!(s.visible_len(), 2);

        s.set_years(2022, 2023);
        assert!(!s.selections.contains_key(&Measure::Selic));
        assert_eq!(s.visible_len(), 2);
        assert_eq!(
            s.slider(Measure::Selic).map(|(b, _)| b),
            Some(NumericRange::new(9.25, 13.75))
        );
    }

    #[test]
    fn progressive_bounds_reset_later_sliders() {
        let mut s = state(BoundsPolicy::Progressive);
        s.set_range(Measure::Selic, NumericRange::new(2.0, 9.25));
        assert_eq!(s.visible_len(), 3);

        // Narrowing IPCA 12M moves the Selic bounds, so its selection resets.
        s.set_range(Measure::Ipca12m, NumericRange::new(6.0, 10.0));
        assert!(!s.selections.contains_key(&Measure::Selic));
        assert_eq!(s.visible_len(), 2);
        assert_eq!(
            s.slider(Measure::Selic).map(|(b, _)| b),
            Some(NumericRange::new(9.25, 13.75))
        );
    }

    #[test]
    fn inverted_range_is_reported_not_applied() {
        let mut s = state(BoundsPolicy::YearFiltered);
        s.set_range(Measure::Ipca12m, NumericRange::new(9.0, 5.0));
        assert!(s
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("ipca_acumulado_doze_meses")));
        // Previous output stays on screen and the bad range is not kept.
        assert_eq!(s.visible_len(), 4);
        assert!(!s.selections.contains_key(&Measure::Ipca12m));
    }

    #[test]
    fn rejected_range_does_not_block_later_changes() {
        let mut s = state(BoundsPolicy::YearFiltered);
        s.set_range(Measure::Selic, NumericRange::new(2.0, 9.25));
        assert_eq!(s.visible_len(), 3);

        s.set_range(Measure::Selic, NumericRange::new(5.0, 1.0));
        assert!(s.status_message.is_some());
        assert_eq!(
            s.selections.get(&Measure::Selic),
            Some(&NumericRange::new(2.0, 9.25))
        );
        assert_eq!(s.visible_len(), 3);

        s.toggle_index(IndexKind::Ipca);
        assert_eq!(s.projections.index_share.len(), 2);
        assert_eq!(s.status_message, None);

        s.set_range(Measure::Selic, NumericRange::new(0.0, 5.0));
        assert_eq!(s.status_message, None);
        assert_eq!(s.visible_len(), 2);
        assert_eq!(s.projections.index_share.len(), 2);
    }

    #[test]
    fn progressive_sliders_vanish_when_ipca12_matches_nothing() {
        let mut s = state(BoundsPolicy::Progressive);
        s.set_range(Measure::Ipca12m, NumericRange::new(50.0, 60.0));
        assert_eq!(s.visible_len(), 0);
        assert_eq!(
            s.slider(Measure::Ipca12m),
            Some((NumericRange::new(4.0, 10.0), NumericRange::new(10.0, 10.0)))
        );
        assert_eq!(s.slider(Measure::Selic), None);
        assert_eq!(s.slider(Measure::MinimumWage), None);
        assert_eq!(s.status_message, None);
    }

    #[test]
    fn empty_year_span_keeps_state_consistent() {
        let mut s = state(BoundsPolicy::YearFiltered);
        s.set_years(2023, 2020);
        assert_eq!(s.visible_len(), 0);
        assert_eq!(s.slider(Measure::Selic), None);
        assert!(s.projections.ipca_12m.is_empty());
    }
}
