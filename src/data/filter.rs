use std::collections::BTreeMap;

use crate::error::InvalidConstraintError;

use super::model::{BaseTable, ConstraintSet, FilteredView, Measure, NumericRange, Record};

// ---------------------------------------------------------------------------
// Stages: each one returns a new view and leaves its input untouched
// ---------------------------------------------------------------------------

/// Keep records with `year_start <= year <= year_end`.
/// An inverted span yields an empty view.
pub fn filter_years(records: &[Record], year_start: i32, year_end: i32) -> FilteredView {
    records
        .iter()
        .filter(|r| year_start <= r.year && r.year <= year_end)
        .copied()
        .collect()
}

/// Keep records whose `measure` lies inside `range` (inclusive).
pub fn filter_range(
    view: &FilteredView,
    measure: Measure,
    range: NumericRange,
) -> Result<FilteredView, InvalidConstraintError> {
    range.validate(measure)?;
    Ok(view
        .records()
        .iter()
        .filter(|r| range.contains(measure.value(r)))
        .copied()
        .collect())
}

/// Run every constraint against `base`: years, then IPCA 12M, Selic and
/// minimum wage. All ranges are checked before the first stage runs.
pub fn apply(
    base: &BaseTable,
    constraints: &ConstraintSet,
) -> Result<FilteredView, InvalidConstraintError> {
    constraints.validate()?;
    let mut view = filter_years(base.records(), constraints.year_start, constraints.year_end);
    for measure in Measure::ALL {
        view = filter_range(&view, measure, constraints.range(measure))?;
    }
    Ok(view)
}

// ---------------------------------------------------------------------------
// Slider bounds
// ---------------------------------------------------------------------------

/// `[min, max]` of `measure` over `view`, or `None` when the view is empty.
pub fn measure_bounds(view: &FilteredView, measure: Measure) -> Option<NumericRange> {
    view.records()
        .iter()
        .map(|r| measure.value(r))
        .fold(None, |acc, v| match acc {
            None => Some(NumericRange::new(v, v)),
            Some(b) => Some(NumericRange::new(b.min.min(v), b.max.max(v))),
        })
}

/// Which table a range slider's bounds are taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Every slider spans the year-filtered table.
    #[default]
    YearFiltered,
    /// Each slider spans the table narrowed by the years and every earlier
    /// range filter.
    Progressive,
}

/// Bounds per measure; a measure is absent when its table was empty.
pub type RangeBounds = BTreeMap<Measure, NumericRange>;

/// The filtered view together with the bounds each slider should offer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedResult {
    pub view: FilteredView,
    pub bounds: RangeBounds,
}

/// Same filtering as [`apply`], but also reports slider bounds.
///
/// The year stage always completes before any bound is computed.
pub fn run_staged(
    base: &BaseTable,
    constraints: &ConstraintSet,
    policy: BoundsPolicy,
) -> Result<StagedResult, InvalidConstraintError> {
    constraints.validate()?;

    let by_year = filter_years(base.records(), constraints.year_start, constraints.year_end);

    let mut bounds = RangeBounds::new();
    let mut view = by_year.clone();
    for measure in Measure::ALL {
        let source = match policy {
            BoundsPolicy::YearFiltered => &by_year,
            BoundsPolicy::Progressive => &view,
        };
        if let Some(b) = measure_bounds(source, measure) {
            bounds.insert(measure, b);
        }
        view = filter_range(&view, measure, constraints.range(measure))?;
    }

    log::debug!(
        "pipeline: {} rows → {} after years → {} visible",
        base.len(),
        by_year.len(),
        view.len()
    );

    Ok(StagedResult { view, bounds })
}
