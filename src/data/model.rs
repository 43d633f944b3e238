use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::error::{DataSourceError, InvalidConstraintError};

// ---------------------------------------------------------------------------
// Record – one month of the source table
// ---------------------------------------------------------------------------

/// A single monthly observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub reference_date: NaiveDate,
    pub year: i32,
    pub ipca_variation: f64,
    pub inpc_variation: f64,
    pub ipca15_variation: f64,
    pub ipca_12m_accumulated: f64,
    pub selic_target: f64,
    pub minimum_wage: f64,
}

// ---------------------------------------------------------------------------
// IndexKind – the price indices that can be compared
// ---------------------------------------------------------------------------

/// Monthly price indices offered in the comparison selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Ipca,
    Inpc,
    Ipca15,
}

impl IndexKind {
    /// Declared order, also the default selection.
    pub const ALL: [IndexKind; 3] = [IndexKind::Ipca, IndexKind::Inpc, IndexKind::Ipca15];

    /// Label shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            IndexKind::Ipca => "IPCA",
            IndexKind::Inpc => "INPC",
            IndexKind::Ipca15 => "IPCA-15",
        }
    }

    /// Column holding the monthly variation in the source table.
    pub fn column(self) -> &'static str {
        match self {
            IndexKind::Ipca => "ipca_variacao",
            IndexKind::Inpc => "inpc_variacao",
            IndexKind::Ipca15 => "ipca15_variacao",
        }
    }

    pub fn variation(self, record: &Record) -> f64 {
        match self {
            IndexKind::Ipca => record.ipca_variation,
            IndexKind::Inpc => record.inpc_variation,
            IndexKind::Ipca15 => record.ipca15_variation,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Measure – columns filtered by a numeric range
// ---------------------------------------------------------------------------

/// Columns that carry a range slider, in the order the pipeline filters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measure {
    Ipca12m,
    Selic,
    MinimumWage,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Ipca12m, Measure::Selic, Measure::MinimumWage];

    pub fn label(self) -> &'static str {
        match self {
            Measure::Ipca12m => "IPCA acumulado em 12 meses (%)",
            Measure::Selic => "Taxa Selic (%)",
            Measure::MinimumWage => "Salário mínimo (R$)",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Measure::Ipca12m => "ipca_acumulado_doze_meses",
            Measure::Selic => "selic_meta",
            Measure::MinimumWage => "salario_minimo",
        }
    }

    pub fn value(self, record: &Record) -> f64 {
        match self {
            Measure::Ipca12m => record.ipca_12m_accumulated,
            Measure::Selic => record.selic_target,
            Measure::MinimumWage => record.minimum_wage,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// NumericRange – inclusive [min, max]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    /// Accepts every finite value; the default slider selection.
    pub const UNBOUNDED: NumericRange = NumericRange {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both ends are inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Fails when `min > max` or either bound is NaN.
    pub fn validate(&self, measure: Measure) -> Result<(), InvalidConstraintError> {
        if self.min <= self.max {
            Ok(())
        } else {
            Err(InvalidConstraintError {
                measure,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Clamp to `bounds`, used to display a selection on a slider.
    pub fn clamp_to(&self, bounds: NumericRange) -> NumericRange {
        let min = self.min.max(bounds.min).min(bounds.max);
        let max = self.max.min(bounds.max).max(min);
        NumericRange { min, max }
    }
}

impl Default for NumericRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

// ---------------------------------------------------------------------------
// ConstraintSet – everything the user picked in the sidebar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub year_start: i32,
    pub year_end: i32,
    /// Ordered; the share chart follows this order.
    pub selected_indices: Vec<IndexKind>,
    pub ipca12_range: NumericRange,
    pub selic_range: NumericRange,
    pub minwage_range: NumericRange,
}

impl ConstraintSet {
    /// Full year span of `base`, every index selected, unbounded ranges.
    pub fn full(base: &BaseTable) -> Self {
        let years = base.years();
        Self {
            year_start: years.first().copied().unwrap_or(i32::MIN),
            year_end: years.last().copied().unwrap_or(i32::MAX),
            selected_indices: IndexKind::ALL.to_vec(),
            ipca12_range: NumericRange::UNBOUNDED,
            selic_range: NumericRange::UNBOUNDED,
            minwage_range: NumericRange::UNBOUNDED,
        }
    }

    pub fn range(&self, measure: Measure) -> NumericRange {
        match measure {
            Measure::Ipca12m => self.ipca12_range,
            Measure::Selic => self.selic_range,
            Measure::MinimumWage => self.minwage_range,
        }
    }

    /// Check every range before any filtering happens.
    pub fn validate(&self) -> Result<(), InvalidConstraintError> {
        Measure::ALL
            .into_iter()
            .try_for_each(|m| self.range(m).validate(m))
    }
}

// ---------------------------------------------------------------------------
// BaseTable – the immutable, chronologically sorted dataset
// ---------------------------------------------------------------------------

/// The loaded dataset. Rows are strictly ascending by `reference_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseTable {
    records: Vec<Record>,
}

impl BaseTable {
    /// Sort by date and reject repeated dates.
    pub fn from_records(mut records: Vec<Record>) -> Result<Self, DataSourceError> {
        records.sort_by_key(|r| r.reference_date);
        if let Some(pair) = records
            .windows(2)
            .find(|w| w[0].reference_date == w[1].reference_date)
        {
            return Err(DataSourceError::DuplicateDate(pair[0].reference_date));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FilteredView – result of one pipeline stage
// ---------------------------------------------------------------------------

/// A chronological subsequence of the base table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    records: Vec<Record>,
}

impl FilteredView {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for FilteredView {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn record(date: &str, year: i32) -> Record {
    Record {
        reference_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        year,
        ipca_variation: 0.0,
        inpc_variation: 0.0,
        ipca15_variation: 0.0,
        ipca_12m_accumulated: 0.0,
        selic_target: 0.0,
        minimum_wage: 0.0,
    }
}
