use chrono::NaiveDate;

use super::model::{FilteredView, IndexKind, Record};

/// One point of a dated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Summed monthly variation of one index over the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexShare {
    pub index: IndexKind,
    pub label: &'static str,
    pub total: f64,
}

/// Selic target and monthly IPCA drawn on the same axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DualSeries {
    pub selic: Vec<SeriesPoint>,
    pub ipca: Vec<SeriesPoint>,
}

/// Everything the four charts need, and nothing chart-specific.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projections {
    pub ipca_12m: Vec<SeriesPoint>,
    pub index_share: Vec<IndexShare>,
    pub selic_vs_ipca: DualSeries,
    pub minimum_wage: Vec<SeriesPoint>,
}

fn series(view: &FilteredView, value: impl Fn(&Record) -> f64) -> Vec<SeriesPoint> {
    view.records()
        .iter()
        .map(|r| SeriesPoint {
            date: r.reference_date,
            value: value(r),
        })
        .collect()
}

/// Sum each selected index over the view, in selection order.
/// Repeated entries keep their first position only.
pub fn index_share(view: &FilteredView, selected: &[IndexKind]) -> Vec<IndexShare> {
    let mut shares: Vec<IndexShare> = Vec::with_capacity(selected.len());
    for &index in selected {
        if shares.iter().any(|s| s.index == index) {
            continue;
        }
        shares.push(IndexShare {
            index,
            label: index.display_name(),
            total: view.records().iter().map(|r| index.variation(r)).sum(),
        });
    }
    shares
}

/// Build the four chart projections from a filtered view.
pub fn project(view: &FilteredView, selected: &[IndexKind]) -> Projections {
    Projections {
        ipca_12m: series(view, |r| r.ipca_12m_accumulated),
        index_share: index_share(view, selected),
        selic_vs_ipca: DualSeries {
            selic: series(view, |r| r.selic_target),
            ipca: series(view, |r| r.ipca_variation),
        },
        minimum_wage: series(view, |r| r.minimum_wage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::apply;
    use crate::data::model::{record, BaseTable, ConstraintSet};

    fn three_months() -> FilteredView {
        [(0.5, 0.4), (0.3, 0.3), (0.2, 0.1)]
            .into_iter()
            .enumerate()
            .map(|(i, (ipca, inpc))| Record {
                ipca_variation: ipca,
                inpc_variation: inpc,
                ipca15_variation: 0.25,
                selic_target: 10.0 + i as f64,
                minimum_wage: 1000.0 + 10.0 * i as f64,
                ipca_12m_accumulated: 4.0 - i as f64,
                ..record(&format!("2022-0{}-01", i + 1), 2022)
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn share_follows_selection_order() {
        let shares = index_share(&three_months(), &[IndexKind::Inpc, IndexKind::Ipca]);
        let labels: Vec<&str> = shares.iter().map(|s| s.label).collect();
        assert_eq!(labels, ["INPC", "IPCA"]);
        assert!(approx(shares[0].total, 0.8));
        assert!(approx(shares[1].total, 1.0));
    }

    #[test]
    fn empty_selection_gives_empty_share() {
        assert!(index_share(&three_months(), &[]).is_empty());
        assert!(project(&FilteredView::default(), &[]).index_share.is_empty());
    }

    #[test]
    fn duplicate_selection_is_collapsed() {
        let shares = index_share(
            &three_months(),
            &[IndexKind::Ipca15, IndexKind::Ipca, IndexKind::Ipca15],
        );
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].index, IndexKind::Ipca15);
        assert!(approx(shares[0].total, 0.75));
    }

    #[test]
    fn empty_view_sums_to_zero() {
        let shares = index_share(&FilteredView::default(), &IndexKind::ALL);
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|s| s.total == 0.0));
    }

    #[test]
    fn series_keep_chronological_order() {
        let p = project(&three_months(), &IndexKind::ALL);
        let wages: Vec<f64> = p.minimum_wage.iter().map(|pt| pt.value).collect();
        assert_eq!(wages, [1000.0, 1010.0, 1020.0]);
        assert_eq!(p.ipca_12m[2].value, 2.0);
        assert_eq!(p.selic_vs_ipca.selic.len(), 3);
        assert_eq!(p.selic_vs_ipca.ipca[0].value, 0.5);
        assert!(p.ipca_12m.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn inverted_years_give_empty_projections() {
        let base = BaseTable::from_records(three_months().records().to_vec()).unwrap();
        let mut constraints = ConstraintSet {
            year_start: 2023,
            year_end: 2021,
            ..ConstraintSet::full(&base)
        };
        let view = apply(&base, &constraints).unwrap();
        assert!(view.is_empty());

        let p = project(&view, &constraints.selected_indices);
        assert!(p.ipca_12m.is_empty() && p.minimum_wage.is_empty());
        assert!(p.index_share.iter().all(|s| s.total == 0.0));

        constraints.selected_indices.clear();
        let p = project(&view, &constraints.selected_indices);
        assert_eq!(p, Projections::default());
    }
}
