//! Property tests for the aggregation engine.
//!
//! These cover the algebra the engine promises independently of any data
//! set: sequential filters equal one combined filter, and duplicated species
//! rows inside a unit do not move richness.

use proptest::prelude::*;
use vt_common::{Table, Value};
use vt_core::{aggregate, apply_filters, AggregationRequest, FilterRule, FilterSpec, Metric};

const SPECIES: [&str; 4] = ["Carex acuta", "Poa palustris", "Phalaris arundinacea", "Urtica dioica"];
const IMPACT: [&str; 3] = ["upper dam", "natural", "lower dam"];

fn cell_int(v: Option<i64>) -> Value {
    v.map(Value::Int).unwrap_or(Value::Null)
}

fn arb_rows() -> impl Strategy<Value = Vec<(i64, usize, Option<i64>, usize)>> {
    prop::collection::vec(
        (0i64..6, 0usize..SPECIES.len(), prop::option::of(0i64..100), 0usize..IMPACT.len()),
        0..40,
    )
}

/// `description_id, year, species, projective_cover, impact_type`; a unit's
/// year follows from its id so every unit sits in exactly one group.
fn survey_table(rows: &[(i64, usize, Option<i64>, usize)]) -> Table {
    Table::from_rows(
        ["description_id", "year", "species", "projective_cover", "impact_type"],
        rows.iter().map(|&(id, sp, cover, impact)| {
            vec![
                Value::Int(id),
                Value::Int(2019 + id % 2),
                Value::from(SPECIES[sp]),
                cell_int(cover),
                Value::from(IMPACT[impact]),
            ]
        }),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn sequential_filters_equal_combined(
        rows in arb_rows(),
        lo in 0.0f64..60.0,
        width in 0.0f64..60.0,
        needle in prop::sample::select(vec!["dam", "NAT", "upper", "x"]),
    ) {
        let table = survey_table(&rows);
        let f1 = FilterSpec::new().with("projective_cover", FilterRule::Between(lo, lo + width));
        let f2 = FilterSpec::new().with("impact_type", FilterRule::Contains(needle.to_string()));

        let step1 = apply_filters(&table, Some(&f1)).unwrap().into_owned();
        let sequential = apply_filters(&step1, Some(&f2)).unwrap().into_owned();
        let combined = apply_filters(&table, Some(&f1.clone().and(f2.clone()))).unwrap().into_owned();
        let reversed = apply_filters(&table, Some(&f2.and(f1))).unwrap().into_owned();

        prop_assert_eq!(&sequential, &combined);
        prop_assert_eq!(&combined, &reversed);
    }

    #[test]
    fn duplicated_rows_do_not_change_richness(rows in arb_rows(), unit in 0i64..6) {
        let table = survey_table(&rows);
        let mut duplicated = table.clone();
        for r in 0..table.n_rows() {
            if table.value(r, "description_id") == Some(&Value::Int(unit)) {
                duplicated.push_row(table.row(r)).unwrap();
            }
        }

        let request = AggregationRequest::new().metrics(vec![Metric::richness()]);
        let before = aggregate(&table, &request).unwrap();
        let after = aggregate(&duplicated, &request).unwrap();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn n_descriptions_sum_to_distinct_units(rows in arb_rows()) {
        let table = survey_table(&rows);
        let out = aggregate(&table, &AggregationRequest::new().metrics(vec![Metric::richness()])).unwrap();
        let counted: i64 = out
            .require_column("n_descriptions")
            .unwrap()
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|x| x as i64)
            .sum();
        let distinct: std::collections::HashSet<i64> = rows.iter().map(|r| r.0).collect();
        prop_assert_eq!(counted as usize, distinct.len());
    }
}

#[test]
fn filters_keep_row_order() {
    let table = survey_table(&[(3, 0, Some(10), 0), (1, 1, Some(20), 1), (2, 2, Some(30), 2)]);
    let spec = FilterSpec::new().with("impact_type", FilterRule::Contains("DAM".into()));
    let out = apply_filters(&table, Some(&spec)).unwrap();
    let ids: Vec<&Value> = out.require_column("description_id").unwrap().iter().collect();
    assert_eq!(ids, vec![&Value::Int(3), &Value::Int(2)]);
}
