//! Synthetic data for tests and benchmarks

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::column::{Column, Float64Column, StringColumn};
use crate::error::Result;
use crate::groupby::{AggOp, AggSpec};
use crate::table::Table;

pub const NAMES: [&str; 10] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa",
];

pub const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];

/// Group columns used with [`population_table`]
pub const GROUP_COLUMNS: [&str; 2] = ["name", "region"];

/// Table with `name`, `region`, `population` and `life_expectancy` columns
///
/// `population` holds whole numbers in `[0, 1_000_000)`, so sums over it are
/// exact regardless of summation order. The same seed yields the same table.
pub fn population_table(rows: usize, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut names = Vec::with_capacity(rows);
    let mut regions = Vec::with_capacity(rows);
    let mut population = Vec::with_capacity(rows);
    let mut life_expectancy = Vec::with_capacity(rows);

    for _ in 0..rows {
        names.push(NAMES[rng.random_range(0..NAMES.len())].to_string());
        regions.push(REGIONS[rng.random_range(0..REGIONS.len())].to_string());
        population.push(rng.random_range(0..1_000_000u32) as f64);
        life_expectancy.push(60.0 + rng.random::<f64>() * 30.0);
    }

    Table::from_named_columns(vec![
        ("name".to_string(), Column::String(StringColumn::new(names))),
        ("region".to_string(), Column::String(StringColumn::new(regions))),
        ("population".to_string(), Column::Float64(Float64Column::new(population))),
        (
            "life_expectancy".to_string(),
            Column::Float64(Float64Column::new(life_expectancy)),
        ),
    ])
}

/// Aggregations paired with [`population_table`]
pub fn population_spec() -> AggSpec {
    AggSpec::new()
        .agg("population", [AggOp::Min, AggOp::Mean, AggOp::Max, AggOp::Sum])
        .agg("life_expectancy", [AggOp::Mean])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_table() {
        let a = population_table(50, 7).unwrap();
        let b = population_table(50, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.row_count(), 50);
        let population = a.column("population").unwrap().as_float64().unwrap();
        assert!(population.values().iter().all(|v| v.fract() == 0.0 && *v < 1_000_000.0));
    }
}
