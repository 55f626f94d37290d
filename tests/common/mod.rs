//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::time::Duration;

use colagg::{ParallelConfig, Record, Result, Table, Value};

/// Three-row table from the regional sales example
pub fn sales_table() -> Result<Table> {
    Table::from_records(vec![
        Record::new().with("region", "east").with("sales", 10.0),
        Record::new().with("region", "east").with("sales", 20.0),
        Record::new().with("region", "west").with("sales", f64::NAN),
    ])
}

/// Config with small chunks so tests exercise several batches
pub fn small_config(workers: usize, min_chunk_rows: usize) -> Result<ParallelConfig> {
    ParallelConfig::builder()
        .workers(workers)
        .batch_cap(4)
        .chunks_per_worker(2)
        .min_chunk_rows(min_chunk_rows)
        .task_timeout(Duration::from_secs(30))
        .build()
}

/// Serialized rows ordered by the given key columns
pub fn key_sorted_json(table: &Table, keys: &[&str]) -> Result<String> {
    let mut records = table.to_records();
    records.sort_by_key(|record| {
        keys.iter()
            .map(|k| record.get(k).map(Value::to_text).unwrap_or_default())
            .collect::<Vec<_>>()
    });
    Ok(serde_json::to_string(&records)?)
}

/// Asserts two results hold the same groups and values, numbers compared
/// with a relative tolerance
pub fn assert_tables_close(left: &Table, right: &Table, keys: &[&str], rel_tol: f64) {
    assert_eq!(left.column_names(), right.column_names());
    assert_eq!(left.row_count(), right.row_count());

    let sorted = |table: &Table| {
        let mut records = table.to_records();
        records.sort_by_key(|record| {
            keys.iter()
                .map(|k| record.get(k).map(Value::to_text).unwrap_or_default())
                .collect::<Vec<_>>()
        });
        records
    };

    for (l, r) in sorted(left).iter().zip(sorted(right).iter()) {
        for (name, lv) in l.iter() {
            let rv = r.get(name);
            match (lv, rv) {
                (Value::Number(a), Some(Value::Number(b))) => {
                    if a.is_finite() && b.is_finite() {
                        let scale = a.abs().max(b.abs()).max(1.0);
                        assert!(
                            (a - b).abs() <= rel_tol * scale,
                            "{}: {} vs {}",
                            name,
                            a,
                            b
                        );
                    } else {
                        assert!(a == b || (a.is_nan() && b.is_nan()), "{}: {} vs {}", name, a, b);
                    }
                }
                _ => assert_eq!(Some(lv), rv, "{}", name),
            }
        }
    }
}
