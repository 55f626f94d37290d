use crate::column::Column;
use crate::config::ParallelConfig;
use crate::error::{Error, Result};
use crate::table::Table;

/// Half-open row range `[start, end)` of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl ChunkRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Row range plus owned copies of the columns a task needs
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    columns: Vec<(String, Column)>,
}

impl Chunk {
    pub fn new(range: ChunkRange, columns: Vec<(String, Column)>) -> Self {
        Self {
            index: range.index,
            start: range.start,
            end: range.end,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Column carried by this chunk
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

/// Partitions a table into row-range chunks sized for a worker pool
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    workers: usize,
    chunks_per_worker: usize,
    min_chunk_rows: usize,
}

impl ChunkPlanner {
    pub fn new(config: &ParallelConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            chunks_per_worker: config.chunks_per_worker.max(1),
            min_chunk_rows: config.min_chunk_rows.max(1),
        }
    }

    /// `max(min_chunk_rows, ceil(rows / (workers * chunks_per_worker)))`
    pub fn chunk_size(&self, rows: usize) -> usize {
        let slots = self.workers * self.chunks_per_worker;
        let even = (rows + slots - 1) / slots;
        even.max(self.min_chunk_rows)
    }

    /// Ranges tiling `[0, rows)`; no ranges for an empty table
    pub fn plan(&self, rows: usize) -> Vec<ChunkRange> {
        let size = self.chunk_size(rows);
        let mut ranges = Vec::with_capacity((rows + size - 1) / size);
        let mut start = 0;
        while start < rows {
            let end = (start + size).min(rows);
            ranges.push(ChunkRange {
                index: ranges.len(),
                start,
                end,
            });
            start = end;
        }
        ranges
    }

    /// Plans `table` and copies `columns` into every chunk
    pub fn split<S: AsRef<str>>(&self, table: &Table, columns: &[S]) -> Result<Vec<Chunk>> {
        let sources = columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                table.column(name).map(|c| (name.to_string(), c))
            })
            .collect::<Result<Vec<_>>>()?;

        let ranges = self.plan(table.row_count());
        log::debug!(
            "planned {} chunk(s) of up to {} rows over {} rows",
            ranges.len(),
            self.chunk_size(table.row_count()),
            table.row_count()
        );

        Ok(ranges
            .into_iter()
            .map(|range| {
                let columns = sources
                    .iter()
                    .map(|(name, col)| (name.clone(), col.slice(range.start, range.end)))
                    .collect();
                Chunk::new(range, columns)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(workers: usize, chunks_per_worker: usize, min_chunk_rows: usize) -> ChunkPlanner {
        let config = ParallelConfig {
            workers,
            chunks_per_worker,
            min_chunk_rows,
            ..ParallelConfig::default()
        };
        ChunkPlanner::new(&config)
    }

    fn assert_tiles(ranges: &[ChunkRange], rows: usize) {
        let mut expected_start = 0;
        for (i, range) in ranges.iter().enumerate() {
            assert_eq!(range.index, i);
            assert_eq!(range.start, expected_start);
            assert!(!range.is_empty());
            expected_start = range.end;
        }
        assert_eq!(expected_start, rows);
    }

    #[test]
    fn ranges_tile_for_many_shapes() {
        for rows in [0, 1, 2, 7, 99, 100, 101, 1000, 4097] {
            for workers in [1, 2, 3, 4, 16] {
                for min_rows in [1, 10, 100] {
                    let ranges = planner(workers, 2, min_rows).plan(rows);
                    assert_tiles(&ranges, rows);
                }
            }
        }
    }

    #[test]
    fn empty_table_has_no_chunks() {
        assert!(planner(4, 2, 1).plan(0).is_empty());
    }

    #[test]
    fn chunk_size_respects_minimum() {
        let p = planner(4, 2, 100_000);
        assert_eq!(p.chunk_size(1_000), 100_000);
        assert_eq!(p.plan(1_000).len(), 1);

        let p = planner(4, 2, 10);
        assert_eq!(p.chunk_size(1_000), 125);
        assert_eq!(p.plan(1_000).len(), 8);
    }
}
