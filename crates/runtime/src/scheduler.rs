use std::fmt;

use tracing::debug;

use crate::bands::{RowBand, partition_rows, split_row_bands};

#[derive(Debug)]
pub enum PoolError {
    NoWorkers,
    Build(rayon::ThreadPoolBuildError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::NoWorkers => write!(f, "worker count must be at least 1"),
            PoolError::Build(err) => write!(f, "failed to start worker threads: {err}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Fixed-size fork-join pool over row bands.
///
/// The worker count is decided once; every [`run_bands`](Self::run_bands)
/// call splits the buffer into exactly that many bands, runs one task per
/// band and returns only after all of them finished. There is no
/// cancellation: a band that never returns stalls the caller.
pub struct BandScheduler {
    workers: usize,
    pool: rayon::ThreadPool,
}

impl BandScheduler {
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("band-worker-{i}"))
            .build()
            .map_err(PoolError::Build)?;

        Ok(Self { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `work` once per band of `data`, a row-major buffer of
    /// `row_len`-element rows.
    pub fn run_bands<T, F>(&self, data: &mut [T], row_len: usize, work: F)
    where
        T: Send,
        F: Fn(RowBand<'_, T>) + Sync,
    {
        let rows = data.len().checked_div(row_len).unwrap_or(0);
        let ranges = partition_rows(rows, self.workers);
        let bands = split_row_bands(data, row_len, &ranges);
        let work = &work;

        self.pool.scope(|scope| {
            for (i, band) in bands.into_iter().enumerate() {
                scope.spawn(move |_| {
                    debug!("band {i} rows {:?} started", band.rows());
                    work(band);
                    debug!("band {i} finished");
                });
            }
        });
    }
}
