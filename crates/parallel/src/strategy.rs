//! Parallel processing strategies

use rayon::prelude::*;
use topowind_core::{Error, Result};

/// Processing mode for the azimuth loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a user-facing thread count: 0 = all cores, 1 = sequential.
    pub fn from_threads(threads: usize) -> Self {
        match threads {
            0 => ProcessingMode::Parallel,
            1 => ProcessingMode::Sequential,
            n => ProcessingMode::ParallelWith(n),
        }
    }

    /// Number of worker threads this mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }

    /// Fill consecutive `chunk`-sized pieces of `buf` in parallel; `f` gets
    /// the piece index and the piece. The first error (in index order) is
    /// returned.
    pub fn try_par_chunks<T, F>(&self, buf: &mut [T], chunk: usize, f: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
    {
        if chunk == 0 {
            return Err(Error::InvalidParameter {
                name: "chunk",
                value: "0".into(),
                reason: "chunks must hold at least one element".into(),
            });
        }
        let run = |buf: &mut [T]| -> Result<()> {
            let results: Vec<Result<()>> = buf
                .par_chunks_mut(chunk)
                .enumerate()
                .map(|(k, piece)| f(k, piece))
                .collect();
            collect_ordered(results)
        };
        match self {
            ProcessingMode::Sequential => buf
                .chunks_mut(chunk)
                .enumerate()
                .try_for_each(|(k, piece)| f(k, piece)),
            ProcessingMode::Parallel => run(buf),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::ResourceExhausted(format!("thread pool: {}", e)))?;
                pool.install(|| run(buf))
            }
        }
    }
}

/// Keep every result until the join so the reported error does not depend on
/// completion order.
fn collect_ordered(results: Vec<Result<()>>) -> Result<()> {
    results.into_iter().collect()
}

/// Get the number of threads in the global pool
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(0), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(1), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(4), ProcessingMode::ParallelWith(4));
        assert_eq!(ProcessingMode::ParallelWith(3).threads(), 3);
    }

    #[test]
    fn test_chunks_filled_in_place() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let mut buf = vec![0usize; 12];
            mode.try_par_chunks(&mut buf, 4, |k, piece| {
                piece.iter_mut().for_each(|v| *v = k);
                Ok(())
            })
            .unwrap();
            assert_eq!(buf, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
        }
        let mut empty: Vec<u8> = Vec::new();
        assert!(ProcessingMode::Parallel
            .try_par_chunks(&mut empty, 0, |_, _| Ok(()))
            .is_err());
    }

    #[test]
    fn test_first_error_by_index() {
        let mut buf = vec![0usize; 20];
        let err = ProcessingMode::Parallel
            .try_par_chunks(&mut buf, 1, |i, piece| {
                if i % 7 == 3 {
                    Err(Error::InvalidGeometry(format!("index {}", i)))
                } else {
                    piece[0] = i;
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid geometry: index 3");
    }
}
