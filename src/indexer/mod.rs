pub mod extractor;
pub mod lexer;

pub use extractor::SymbolExtractor;
pub use lexer::LineIndex;

use crate::error::{IndexerError, Result};

/// Thread pool for per-file scanning work; `None` or `Some(0)` means one thread per core.
pub fn worker_pool(workers: Option<usize>) -> Result<rayon::ThreadPool> {
    let threads = workers.filter(|&n| n > 0).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("gml-indexer-worker-{i}"))
        .build()
        .map_err(|e| IndexerError::Index(format!("failed to start worker pool: {e}")))
}
