//! Streaming batch API: emit outcomes as documents finish.
//!
//! Unlike [`crate::analyze::Analyzer::analyze_many`], which returns only
//! after every document is done and keeps input order, [`analyze_stream`]
//! yields `(path, outcome)` pairs via a `Stream` in completion order. Up to
//! `config.concurrency` documents are in flight at once.

use crate::analyze::Analyzer;
use crate::output::AnalysisOutcome;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of finished analyses.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = (PathBuf, AnalysisOutcome)> + Send>>;

/// Analyze `paths`, streaming outcomes as they complete.
///
/// Batch progress events fire as for `analyze_many`: `on_batch_start` on
/// the first poll, `on_batch_complete` once the last outcome has been
/// yielded. An empty batch fires both immediately with a total of 0.
///
/// # Example
/// ```rust,no_run
/// use transcript_lens::{analyze_stream, Analyzer};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let analyzer = Analyzer::default();
/// let mut outcomes = analyze_stream(&analyzer, vec!["a.pdf".into(), "b.txt".into()]);
/// while let Some((path, outcome)) = outcomes.next().await {
///     println!("{}: {:?}", path.display(), outcome.institution_key());
/// }
/// # }
/// ```
pub fn analyze_stream(analyzer: &Analyzer, paths: Vec<PathBuf>) -> OutcomeStream {
    let total = paths.len();
    let concurrency = analyzer.config().concurrency;
    let callback = analyzer.config().progress_callback.clone();
    let analyzer = analyzer.clone();
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let successes = Arc::new(AtomicUsize::new(0));

    info!("Streaming analysis of {} documents", total);

    if total == 0 {
        if let Some(ref cb) = callback {
            cb.on_batch_start(0);
            cb.on_batch_complete(0, 0);
        }
        return Box::pin(stream::empty::<(PathBuf, AnalysisOutcome)>());
    }

    let s = stream::iter(paths.into_iter().map(move |path| {
        let analyzer = analyzer.clone();
        let started = Arc::clone(&started);
        async move {
            if started.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(ref cb) = analyzer.config().progress_callback {
                    cb.on_batch_start(total);
                }
            }
            let outcome = analyzer.analyze_path(&path).await;
            (path, outcome)
        }
    }))
    .buffer_unordered(concurrency)
    .inspect(move |(_, outcome)| {
        if outcome.success {
            successes.fetch_add(1, Ordering::SeqCst);
        }
        if finished.fetch_add(1, Ordering::SeqCst) + 1 == total {
            info!(
                "Stream complete: {}/{} detected",
                successes.load(Ordering::SeqCst),
                total
            );
            if let Some(ref cb) = callback {
                cb.on_batch_complete(total, successes.load(Ordering::SeqCst));
            }
        }
    });

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::progress::AnalysisProgressCallback;
    use crate::Catalog;

    #[derive(Default)]
    struct Counts {
        batch_start: AtomicUsize,
        batch_success: AtomicUsize,
        batch_complete: AtomicUsize,
        docs: AtomicUsize,
    }

    impl AnalysisProgressCallback for Counts {
        fn on_batch_start(&self, _total: usize) {
            self.batch_start.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _file_name: &str, _outcome: &AnalysisOutcome) {
            self.docs.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.batch_complete.fetch_add(1, Ordering::SeqCst);
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn stream_yields_every_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("buet.txt");
        let b = dir.path().join("notes.txt");
        std::fs::write(&a, "GPA 3.75").unwrap();
        std::fs::write(&b, "nothing here").unwrap();

        let counts = Arc::new(Counts::default());
        let config = AnalysisConfig::builder()
            .concurrency(2)
            .progress_callback(counts.clone())
            .build()
            .unwrap();
        let analyzer = Analyzer::new(Arc::new(Catalog::builtin()), config);

        let mut results: Vec<(PathBuf, AnalysisOutcome)> =
            analyze_stream(&analyzer, vec![a.clone(), b.clone()]).collect().await;
        results.sort_by(|x, y| x.0.cmp(&y.0));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, a);
        assert!(results[0].1.success);
        assert!(!results[1].1.success);
        assert_eq!(counts.batch_start.load(Ordering::SeqCst), 1);
        assert_eq!(counts.docs.load(Ordering::SeqCst), 2);
        assert_eq!(counts.batch_success.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_stream_finishes() {
        let analyzer = Analyzer::default();
        let results: Vec<_> = analyze_stream(&analyzer, vec![]).collect().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_batch_fires_callbacks_like_analyze_many() {
        let counts = Arc::new(Counts::default());
        let config = AnalysisConfig::builder()
            .progress_callback(counts.clone())
            .build()
            .unwrap();
        let analyzer = Analyzer::new(Arc::new(Catalog::builtin()), config);

        let results: Vec<_> = analyze_stream(&analyzer, vec![]).collect().await;
        assert!(results.is_empty());
        assert_eq!(counts.batch_start.load(Ordering::SeqCst), 1);
        assert_eq!(counts.batch_complete.load(Ordering::SeqCst), 1);

        let outcomes = analyzer.analyze_many::<PathBuf>(&[]).await;
        assert!(outcomes.is_empty());
        assert_eq!(counts.batch_start.load(Ordering::SeqCst), 2);
        assert_eq!(counts.batch_complete.load(Ordering::SeqCst), 2);
    }
}
