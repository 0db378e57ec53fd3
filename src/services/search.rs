//! Cancellable search tasks
//!
//! Searches run on the tokio runtime and report through a one-shot
//! completion callback. The callback fires at most once; cancelling a
//! task before the work finishes suppresses it entirely. State changes
//! and the callback hand-off happen under a single lock so a completion
//! racing a cancellation can never fire twice or fire after cancel.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::media::result::{MediaKind, MetadataResult};
use crate::services::metadata::MetadataService;

enum TaskState<T> {
    Pending(Box<dyn FnOnce(T) + Send>),
    Cancelled,
    Completed,
}

/// Handle to an in-flight search.
pub struct SearchTask<T> {
    state: Arc<Mutex<TaskState<T>>>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> SearchTask<T> {
    /// Run `work` on the runtime and deliver its output to `completion`,
    /// unless the task is cancelled first.
    pub fn spawn<F>(work: F, completion: impl FnOnce(T) + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let state = Arc::new(Mutex::new(TaskState::Pending(Box::new(completion))));
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            let value = work.await;
            let callback = {
                let mut state = task_state.lock();
                match mem::replace(&mut *state, TaskState::Completed) {
                    TaskState::Pending(callback) => Some(callback),
                    TaskState::Cancelled => {
                        *state = TaskState::Cancelled;
                        None
                    }
                    TaskState::Completed => None,
                }
            };
            if let Some(callback) = callback {
                callback(value);
            }
        });

        Self { state, handle }
    }

    /// Drop the completion callback. The underlying work may still run
    /// to completion but its output is discarded.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if matches!(*state, TaskState::Pending(_)) {
            *state = TaskState::Cancelled;
        }
    }

    /// Wait for the underlying work to settle. Test and shutdown helper;
    /// normal callers rely on the completion callback.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }
}

/// A movie or TV show search bound to one provider and language.
#[derive(Clone)]
pub enum MetadataSearch {
    Movie {
        service: Arc<dyn MetadataService>,
        title: String,
        language: String,
    },
    TvShow {
        service: Arc<dyn MetadataService>,
        series: String,
        season: Option<u32>,
        episode: Option<u32>,
        language: String,
    },
}

impl MetadataSearch {
    pub fn movie(service: Arc<dyn MetadataService>, title: &str, language: &str) -> Self {
        Self::Movie {
            service,
            title: title.to_string(),
            language: language.to_string(),
        }
    }

    pub fn tv_show(
        service: Arc<dyn MetadataService>,
        series: &str,
        season: Option<u32>,
        episode: Option<u32>,
        language: &str,
    ) -> Self {
        Self::TvShow {
            service,
            series: series.to_string(),
            season,
            episode,
            language: language.to_string(),
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::Movie { .. } => MediaKind::Movie,
            Self::TvShow { .. } => MediaKind::TvShow,
        }
    }

    /// Start the search. Provider failures surface as an empty list.
    pub fn run(
        &self,
        completion: impl FnOnce(Vec<MetadataResult>) + Send + 'static,
    ) -> SearchTask<Vec<MetadataResult>> {
        let search = self.clone();
        SearchTask::spawn(
            async move {
                match search {
                    MetadataSearch::Movie {
                        service,
                        title,
                        language,
                    } => service.search_movie(&title, &language).await,
                    MetadataSearch::TvShow {
                        service,
                        series,
                        season,
                        episode,
                        language,
                    } => {
                        service
                            .search_tv_show(&series, &language, season, episode)
                            .await
                    }
                }
            },
            completion,
        )
    }

    /// Load the full record for one search hit.
    pub fn load_additional(
        &self,
        result: MetadataResult,
        completion: impl FnOnce(MetadataResult) + Send + 'static,
    ) -> SearchTask<MetadataResult> {
        let search = self.clone();
        SearchTask::spawn(
            async move {
                match search {
                    MetadataSearch::Movie {
                        service, language, ..
                    } => service.load_movie_metadata(result, &language).await,
                    MetadataSearch::TvShow {
                        service, language, ..
                    } => service.load_tv_metadata(result, &language).await,
                }
            },
            completion,
        )
    }
}

/// Series-name completion search.
#[derive(Clone)]
pub struct MetadataNameSearch {
    pub service: Arc<dyn MetadataService>,
    pub series: String,
    pub language: String,
}

impl MetadataNameSearch {
    pub fn tv_series(service: Arc<dyn MetadataService>, series: &str, language: &str) -> Self {
        Self {
            service,
            series: series.to_string(),
            language: language.to_string(),
        }
    }

    /// Query the selected language and, when it differs, the provider's
    /// default language too, returning the deduplicated union.
    pub fn run(
        &self,
        completion: impl FnOnce(Vec<String>) + Send + 'static,
    ) -> SearchTask<Vec<String>> {
        let search = self.clone();
        SearchTask::spawn(
            async move {
                let mut names = search
                    .service
                    .search_tv_show_names(&search.series, &search.language)
                    .await;

                let fallback = search.service.default_language();
                if search.language != fallback {
                    names.extend(
                        search
                            .service
                            .search_tv_show_names(&search.series, &fallback)
                            .await,
                    );
                }

                let mut seen = Vec::with_capacity(names.len());
                for name in names {
                    if !seen
                        .iter()
                        .any(|s: &String| s.eq_ignore_ascii_case(&name))
                    {
                        seen.push(name);
                    }
                }
                seen
            },
            completion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_completion_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let task = SearchTask::spawn(async { 7usize }, move |v| {
            assert_eq!(v, 7);
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        task.wait().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_suppresses_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let task = SearchTask::spawn(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                1usize
            },
            move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
            },
        );
        task.cancel();
        task.wait().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_a_no_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let task = SearchTask::spawn(async { 1usize }, move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.cancel();
        task.wait().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
