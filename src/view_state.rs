//! Load state for views that fetch their data from the upstream API.
//!
//! A fetch is started with [ViewLoader::begin], which hands out a
//! [FetchTicket], and completed with [ViewLoader::finish]. Only the most
//! recent ticket may change the state, so a slow response that arrives after
//! a newer fetch has started is discarded.
//!
//! Every request gets its own loader through [load]. Loaders are never shared
//! between requests, so one session cannot be shown data fetched for another.

use std::future::Future;

use crate::Error;

/// Where a view is in loading its data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    /// The fetch failed. Holds the message shown to the user.
    Error(String),
}

impl<T> From<Result<T, Error>> for LoadState<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => LoadState::Success(value),
            Err(error) => LoadState::Error(error.to_string()),
        }
    }
}

/// Identifies one fetch started by [ViewLoader::begin].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct ViewLoader<T> {
    generation: u64,
    state: LoadState<T>,
}

impl<T> ViewLoader<T> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn into_state(self) -> LoadState<T> {
        self.state
    }

    /// Start a new fetch. Any earlier fetch still in flight becomes stale.
    pub fn begin(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = LoadState::Loading;

        FetchTicket(self.generation)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Record the outcome of the fetch identified by `ticket`.
    ///
    /// Returns `false` and leaves the state untouched if a newer fetch has
    /// been started since.
    pub fn finish(&mut self, ticket: FetchTicket, result: Result<T, Error>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!("discarding stale fetch result {ticket:?}");
            return false;
        }

        self.state = result.into();
        true
    }
}

/// Run `fetch` for one request and return the state the view should render.
///
/// The state is always the outcome of `fetch` itself.
pub async fn load<T, F>(fetch: F) -> LoadState<T>
where
    F: Future<Output = Result<T, Error>>,
{
    let mut loader = ViewLoader::new();
    let ticket = loader.begin();

    let result = fetch.await;
    loader.finish(ticket, result);

    loader.into_state()
}
