//! Per-view list state.
//!
//! Each list view owns one [`ViewState`]: the last fetched snapshot, a
//! loading flag, an error banner, and the filter inputs. Views share
//! nothing; another view's mutations are only seen after the next fetch.
//!
//! Fetches are tagged with a [`FetchTicket`]. Starting a new fetch or
//! invalidating the view (e.g. on navigation away) makes every older ticket
//! stale, and results delivered with a stale ticket are dropped.

use std::fmt::Display;

use crate::filter::{FilterMode, Searchable, filter};

/// Identifies one fetch started by [`ViewState::begin_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket(u64);

#[derive(Debug, Clone)]
pub struct ViewState<T> {
    data: Vec<T>,
    loading: bool,
    error: Option<String>,
    filter_query: String,
    filter_mode: FilterMode,
    generation: u64,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            loading: false,
            error: None,
            filter_query: String::new(),
            filter_mode: FilterMode::Substring,
            generation: 0,
        }
    }
}

impl<T> ViewState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    /// Mark the view as loading and hand out a ticket for the result.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket(self.generation)
    }

    /// Apply the outcome of a fetch.
    ///
    /// On success the snapshot is replaced and the error cleared. On
    /// failure the previous snapshot stays and `failure_message` becomes
    /// the error banner; the underlying error is only logged.
    ///
    /// Returns `false` (and changes nothing) for a stale ticket.
    pub fn finish<E: Display>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<T>, E>,
        failure_message: &str,
    ) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                "Dropping stale fetch result (ticket {}, current {})",
                ticket.0,
                self.generation
            );
            return false;
        }

        match result {
            Ok(data) => {
                self.data = data;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!("{}: {}", failure_message, e);
                self.error = Some(failure_message.to_string());
            }
        }
        self.loading = false;
        true
    }

    /// Show an error banner for a failed mutation, keeping the data.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Drop interest in every fetch in flight.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.loading = false;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter_query = query.into();
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
    }

    /// Flip between substring and regular-expression matching.
    pub fn toggle_regexp(&mut self) {
        self.filter_mode = match self.filter_mode {
            FilterMode::Substring => FilterMode::RegExp,
            FilterMode::RegExp => FilterMode::Substring,
        };
    }
}

impl<T: Searchable> ViewState<T> {
    /// The records to display under the current filter inputs.
    pub fn visible(&self) -> Vec<&T> {
        filter(self.data.iter().collect(), &self.filter_query, self.filter_mode)
    }
}
