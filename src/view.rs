//! Per-screen view state: the loaded list, its filters and the derived visible list

use tracing::{debug, info};

use crate::filter::{self, FilterSet};
use crate::models::Record;
use crate::source::{Loaded, Origin};

/// Load lifecycle of a screen. There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    /// Ready, but showing fallback data
    Degraded,
}

/// Handle for one in-flight load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone)]
pub struct ViewState {
    source: Vec<Record>,
    visible: Vec<Record>,
    filters: FilterSet,
    phase: Phase,
    issued: u64,
    in_flight: usize,
    closed: bool,
}

impl ViewState {
    pub fn new(filters: FilterSet) -> Self {
        Self {
            source: Vec::new(),
            visible: Vec::new(),
            filters,
            phase: Phase::Idle,
            issued: 0,
            in_flight: 0,
            closed: false,
        }
    }

    /// Enter `Loading`; the returned ticket is handed back to [`Self::finish_load`]
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        self.in_flight += 1;
        self.phase = Phase::Loading;
        LoadTicket(self.issued)
    }

    /// Apply a finished load. Loads are not deduplicated: whichever resolves
    /// last wins. Returns false when the view was closed and the result dropped.
    pub fn finish_load(&mut self, ticket: LoadTicket, loaded: Loaded<Vec<Record>>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.closed {
            info!("Discarding load {} for a closed view", ticket.0);
            return false;
        }
        if ticket.0 < self.issued {
            debug!("Load {} resolved after load {} was issued", ticket.0, self.issued);
        }

        self.phase = match loaded.origin {
            Origin::Live => Phase::Ready,
            Origin::Fallback => Phase::Degraded,
        };
        self.set_source(loaded.payload);
        true
    }

    /// Replace the source list wholesale and recompute
    pub fn set_source(&mut self, records: Vec<Record>) {
        self.source = records;
        self.recompute();
    }

    pub fn set_filter(&mut self, key: &str, value: &str) -> bool {
        let known = self.filters.set(key, value);
        if known {
            self.recompute();
        }
        known
    }

    pub fn set_filter_options(&mut self, key: &str, options: Vec<String>) {
        self.filters.set_options(key, options);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.recompute();
    }

    /// Mutate filter controls in place (TUI editing) and recompute afterwards
    pub fn edit_filters<F: FnOnce(&mut FilterSet)>(&mut self, edit: F) {
        edit(&mut self.filters);
        self.recompute();
    }

    /// Explicit "apply" trigger; the same pure derivation run again
    pub fn reapply(&mut self) {
        self.recompute();
    }

    /// Drop records whose id matches, e.g. after a confirmed delete
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.source.len();
        let kept: Vec<Record> = self.source.iter().filter(|r| r.id() != id).cloned().collect();
        let removed = kept.len() != before;
        self.set_source(kept);
        removed
    }

    /// Mark the view as gone; later loads are discarded
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn source(&self) -> &[Record] {
        &self.source
    }

    pub fn visible(&self) -> &[Record] {
        &self.visible
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Message for an empty table, distinguishing no data from no matches
    pub fn empty_message(&self) -> Option<&'static str> {
        if !self.visible.is_empty() || self.is_loading() {
            None
        } else if self.source.is_empty() {
            Some("لا توجد بيانات في النظام")
        } else {
            Some("لا توجد نتائج تطابق معايير البحث")
        }
    }

    fn recompute(&mut self) {
        self.visible = filter::apply(&self.source, &self.filters.specs());
    }
}
