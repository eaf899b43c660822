//! FILENAME: core/pivot-engine/src/events.rs
//! Change notifications emitted by the pivot model for a GUI host to render.

use std::collections::BTreeSet;

use datamodel::{ScalarValue, Tuple};

use crate::catalog::{AxisGroup, EntryDiff};

#[derive(Debug, Clone, PartialEq)]
pub enum PivotEvent {
    /// Data was reloaded; everything must be redrawn.
    Reset,
    /// Axes changed roles; header tuples were recomputed.
    LayoutChanged,
    FrozenValueChanged(Tuple),
    /// One cell changed value (edit, clear, or save fold-back).
    CellChanged { row: Tuple, column: Tuple },
    /// Header tuples were added or removed without a layout change.
    HeadersChanged,
    IndexEntriesChanged {
        axis: String,
        diff: EntryDiff<ScalarValue>,
    },
    TupleEntriesChanged {
        group: AxisGroup,
        diff: EntryDiff<Tuple>,
    },
    /// A write-back was folded into the model.
    Saved { succeeded: usize },
}

impl PivotEvent {
    pub(crate) fn entries_added(axis: &str, added: BTreeSet<ScalarValue>) -> Option<Self> {
        if added.is_empty() {
            return None;
        }
        Some(PivotEvent::IndexEntriesChanged {
            axis: axis.to_string(),
            diff: EntryDiff {
                added,
                removed: BTreeSet::new(),
            },
        })
    }

    pub(crate) fn entries_removed(axis: &str, removed: BTreeSet<ScalarValue>) -> Option<Self> {
        if removed.is_empty() {
            return None;
        }
        Some(PivotEvent::IndexEntriesChanged {
            axis: axis.to_string(),
            diff: EntryDiff {
                added: BTreeSet::new(),
                removed,
            },
        })
    }
}

/// A subscriber callback. The engine is single-threaded, so listeners need
/// not be `Send`.
pub type Listener = Box<dyn FnMut(&PivotEvent)>;

/// Fan-out of events to subscribed listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, event: PivotEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
