//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot engine for class/object/relationship parameter data.
//!
//! Layers:
//! - `model`: the pivot itself (keys, layout, headers, Edit/Delete Sets)
//! - `catalog`: index entries per axis and tuple entries per axis group
//! - `proxy`: per-axis value filters over the model's headers
//! - `writeback`: translation of unsaved changes into backing-store calls
//! - `session`: one open editor tying a store, a model and a proxy together

pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod layout;
pub mod model;
pub mod preferences;
pub mod projection;
pub mod proxy;
pub mod session;
pub mod store;
pub mod writeback;

pub use capabilities::{Editable, Filterable, Reloadable};
pub use catalog::{AxisGroup, IndexEntryCatalog};
pub use config::{PivotConfig, ValidRange};
pub use descriptor::{ClassKind, EntityKind, Selection, ValueMode};
pub use error::{LayoutError, PivotError, StoreError};
pub use events::PivotEvent;
pub use identifiers::{EntityRef, IdentifierMap, ItemId, ObjectIds, ValueKey};
pub use layout::{AxisRole, PivotLayout};
pub use model::{Direction, PivotData, PivotTableModel};
pub use preferences::PivotPreferences;
pub use proxy::PivotFilterProxy;
pub use session::PivotSession;
pub use store::{BackingStore, MemoryStore, ValuePayload};
pub use writeback::{WriteBack, WriteBackError, WriteBackOutcome, WriteBackReport};
