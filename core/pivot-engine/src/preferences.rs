//! FILENAME: core/pivot-engine/src/preferences.rs
//! Remembered layouts per (class, class kind, value mode) selection.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::PivotConfig;
use crate::descriptor::Selection;
use crate::layout::PivotLayout;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotPreferences {
    #[serde(with = "entries")]
    layouts: FxHashMap<Selection, PivotLayout>,
}

impl PivotPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, selection: Selection, layout: PivotLayout) {
        self.layouts.insert(selection, layout);
    }

    pub fn forget(&mut self, selection: &Selection) -> Option<PivotLayout> {
        self.layouts.remove(selection)
    }

    pub fn get(&self, selection: &Selection) -> Option<&PivotLayout> {
        self.layouts.get(selection)
    }

    /// The remembered layout if it still fits `axis_names`, else the default
    /// arrangement. A stale preference (e.g. after a class gained an axis) is
    /// ignored, not repaired.
    pub fn recall(&self, selection: &Selection, axis_names: &[String], config: &PivotConfig) -> PivotLayout {
        match self.layouts.get(selection) {
            Some(layout) if layout.matches_axes(axis_names) => layout.clone(),
            Some(_) => {
                log::debug!(
                    target: "PIVOT",
                    "stored layout for {:?} no longer matches {:?}",
                    selection.class_name,
                    axis_names
                );
                PivotLayout::default_for(axis_names, config)
            }
            None => PivotLayout::default_for(axis_names, config),
        }
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// JSON object keys must be strings, so the map is stored as a list of pairs.
mod entries {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &FxHashMap<Selection, PivotLayout>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FxHashMap<Selection, PivotLayout>, D::Error> {
        let pairs: Vec<(Selection, PivotLayout)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
