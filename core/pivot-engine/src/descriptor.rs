//! FILENAME: core/pivot-engine/src/descriptor.rs
//! Entity-kind descriptors: what kind of class a pivot shows and which axes
//! that implies. One generic model serves object classes and relationship
//! classes; the descriptor carries the difference.

use datamodel::AxisType;
use serde::{Deserialize, Serialize};

use crate::catalog::AxisGroup;
use crate::config::PivotConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Object,
    Relationship,
}

/// How parameter values are laid out along axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueMode {
    /// One scalar per (entity, parameter, index).
    Scalar,
    /// Json array values exploded along the json axis.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    ObjectClass {
        name: String,
    },
    RelationshipClass {
        name: String,
        object_classes: Vec<String>,
    },
}

impl EntityKind {
    pub fn object_class(name: impl Into<String>) -> Self {
        EntityKind::ObjectClass { name: name.into() }
    }

    pub fn relationship_class<S: Into<String>>(
        name: impl Into<String>,
        object_classes: impl IntoIterator<Item = S>,
    ) -> Self {
        EntityKind::RelationshipClass {
            name: name.into(),
            object_classes: object_classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            EntityKind::ObjectClass { name } | EntityKind::RelationshipClass { name, .. } => name,
        }
    }

    pub fn class_kind(&self) -> ClassKind {
        match self {
            EntityKind::ObjectClass { .. } => ClassKind::Object,
            EntityKind::RelationshipClass { .. } => ClassKind::Relationship,
        }
    }

    /// `(axis name, object class)` for every entity component. A relationship
    /// class that repeats an object class gets numbered axis names.
    pub fn object_axes(&self) -> Vec<(String, String)> {
        match self {
            EntityKind::ObjectClass { name } => vec![(name.clone(), name.clone())],
            EntityKind::RelationshipClass { object_classes, .. } => {
                let mut out: Vec<(String, String)> = Vec::with_capacity(object_classes.len());
                for class in object_classes {
                    let occurrences = object_classes
                        .iter()
                        .take(out.len())
                        .filter(|c| *c == class)
                        .count();
                    let axis = if occurrences == 0 {
                        class.clone()
                    } else {
                        format!("{} ({})", class, occurrences + 1)
                    };
                    out.push((axis, class.clone()));
                }
                out
            }
        }
    }

    pub fn entity_axes(&self) -> Vec<String> {
        self.object_axes().into_iter().map(|(axis, _)| axis).collect()
    }

    /// The tuple group spanning a relationship's object axes.
    pub fn relationship_group(&self) -> Option<AxisGroup> {
        match self {
            EntityKind::ObjectClass { .. } => None,
            EntityKind::RelationshipClass { .. } => Some(AxisGroup::new(self.entity_axes())),
        }
    }

    /// Axis names and types for this kind under `mode`:
    /// entity axes, parameter, index, then the json axis in json mode.
    pub fn axes(&self, mode: ValueMode, config: &PivotConfig) -> (Vec<String>, Vec<AxisType>) {
        let mut names = self.entity_axes();
        let mut types = vec![AxisType::Text; names.len()];
        names.push(config.parameter_axis.clone());
        types.push(AxisType::Text);
        names.push(config.index_axis.clone());
        types.push(AxisType::Integer);
        if mode == ValueMode::Json {
            names.push(config.json_axis.clone());
            types.push(AxisType::Integer);
        }
        (names, types)
    }
}

/// Key under which a layout preference is remembered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub class_name: String,
    pub class_kind: ClassKind,
    pub value_mode: ValueMode,
}

impl Selection {
    pub fn of(kind: &EntityKind, value_mode: ValueMode) -> Self {
        Selection {
            class_name: kind.class_name().to_string(),
            class_kind: kind.class_kind(),
            value_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_class_axes() {
        let kind = EntityKind::object_class("unit");
        let (names, types) = kind.axes(ValueMode::Scalar, &PivotConfig::default());
        assert_eq!(names, vec!["unit", "db parameter", "db index"]);
        assert_eq!(types, vec![AxisType::Text, AxisType::Text, AxisType::Integer]);
        assert!(kind.relationship_group().is_none());
    }

    #[test]
    fn test_relationship_axes_in_json_mode() {
        let kind = EntityKind::relationship_class("unit__node", ["unit", "node"]);
        let (names, _) = kind.axes(ValueMode::Json, &PivotConfig::default());
        assert_eq!(names, vec!["unit", "node", "db parameter", "db index", "json time"]);
        assert_eq!(kind.relationship_group(), Some(AxisGroup::new(["unit", "node"])));
    }

    #[test]
    fn test_repeated_object_class_gets_numbered_axis() {
        let kind = EntityKind::relationship_class("node__node", ["node", "node"]);
        assert_eq!(
            kind.object_axes(),
            vec![
                ("node".to_string(), "node".to_string()),
                ("node (2)".to_string(), "node".to_string()),
            ]
        );
    }
}
