//! FILENAME: core/pivot-engine/src/projection.rs
//! Tuple key projection: extracting sub-tuples of row keys by axis position.

use datamodel::{AxisSchema, RowKey, Tuple, ValueError};

/// Projects `key` onto `positions`, preserving the requested order.
/// One position yields a 1-tuple; no caller needs to special-case arity.
pub fn project(key: &RowKey, positions: &[usize]) -> Tuple {
    positions.iter().map(|&p| key[p].clone()).collect()
}

/// A cached list of positions for one group of axes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projector {
    positions: Vec<usize>,
}

impl Projector {
    pub fn new<S: AsRef<str>>(schema: &AxisSchema, axes: &[S]) -> Result<Self, ValueError> {
        Ok(Projector {
            positions: schema.positions(axes)?,
        })
    }

    pub fn from_positions(positions: Vec<usize>) -> Self {
        Projector { positions }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn arity(&self) -> usize {
        self.positions.len()
    }

    pub fn project(&self, key: &RowKey) -> Tuple {
        project(key, &self.positions)
    }
}

/// Rebuilds a full key of `arity` components from disjoint projections.
/// Returns None when the parts leave a position unfilled or disagree in length.
pub fn reconstruct(arity: usize, parts: &[(&Projector, &Tuple)]) -> Option<RowKey> {
    let mut slots: Vec<Option<datamodel::ScalarValue>> = vec![None; arity];
    for (projector, tuple) in parts {
        if projector.arity() != tuple.len() {
            return None;
        }
        for (&position, value) in projector.positions().iter().zip(tuple.iter()) {
            *slots.get_mut(position)? = Some(value.clone());
        }
    }
    slots.into_iter().collect::<Option<Vec<_>>>().map(Tuple::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamodel::{tuple, AxisType};

    fn schema() -> AxisSchema {
        AxisSchema::new(
            vec!["a".into(), "b".into(), "db parameter".into(), "db index".into()],
            vec![AxisType::Text, AxisType::Text, AxisType::Text, AxisType::Integer],
        )
        .unwrap()
    }

    #[test]
    fn test_single_and_multi_projection_share_shape() {
        let key = tuple!("x", "y", "p", 1i64);
        assert_eq!(project(&key, &[2]), tuple!("p"));
        assert_eq!(project(&key, &[1, 0]), tuple!("y", "x"));
        assert_eq!(project(&key, &[]), Tuple::new());
    }

    #[test]
    fn test_projector_by_name() {
        let projector = Projector::new(&schema(), &["db index", "a"]).unwrap();
        assert_eq!(projector.project(&tuple!("x", "y", "p", 3i64)), tuple!(3i64, "x"));
        assert!(Projector::new(&schema(), &["nope"]).is_err());
    }

    #[test]
    fn test_reconstruct_inverts_a_partition() {
        let schema = schema();
        let rows = Projector::new(&schema, &["b", "a"]).unwrap();
        let columns = Projector::new(&schema, &["db parameter"]).unwrap();
        let frozen = Projector::new(&schema, &["db index"]).unwrap();
        let key = tuple!("x", "y", "p", 1i64);

        let rebuilt = reconstruct(
            4,
            &[
                (&rows, &rows.project(&key)),
                (&columns, &columns.project(&key)),
                (&frozen, &frozen.project(&key)),
            ],
        );
        assert_eq!(rebuilt, Some(key));
    }

    #[test]
    fn test_reconstruct_with_gap_fails() {
        let schema = schema();
        let rows = Projector::new(&schema, &["a"]).unwrap();
        assert_eq!(reconstruct(4, &[(&rows, &tuple!("x"))]), None);
    }
}
