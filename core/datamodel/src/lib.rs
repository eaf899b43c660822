//! FILENAME: core/datamodel/src/lib.rs
//! PURPOSE: Value model shared by the pivot engine and the interchange code.
//! CONTEXT: Scalars, tuples (row keys and header keys), the axis schema, and
//! packing of json array values along a 1-based index axis.

pub mod error;
pub mod json_index;
pub mod schema;
pub mod tuple;
pub mod value;

pub use error::ValueError;
pub use json_index::{pack_json_array, unpack_json_array, MAX_JSON_ARRAY_LEN};
pub use schema::{AxisSchema, AxisType};
pub use tuple::{RowKey, Tuple};
pub use value::{OrderedFloat, ScalarValue};
