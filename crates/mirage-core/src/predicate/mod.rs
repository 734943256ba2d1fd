//! Matchers: strings, multi-valued maps, bodies and whole requests.
//!
//! This module provides:
//! - `string` - `NottableString` comparison with case and control-plane options
//! - `multimap` - one-directional contains-all matching for headers, cookies and parameters
//! - `body` - body matching dispatched on the expected body variant
//! - `request` - `HttpRequestMatcher` and its field-by-field `MatchDifference`

pub mod body;
pub mod form;
pub mod json;
pub mod multimap;
pub mod request;
pub mod schema;
pub mod string;
pub mod xpath;

pub use body::BodyMatcher;
#[allow(unused_imports)]
pub use multimap::{contains_all, first_mismatch};
pub use request::{FieldResult, HttpRequestMatcher, MatchDifference, MatchField};
pub use schema::{JsonSchema, SchemaError};
pub use string::MatchOptions;
