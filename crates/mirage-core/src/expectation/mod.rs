//! Expectations and the store that orders and matches them.

mod core;
mod expiry;
mod listener;
mod store;
mod types;

pub use self::core::{Expectation, ExpectationDefinition};
pub use expiry::spawn_expiry_sweeper;
pub use listener::{ExpectationListener, StoreSnapshot};
pub use store::{ExpectationStore, DEFAULT_MAX_EXPECTATIONS};
pub use types::{ClearType, ExpectationError, Format, InvalidParameter, MutationCause, RetrieveType};

#[cfg(test)]
mod tests;
