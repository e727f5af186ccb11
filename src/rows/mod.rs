//! Row storage and indexes.
//!
//! - [`Row`] - A record and its page block encoding
//! - [`RowStore`] - Primary-key access over a table's page chain
//! - [`UniqueIndex`] - Value → primary key map for one unique field

mod row;
mod row_store;
mod unique_index;

pub use row::{Row, PRIMARY_KEY_ATTR};
pub use row_store::{RowStore, RowStoreState};
pub use unique_index::UniqueIndex;
