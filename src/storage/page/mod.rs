//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - A fixed-capacity container of length-prefixed blocks
//! - [`PageHeader`] - Identity and chain links at the start of every page

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::{Blocks, Page};
pub use page_header::PageHeader;
