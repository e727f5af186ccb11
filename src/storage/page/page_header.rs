//! Page header.
//!
//! Every page starts with a [`PageHeader`] linking it into its table's
//! page chain.

use crate::common::config::PAGE_HEADER_SIZE;
use crate::common::{Error, PageId, Result};

/// Identity and chain links stored at the beginning of every page.
///
/// # Layout (48 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    id   (this page)
/// 16      16    prev (previous page in the chain, all zero = none)
/// 32      16    next (next page in the chain, all zero = none)
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub id: PageId,
    pub prev: PageId,
    pub next: PageId,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = PAGE_HEADER_SIZE;

    /// Offset of each field within the header.
    pub const OFFSET_ID: usize = 0;
    pub const OFFSET_PREV: usize = 16;
    pub const OFFSET_NEXT: usize = 32;

    pub fn new(id: PageId, prev: PageId, next: PageId) -> Self {
        Self { id, prev, next }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Errors
    /// Returns `Error::PageHeaderCorrupt` if `data` is shorter than the
    /// header.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::PageHeaderCorrupt(format!(
                "expected {} header bytes, found {}",
                Self::SIZE,
                data.len()
            )));
        }

        Ok(Self {
            id: read_id(data, Self::OFFSET_ID),
            prev: read_id(data, Self::OFFSET_PREV),
            next: read_id(data, Self::OFFSET_NEXT),
        })
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_ID..Self::OFFSET_ID + 16].copy_from_slice(self.id.as_bytes());
        data[Self::OFFSET_PREV..Self::OFFSET_PREV + 16].copy_from_slice(self.prev.as_bytes());
        data[Self::OFFSET_NEXT..Self::OFFSET_NEXT + 16].copy_from_slice(self.next.as_bytes());
    }
}

fn read_id(data: &[u8], offset: usize) -> PageId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&data[offset..offset + 16]);
    PageId::from_bytes(bytes)
}
