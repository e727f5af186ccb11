//! Page - the fixed-capacity unit of storage.
//!
//! A [`Page`] holds a sequence of length-prefixed blocks, each the
//! serialized form of one row version. Pages of a table are linked into a
//! chain through their headers.

use crate::common::config::{BLOCK_HEADER_SIZE, MAX_BLOCK_SIZE, PAGE_CAPACITY};
use crate::common::{Error, PageId, Result};

use super::page_header::PageHeader;

/// A page of row blocks.
///
/// # Layout
/// ```text
/// ┌──────────────────────┬────────────┬─────────┬────────────┬─────────┬─────┐
/// │ header (48 bytes)    │ len (u16)  │ block 0 │ len (u16)  │ block 1 │ ... │
/// │ id | prev | next     │ big-endian │         │ big-endian │         │     │
/// └──────────────────────┴────────────┴─────────┴────────────┴─────────┴─────┘
///                        └──────────── payload, at most PAGE_CAPACITY ───────┘
/// ```
///
/// Blocks are only ever appended. A push that would take the payload past
/// [`PAGE_CAPACITY`] fails with `Error::PageOverflow` and leaves the page
/// untouched.
///
/// # Example
/// ```
/// use tabledb::storage::page::Page;
/// use tabledb::PageId;
///
/// let mut page = Page::new(PageId::generate());
/// page.push(b"hello").unwrap();
/// page.push(b"world").unwrap();
///
/// let blocks: Vec<&[u8]> = page.blocks().collect::<Result<_, _>>().unwrap();
/// assert_eq!(blocks, vec![&b"hello"[..], &b"world"[..]]);
/// ```
#[derive(Debug, Clone)]
pub struct Page {
    header: PageHeader,
    payload: Vec<u8>,
    dirty: bool,
}

impl Page {
    /// Create a new empty page with no links.
    pub fn new(id: PageId) -> Self {
        Self::with_links(id, PageId::NIL, PageId::NIL)
    }

    /// Create a new empty page with the given links.
    pub fn with_links(id: PageId, prev: PageId, next: PageId) -> Self {
        Self {
            header: PageHeader::new(id, prev, next),
            payload: Vec::new(),
            dirty: true,
        }
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.header.id
    }

    #[inline]
    pub fn prev(&self) -> PageId {
        self.header.prev
    }

    #[inline]
    pub fn next(&self) -> PageId {
        self.header.next
    }

    pub fn set_prev(&mut self, prev: PageId) {
        if self.header.prev != prev {
            self.header.prev = prev;
            self.dirty = true;
        }
    }

    pub fn set_next(&mut self, next: PageId) {
        if self.header.next != next {
            self.header.next = next;
            self.dirty = true;
        }
    }

    /// Read the page header.
    #[inline]
    pub fn header(&self) -> PageHeader {
        self.header
    }

    /// Bytes of payload in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload bytes still available, including block headers.
    #[inline]
    pub fn remaining(&self) -> usize {
        PAGE_CAPACITY - self.payload.len()
    }

    /// Whether the page changed since it was last written.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Append one block.
    ///
    /// # Errors
    /// - `Error::MaxDataSize` if the block could not fit even in an empty
    ///   page
    /// - `Error::PageOverflow` if the block does not fit in what is left of
    ///   this page
    pub fn push(&mut self, block: &[u8]) -> Result<()> {
        if block.len() > MAX_BLOCK_SIZE {
            return Err(Error::MaxDataSize { size: block.len() });
        }
        if BLOCK_HEADER_SIZE + block.len() > self.remaining() {
            return Err(Error::PageOverflow);
        }

        self.payload
            .extend_from_slice(&(block.len() as u16).to_be_bytes());
        self.payload.extend_from_slice(block);
        self.dirty = true;
        Ok(())
    }

    /// Iterate over the blocks in insertion order.
    ///
    /// A truncated trailing block yields one `Error::PageCorrupt` and ends
    /// the iteration.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            page_id: self.header.id,
            payload: &self.payload,
            offset: 0,
        }
    }

    /// Serialize header and payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; PageHeader::SIZE + self.payload.len()];
        self.header.write_to(&mut out);
        out[PageHeader::SIZE..].copy_from_slice(&self.payload);
        out
    }

    /// Deserialize a page that was requested as `requested`.
    ///
    /// The result is clean.
    ///
    /// # Errors
    /// - `Error::PageHeaderCorrupt` if the header is short
    /// - `Error::PageIdMismatch` if the header names another page
    /// - `Error::PageCorrupt` if the payload exceeds the page capacity
    pub fn from_bytes(requested: PageId, data: &[u8]) -> Result<Self> {
        let header = PageHeader::from_bytes(data)?;
        if header.id != requested {
            return Err(Error::PageIdMismatch {
                requested,
                found: header.id,
            });
        }

        let payload = &data[PageHeader::SIZE..];
        if payload.len() > PAGE_CAPACITY {
            return Err(Error::PageCorrupt {
                page_id: requested,
                reason: format!(
                    "payload of {} bytes exceeds capacity {}",
                    payload.len(),
                    PAGE_CAPACITY
                ),
            });
        }

        Ok(Self {
            header,
            payload: payload.to_vec(),
            dirty: false,
        })
    }
}

/// Iterator over the blocks of a [`Page`].
pub struct Blocks<'a> {
    page_id: PageId,
    payload: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let payload: &'a [u8] = self.payload;
        let rest = &payload[self.offset..];
        if rest.is_empty() {
            return None;
        }

        let page_id = self.page_id;
        let corrupt = |offset: usize, reason: &str| Error::PageCorrupt {
            page_id,
            reason: format!("{} at offset {}", reason, offset),
        };

        if rest.len() < BLOCK_HEADER_SIZE {
            let err = corrupt(self.offset, "truncated block length");
            self.offset = payload.len();
            return Some(Err(err));
        }

        let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        let end = BLOCK_HEADER_SIZE + len;
        if rest.len() < end {
            let err = corrupt(self.offset, "truncated block");
            self.offset = payload.len();
            return Some(Err(err));
        }

        self.offset += end;
        Some(Ok(&rest[BLOCK_HEADER_SIZE..end]))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new() {
        let id = PageId::generate();
        let page = Page::new(id);
        assert_eq!(page.id(), id);
        assert_eq!(page.prev(), PageId::NIL);
        assert_eq!(page.next(), PageId::NIL);
        assert!(page.is_empty());
        assert!(page.is_dirty());
        assert_eq!(page.remaining(), PAGE_CAPACITY);
    }

    #[test]
    fn test_push_and_iterate() {
        let mut page = Page::new(PageId::generate());
        page.push(b"one").unwrap();
        page.push(b"").unwrap();
        page.push(b"three").unwrap();

        let blocks: Vec<&[u8]> = page.blocks().collect::<Result<_>>().unwrap();
        assert_eq!(blocks, vec![&b"one"[..], &b""[..], &b"three"[..]]);
        assert_eq!(page.len(), 3 * BLOCK_HEADER_SIZE + 8);
    }

    #[test]
    fn test_block_length_is_big_endian() {
        let mut page = Page::new(PageId::generate());
        page.push(&[7u8; 258]).unwrap();

        let bytes = page.to_bytes();
        assert_eq!(&bytes[PageHeader::SIZE..PageHeader::SIZE + 2], &[0x01, 0x02]);
    }

    #[test]
    fn test_push_overflow_leaves_page_untouched() {
        let mut page = Page::new(PageId::generate());
        let block = vec![1u8; 1000];
        for _ in 0..3 {
            page.push(&block).unwrap();
        }
        let before = page.len();

        // 3 * 1002 + 1002 = 4008 > 4000
        assert!(matches!(page.push(&block), Err(Error::PageOverflow)));
        assert_eq!(page.len(), before);
        assert_eq!(page.blocks().count(), 3);
    }

    #[test]
    fn test_push_exactly_fills_page() {
        let mut page = Page::new(PageId::generate());
        page.push(&vec![0u8; MAX_BLOCK_SIZE]).unwrap();
        assert_eq!(page.remaining(), 0);
        assert!(matches!(page.push(b""), Err(Error::PageOverflow)));
    }

    #[test]
    fn test_push_max_data_size() {
        let mut page = Page::new(PageId::generate());
        let err = page.push(&vec![0u8; MAX_BLOCK_SIZE + 1]).unwrap_err();
        assert!(matches!(err, Error::MaxDataSize { .. }));
        assert!(page.is_empty());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let id = PageId::generate();
        let next = PageId::generate();
        let mut page = Page::with_links(id, PageId::NIL, next);
        page.push(b"abc").unwrap();

        let loaded = Page::from_bytes(id, &page.to_bytes()).unwrap();
        assert_eq!(loaded.header(), page.header());
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.blocks().next().unwrap().unwrap(), b"abc");
    }

    #[test]
    fn test_from_bytes_id_mismatch() {
        let page = Page::new(PageId::generate());
        let other = PageId::generate();

        let err = Page::from_bytes(other, &page.to_bytes()).unwrap_err();
        assert!(matches!(err, Error::PageIdMismatch { requested, .. } if requested == other));
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let id = PageId::generate();
        let mut page = Page::new(id);
        page.push(b"whole").unwrap();
        page.push(b"cut off").unwrap();

        let mut bytes = page.to_bytes();
        bytes.truncate(bytes.len() - 3);
        let loaded = Page::from_bytes(id, &bytes).unwrap();

        let mut blocks = loaded.blocks();
        assert_eq!(blocks.next().unwrap().unwrap(), b"whole");
        assert!(matches!(blocks.next(), Some(Err(Error::PageCorrupt { .. }))));
        assert!(blocks.next().is_none());
    }

    #[test]
    fn test_links_mark_dirty() {
        let id = PageId::generate();
        let mut page = Page::from_bytes(id, &Page::new(id).to_bytes()).unwrap();
        assert!(!page.is_dirty());

        page.set_next(PageId::NIL);
        assert!(!page.is_dirty());

        page.set_next(PageId::generate());
        assert!(page.is_dirty());
    }
}
