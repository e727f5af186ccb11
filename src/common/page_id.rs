//! Page identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a page on disk.
///
/// A 16-byte UUID, written verbatim into page headers. The all-zero id
/// ([`PageId::NIL`]) means "no page" in the prev/next links.
///
/// # Example
/// ```
/// use tabledb::PageId;
///
/// let page_id = PageId::generate();
/// assert!(page_id.is_valid());
/// assert!(!PageId::NIL.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(Uuid);

impl PageId {
    /// Sentinel page ID for "no link".
    pub const NIL: PageId = PageId(Uuid::nil());

    /// Mint a fresh random page ID.
    pub fn generate() -> Self {
        PageId(Uuid::new_v4())
    }

    /// Rebuild an ID from its 16 header bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        PageId(Uuid::from_bytes(bytes))
    }

    /// The 16 bytes stored in page headers.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Check if this page ID is a real page (not the nil link).
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "nil")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_generate() {
        let a = PageId::generate();
        let b = PageId::generate();
        assert!(a.is_valid());
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_id_nil() {
        assert!(!PageId::NIL.is_valid());
        assert_eq!(PageId::NIL.as_bytes(), &[0u8; 16]);
        assert_eq!(PageId::default(), PageId::NIL);
    }

    #[test]
    fn test_page_id_bytes() {
        let id = PageId::generate();
        assert_eq!(PageId::from_bytes(*id.as_bytes()), id);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::NIL), "nil");
        let id = PageId::generate();
        assert_eq!(format!("{}", id).len(), 36);
    }
}
