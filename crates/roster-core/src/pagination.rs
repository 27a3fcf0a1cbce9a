//! Page arithmetic for `get_all`.
//!
//! Pages are 1-based. Storage layers translate a [`Page`] into
//! `LIMIT/OFFSET` (SQL), `skip/limit` (MongoDB), or an iterator window
//! (memory). A page past the end is simply empty.

use crate::error::ValidationError;
use crate::MAX_PAGE_SIZE;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u64,
    size: u64,
}

impl Page {
    /// Validates `number >= 1` and `1 <= size <= MAX_PAGE_SIZE`.
    pub fn new(number: i64, size: i64) -> Result<Self, ValidationError> {
        if number < 1 {
            return Err(ValidationError::OutOfRange {
                field: "page".to_string(),
                min: 1,
                max: i64::MAX,
            });
        }
        if size < 1 || size as u64 > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "page_size".to_string(),
                min: 1,
                max: MAX_PAGE_SIZE as i64,
            });
        }
        Ok(Page {
            number: number as u64,
            size: size as u64,
        })
    }

    /// 1-based page number.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Items per page.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of items to skip: `(page - 1) * size`.
    ///
    /// Saturates instead of overflowing on absurd page numbers, which then
    /// land past the end and yield an empty page.
    #[inline]
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }

    /// `(limit, offset)` clamped to `i64::MAX`.
    ///
    /// SQL binds and BSON options are signed; a clamped offset is still
    /// past any real table, so the page stays empty instead of failing.
    pub fn signed_window(&self) -> (i64, i64) {
        (
            i64::try_from(self.size).unwrap_or(i64::MAX),
            i64::try_from(self.offset()).unwrap_or(i64::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(Page::new(1, 50).unwrap().offset(), 0);
        assert_eq!(Page::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn test_rejects_zero_and_negative() {
        assert!(Page::new(0, 10).is_err());
        assert!(Page::new(1, 0).is_err());
        assert!(Page::new(-1, 10).is_err());
        assert!(Page::new(1, MAX_PAGE_SIZE as i64 + 1).is_err());
    }

    #[test]
    fn test_huge_page_saturates() {
        let page = Page::new(i64::MAX, MAX_PAGE_SIZE as i64).unwrap();
        assert_eq!(page.offset(), u64::MAX);
    }

    #[test]
    fn test_signed_window_clamps_offset() {
        assert_eq!(Page::new(3, 20).unwrap().signed_window(), (20, 40));

        let (limit, offset) = Page::new(i64::MAX, 2).unwrap().signed_window();
        assert_eq!(limit, 2);
        assert_eq!(offset, i64::MAX);
    }
}
