use crate::error::SessionError;

/// Cursor over an immutable question sequence.
///
/// Stepping past either end is a no-op; jumping outside the sequence is an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    len: usize,
}

impl Navigator {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// Index `next()` would move to.
    #[must_use]
    pub fn peek_next(&self) -> usize {
        if self.is_last() { self.index } else { self.index + 1 }
    }

    /// Index `previous()` would move to.
    #[must_use]
    pub fn peek_previous(&self) -> usize {
        self.index.saturating_sub(1)
    }

    /// Advance by one. Returns `false` at the last index.
    pub fn next(&mut self) -> bool {
        let target = self.peek_next();
        let moved = target != self.index;
        self.index = target;
        moved
    }

    /// Retreat by one. Returns `false` at index 0.
    pub fn previous(&mut self) -> bool {
        let target = self.peek_previous();
        let moved = target != self.index;
        self.index = target;
        moved
    }

    /// Check that `index` is inside the sequence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` outside `0..len`.
    pub fn check(&self, index: usize) -> Result<(), SessionError> {
        if index < self.len {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange {
                index,
                len: self.len,
            })
        }
    }

    /// Jump directly to `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` outside `0..len`.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.check(index)?;
        self.index = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_no_ops() {
        let mut nav = Navigator::new(3);
        assert!(!nav.previous());
        assert_eq!(nav.current(), 0);

        assert!(nav.next());
        assert!(nav.next());
        assert!(nav.is_last());
        assert!(!nav.next());
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn go_to_rejects_out_of_range() {
        let mut nav = Navigator::new(3);
        nav.go_to(2).unwrap();
        assert_eq!(nav.current(), 2);

        let err = nav.go_to(3).unwrap_err();
        assert!(matches!(
            err,
            SessionError::IndexOutOfRange { index: 3, len: 3 }
        ));
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn empty_sequence_never_moves() {
        let mut nav = Navigator::new(0);
        assert!(nav.is_empty());
        assert!(!nav.next());
        assert!(!nav.previous());
        assert!(nav.go_to(0).is_err());
    }
}
