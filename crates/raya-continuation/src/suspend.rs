//! Immediate-or-suspended result of a suspension point

/// What a suspension point reports to its caller.
///
/// `Suspended` means no value is produced now: the continuation handed to
/// the body will be resumed later with the value or a fault.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suspend<T> {
    /// The result is available immediately
    Ready(T),
    /// The result will arrive through the continuation
    Suspended,
}

impl<T> Suspend<T> {
    /// Check if an immediate result is available
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Suspend::Ready(_))
    }

    /// Check if the computation suspended
    #[inline]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Suspend::Suspended)
    }

    /// Take the immediate result, if any
    #[inline]
    pub fn ready(self) -> Option<T> {
        match self {
            Suspend::Ready(value) => Some(value),
            Suspend::Suspended => None,
        }
    }

    /// Borrow the immediate result, if any
    #[inline]
    pub fn as_ref(&self) -> Suspend<&T> {
        match self {
            Suspend::Ready(value) => Suspend::Ready(value),
            Suspend::Suspended => Suspend::Suspended,
        }
    }

    /// Transform the immediate result, leaving a suspension untouched
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Suspend<U> {
        match self {
            Suspend::Ready(value) => Suspend::Ready(f(value)),
            Suspend::Suspended => Suspend::Suspended,
        }
    }
}

impl<T> From<Option<T>> for Suspend<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Suspend::Ready(value),
            None => Suspend::Suspended,
        }
    }
}
