/// Crate-specific error type.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// Possible error kinds.
///
/// Running out of space is not an error: `Arena::allocate` reports it as `Ok(None)`.
/// Freeing a stale or already-free handle is not an error either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The placement policy tag is not recognized.
    ///
    /// # Typical remedy
    ///
    /// - Use one of `first_fit`, `next_fit`, `best_fit` or `worst_fit`
    InvalidPolicy,

    /// The arena size is not positive.
    InvalidSize,

    /// The input is invalid (e.g., a request for zero units).
    ///
    /// # Typical remedy
    ///
    /// - Fix the calling program so that it passes valid input
    InvalidInput,

    /// The block ledger is in an inconsistent state.
    ///
    /// This indicates a bug in the program.
    InconsistentState,

    /// Other errors.
    Other,
}
impl trackable::error::ErrorKind for ErrorKind {}
