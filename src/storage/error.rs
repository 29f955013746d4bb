//! Common error types for non-volatile storage operations

/// A common error type for key/value storage operations.
///
/// This enum defines the errors that can occur when reading or writing items
/// of the non-volatile store. It is designed to be simple and portable for
/// `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No item is stored under the requested key.
    NotFound,
    /// An error occurred during a read operation.
    ReadError,
    /// An error occurred during a write operation.
    WriteError,
    /// The stored item does not fit the buffer supplied by the caller.
    SizeMismatch,
    /// The store (or a record buffer) has no room left.
    Full,
    /// The stored item failed its integrity check or could not be decoded.
    Corrupted,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotFound => defmt::write!(f, "NotFound"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::SizeMismatch => defmt::write!(f, "SizeMismatch"),
            Error::Full => defmt::write!(f, "Full"),
            Error::Corrupted => defmt::write!(f, "Corrupted"),
        }
    }
}
