use std::fmt;

/// An error that can occur when decoding a save
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the byte offset that the error occurs (if available)
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// Input ended in the middle of a token or with containers left open
    Eof { offset: usize },

    /// A token id that is neither a control code, a type code, nor present in
    /// the token dictionary
    UnknownToken { token_id: u16, offset: usize },

    /// A token that is not valid at this position in the stream
    UnexpectedToken { token_id: u16, offset: usize },

    /// A container that is not the value of a key, in an object
    UnnamedContainer { offset: usize },

    /// Too many close delimiters were encountered
    StackEmpty { offset: usize },

    /// A container closed before the value of an implicit object was written
    DanglingHiddenObject { offset: usize },

    /// A value marked as a date could not be decoded as one
    InvalidDate { raw: i32, offset: usize },

    /// The fixed layout of an rgb value was not followed
    InvalidRgb { offset: usize },

    /// The output sink rejected an event (eg: a value where a key was expected)
    Sink(String),

    /// The token dictionary asset has a malformed line
    TokenFile { line: usize },

    /// The compressed section does not start with a zip local file header
    ZipSignature { signature: u32 },

    /// The compressed section holds an entry other than the gamestate
    ZipFilename { filename: String },

    /// The compressed section is not deflate compressed
    ZipCompression { method: u16 },

    /// The decode was cancelled before it finished
    Cancelled,

    /// An error occurred when reading input or writing output
    Io(std::io::Error),
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ErrorKind::Eof { offset } => Some(offset),
            ErrorKind::UnknownToken { offset, .. } => Some(offset),
            ErrorKind::UnexpectedToken { offset, .. } => Some(offset),
            ErrorKind::UnnamedContainer { offset } => Some(offset),
            ErrorKind::StackEmpty { offset } => Some(offset),
            ErrorKind::DanglingHiddenObject { offset } => Some(offset),
            ErrorKind::InvalidDate { offset, .. } => Some(offset),
            ErrorKind::InvalidRgb { offset } => Some(offset),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Eof { offset } => write!(f, "unexpected end of file (offset: {})", offset),
            ErrorKind::UnknownToken { token_id, offset } => write!(
                f,
                "unknown binary token encountered (id: 0x{:04x}, offset: {})",
                token_id, offset
            ),
            ErrorKind::UnexpectedToken { token_id, offset } => write!(
                f,
                "unexpected binary token encountered (id: 0x{:04x}, offset: {})",
                token_id, offset
            ),
            ErrorKind::UnnamedContainer { offset } => write!(
                f,
                "container is not the value of any key (offset: {})",
                offset
            ),
            ErrorKind::StackEmpty { offset } => write!(
                f,
                "stack empty, too many close tokens encountered (offset: {})",
                offset
            ),
            ErrorKind::DanglingHiddenObject { offset } => write!(
                f,
                "container closed before the hidden object value (offset: {})",
                offset
            ),
            ErrorKind::InvalidDate { raw, offset } => write!(
                f,
                "expected a date but {} does not decode to one (offset: {})",
                raw, offset
            ),
            ErrorKind::InvalidRgb { offset } => {
                write!(f, "invalid rgb data encountered (offset: {})", offset)
            }
            ErrorKind::Sink(ref msg) => write!(f, "output error: {}", msg),
            ErrorKind::TokenFile { line } => {
                write!(f, "malformed token file entry on line {}", line)
            }
            ErrorKind::ZipSignature { signature } => write!(
                f,
                "expected zip local file header but found signature 0x{:08x}",
                signature
            ),
            ErrorKind::ZipFilename { ref filename } => {
                write!(f, "expected gamestate zip entry but found: {}", filename)
            }
            ErrorKind::ZipCompression { method } => {
                write!(f, "unsupported zip compression method: {}", method)
            }
            ErrorKind::Cancelled => write!(f, "decoding was cancelled"),
            ErrorKind::Io(ref err) => write!(f, "io error: {}", err),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_size() {
        assert_eq!(std::mem::size_of::<Error>(), std::mem::size_of::<usize>());
    }

    #[test]
    fn test_offsets() {
        let err = Error::new(ErrorKind::StackEmpty { offset: 10 });
        assert_eq!(err.offset(), Some(10));
        assert_eq!(Error::new(ErrorKind::Cancelled).offset(), None);
    }

    #[test]
    fn test_display_token() {
        let err = Error::new(ErrorKind::UnknownToken {
            token_id: 0x2d82,
            offset: 4,
        });
        assert_eq!(
            err.to_string(),
            "unknown binary token encountered (id: 0x2d82, offset: 4)"
        );
    }
}
