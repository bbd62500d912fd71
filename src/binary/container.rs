use super::lexer::{read_id, skip_payload, LexError};
use super::Ck3Token;
use std::fmt;

/// The sink scope an `Open` token resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessKind {
    Object,
    Array,
}

/// The outcome of looking ahead past an `Open` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerGuess {
    pub kind: GuessKind,

    /// The container is immediately closed
    pub empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeekError {
    /// The lookahead ran off the end of the data. More input may resolve this.
    Eof,
    InvalidRgb,

    /// A token that can't start a container's contents
    UnexpectedToken(Ck3Token),
}

impl From<LexError> for PeekError {
    fn from(value: LexError) -> Self {
        match value {
            LexError::Eof => PeekError::Eof,
            LexError::InvalidRgb => PeekError::InvalidRgb,
        }
    }
}

impl std::error::Error for PeekError {}

impl fmt::Display for PeekError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PeekError::Eof => write!(f, "unexpected end of file"),
            PeekError::InvalidRgb => write!(f, "invalid rgb data encountered"),
            PeekError::UnexpectedToken(token) => {
                write!(f, "unexpected token at start of container: {}", token)
            }
        }
    }
}

/// Decide whether the data following an `Open` token is an object or array
///
/// Nothing is consumed. The data begins immediately after the `Open`.
///
/// ```
/// use ck3bin::binary::{peek_container, GuessKind};
///
/// // `{ 1 2 }`
/// let data = [0x0c, 0x00, 0x01, 0, 0, 0, 0x0c, 0x00, 0x02, 0, 0, 0, 0x04, 0x00];
/// assert_eq!(peek_container(&data).unwrap().kind, GuessKind::Array);
///
/// // `{ }`
/// let guess = peek_container(&[0x04, 0x00]).unwrap();
/// assert_eq!(guess.kind, GuessKind::Object);
/// assert!(guess.empty);
/// ```
pub fn peek_container(data: &[u8]) -> Result<ContainerGuess, PeekError> {
    let (first, rest) = read_id(data)?;
    let kind = match first {
        Ck3Token::CLOSE => {
            return Ok(ContainerGuess {
                kind: GuessKind::Object,
                empty: true,
            })
        }
        Ck3Token::OPEN => GuessKind::Array,
        Ck3Token::EQUAL => return Err(PeekError::UnexpectedToken(first)),

        // Older saves store some colors without a key
        Ck3Token::RGB => GuessKind::Array,
        _ => {
            let rest = skip_payload(first, rest)?;
            let (second, _) = read_id(rest)?;
            if second == Ck3Token::EQUAL {
                GuessKind::Object
            } else {
                GuessKind::Array
            }
        }
    };

    Ok(ContainerGuess { kind, empty: false })
}
