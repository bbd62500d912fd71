use super::Rgb;
use crate::util::get_split;
use std::fmt;

/// A raw 16 bit token from the binary stream
///
/// ```
/// use ck3bin::binary::{Ck3Token, TokenKind};
/// assert_eq!(Ck3Token::OPEN.kind(), TokenKind::Control);
/// assert_eq!(Ck3Token::I32.kind(), TokenKind::Type);
/// assert_eq!(Ck3Token::new(0x2d82).kind(), TokenKind::Identifier);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Ck3Token(pub u16);

impl Ck3Token {
    pub const EQUAL: Ck3Token = Ck3Token::new(0x0001);
    pub const OPEN: Ck3Token = Ck3Token::new(0x0003);
    pub const CLOSE: Ck3Token = Ck3Token::new(0x0004);
    pub const I32: Ck3Token = Ck3Token::new(0x000c);
    pub const F32: Ck3Token = Ck3Token::new(0x000d);
    pub const BOOL: Ck3Token = Ck3Token::new(0x000e);

    /// Length prefixed quoted string
    pub const QUOTED: Ck3Token = Ck3Token::new(0x000f);
    pub const U32: Ck3Token = Ck3Token::new(0x0014);

    /// Length prefixed unquoted string
    pub const UNQUOTED: Ck3Token = Ck3Token::new(0x0017);

    /// The `long_float` token: a 64 bit fixed point number
    pub const F64: Ck3Token = Ck3Token::new(0x0167);
    pub const RGB: Ck3Token = Ck3Token::new(0x0243);
    pub const U64: Ck3Token = Ck3Token::new(0x029c);

    #[inline]
    pub const fn new(x: u16) -> Self {
        Ck3Token(x)
    }

    #[inline]
    pub const fn id(&self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn kind(&self) -> TokenKind {
        match *self {
            Ck3Token::EQUAL | Ck3Token::OPEN | Ck3Token::CLOSE => TokenKind::Control,
            Ck3Token::I32
            | Ck3Token::F32
            | Ck3Token::BOOL
            | Ck3Token::QUOTED
            | Ck3Token::U32
            | Ck3Token::UNQUOTED
            | Ck3Token::F64
            | Ck3Token::RGB
            | Ck3Token::U64 => TokenKind::Type,
            _ => TokenKind::Identifier,
        }
    }

    #[inline]
    pub const fn is_control(&self) -> bool {
        matches!(self.kind(), TokenKind::Control)
    }

    #[inline]
    pub const fn is_type(&self) -> bool {
        matches!(self.kind(), TokenKind::Type)
    }

    #[inline]
    pub const fn is_identifier(&self) -> bool {
        matches!(self.kind(), TokenKind::Identifier)
    }

    /// Type tokens whose value may stand in for an identifier as an object key
    #[inline]
    pub const fn is_key_eligible(&self) -> bool {
        matches!(
            *self,
            Ck3Token::QUOTED | Ck3Token::UNQUOTED | Ck3Token::I32 | Ck3Token::U32
        )
    }
}

impl fmt::Display for Ck3Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Classification of a raw token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `=`, `{`, and `}`
    Control,

    /// Describes the layout of the value that follows
    Type,

    /// A named field or value that is resolved through the token dictionary
    Identifier,
}

/// A fully decoded token and its payload
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    Equal,
    Open,
    Close,
    I32(i32),
    U32(u32),
    U64(u64),
    F32(f32),
    Bool(bool),

    /// The raw `long_float`, interpreted by the active overlay
    F64(i64),
    Quoted(&'a [u8]),
    Unquoted(&'a [u8]),
    Rgb(Rgb),
    Id(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    /// Not enough data to decode the token. More input may resolve this.
    Eof,
    InvalidRgb,
}

impl std::error::Error for LexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LexError::Eof => write!(f, "unexpected end of file"),
            LexError::InvalidRgb => write!(f, "invalid rgb data encountered"),
        }
    }
}

#[inline]
pub(crate) fn read_id(data: &[u8]) -> Result<(Ck3Token, &[u8]), LexError> {
    let (head, rest) = get_split::<2>(data).ok_or(LexError::Eof)?;
    Ok((Ck3Token::new(u16::from_le_bytes(head)), rest))
}

#[inline]
pub(crate) fn read_string(data: &[u8]) -> Result<(&[u8], &[u8]), LexError> {
    let (head, rest) = get_split::<2>(data).ok_or(LexError::Eof)?;
    let text_len = usize::from(u16::from_le_bytes(head));
    if text_len <= rest.len() {
        Ok(rest.split_at(text_len))
    } else {
        Err(LexError::Eof)
    }
}

#[inline]
pub(crate) fn read_bool(data: &[u8]) -> Result<(bool, &[u8]), LexError> {
    let (&first, rest) = data.split_first().ok_or(LexError::Eof)?;
    Ok((first != 0, rest))
}

#[inline]
pub(crate) fn read_u16(data: &[u8]) -> Result<(u16, &[u8]), LexError> {
    let (head, rest) = get_split::<2>(data).ok_or(LexError::Eof)?;
    Ok((u16::from_le_bytes(head), rest))
}

#[inline]
pub(crate) fn read_u32(data: &[u8]) -> Result<(u32, &[u8]), LexError> {
    let (head, rest) = get_split::<4>(data).ok_or(LexError::Eof)?;
    Ok((u32::from_le_bytes(head), rest))
}

#[inline]
pub(crate) fn read_i32(data: &[u8]) -> Result<(i32, &[u8]), LexError> {
    let (head, rest) = get_split::<4>(data).ok_or(LexError::Eof)?;
    Ok((i32::from_le_bytes(head), rest))
}

#[inline]
pub(crate) fn read_u64(data: &[u8]) -> Result<(u64, &[u8]), LexError> {
    let (head, rest) = get_split::<8>(data).ok_or(LexError::Eof)?;
    Ok((u64::from_le_bytes(head), rest))
}

#[inline]
pub(crate) fn read_i64(data: &[u8]) -> Result<(i64, &[u8]), LexError> {
    let (head, rest) = get_split::<8>(data).ok_or(LexError::Eof)?;
    Ok((i64::from_le_bytes(head), rest))
}

#[inline]
pub(crate) fn read_f32(data: &[u8]) -> Result<(f32, &[u8]), LexError> {
    let (head, rest) = get_split::<4>(data).ok_or(LexError::Eof)?;
    Ok((f32::from_le_bytes(head), rest))
}

/// Every color channel is prefixed by an unused 16 bit field:
///
/// ```text
/// 0-2   {
/// 2-4   _
/// 4-8   R
/// 8-A   _
/// A-E   G
/// E-10  _
/// 10-14 B
/// 14-16 }
/// ```
#[inline]
pub(crate) fn read_rgb(data: &[u8]) -> Result<(Rgb, &[u8]), LexError> {
    let (start, data) = read_id(data)?;
    let (_, data) = read_u16(data)?;
    let (r, data) = read_u32(data)?;
    let (_, data) = read_u16(data)?;
    let (g, data) = read_u32(data)?;
    let (_, data) = read_u16(data)?;
    let (b, data) = read_u32(data)?;
    let (end, data) = read_id(data)?;
    match (start, end) {
        (Ck3Token::OPEN, Ck3Token::CLOSE) => Ok((Rgb { r, g, b }, data)),
        _ => Err(LexError::InvalidRgb),
    }
}

/// Decode the next token and its payload
#[inline]
pub(crate) fn read_token(data: &[u8]) -> Result<(Token, &[u8]), LexError> {
    let (id, data) = read_id(data)?;
    match id {
        Ck3Token::EQUAL => Ok((Token::Equal, data)),
        Ck3Token::OPEN => Ok((Token::Open, data)),
        Ck3Token::CLOSE => Ok((Token::Close, data)),
        Ck3Token::I32 => read_i32(data).map(|(x, d)| (Token::I32(x), d)),
        Ck3Token::U32 => read_u32(data).map(|(x, d)| (Token::U32(x), d)),
        Ck3Token::U64 => read_u64(data).map(|(x, d)| (Token::U64(x), d)),
        Ck3Token::F32 => read_f32(data).map(|(x, d)| (Token::F32(x), d)),
        Ck3Token::F64 => read_i64(data).map(|(x, d)| (Token::F64(x), d)),
        Ck3Token::BOOL => read_bool(data).map(|(x, d)| (Token::Bool(x), d)),
        Ck3Token::QUOTED => read_string(data).map(|(x, d)| (Token::Quoted(x), d)),
        Ck3Token::UNQUOTED => read_string(data).map(|(x, d)| (Token::Unquoted(x), d)),
        Ck3Token::RGB => read_rgb(data).map(|(x, d)| (Token::Rgb(x), d)),
        Ck3Token(id) => Ok((Token::Id(id), data)),
    }
}

/// Skip over the payload of a scalar type token. Control tokens and
/// identifiers have no payload.
#[inline]
pub(crate) fn skip_payload(id: Ck3Token, data: &[u8]) -> Result<&[u8], LexError> {
    let skip = match id {
        Ck3Token::QUOTED | Ck3Token::UNQUOTED => return read_string(data).map(|(_, d)| d),
        Ck3Token::RGB => return read_rgb(data).map(|(_, d)| d),
        Ck3Token::BOOL => 1,
        Ck3Token::I32 | Ck3Token::U32 | Ck3Token::F32 => 4,
        Ck3Token::U64 | Ck3Token::F64 => 8,
        _ => 0,
    };

    data.get(skip..).ok_or(LexError::Eof)
}
