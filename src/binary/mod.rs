//! Types for decoding the binary save format
//!
//! The building blocks, leaves first: the [lexer](Ck3Token) classifies raw 16
//! bit tokens, the [`TokenDictionary`] and [overlay table](OVERLAYS) name them
//! and attach decoding hints, [`peek_container`] resolves whether an `Open`
//! begins an object or array, and the [`BinParser`] drives it all as a
//! resumable state machine.

mod container;
mod fixed;
mod fragment;
pub(crate) mod lexer;
mod overlay;
mod parser;
mod resolver;
mod rgb;
mod tokens;

pub use self::container::{peek_container, ContainerGuess, GuessKind, PeekError};
pub use self::fixed::{decode_long_float, decode_q49_15};
pub use self::fragment::FragmentBuilder;
pub use self::lexer::{Ck3Token, LexError, Token, TokenKind};
pub use self::overlay::{OverlayFlags, OVERLAYS};
pub use self::parser::{BinParser, ContainerKind, ParseProgress, ParseState};
pub use self::resolver::{FailedResolveStrategy, TokenResolver};
pub use self::rgb::*;
pub use self::tokens::{Ck3Tokens, TokenDictionary, DEFAULT_TOKENS_PATH, TOKENS_ENV};
