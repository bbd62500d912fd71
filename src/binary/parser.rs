use super::container::{peek_container, GuessKind, PeekError};
use super::fixed::{decode_long_float, decode_q49_15};
use super::lexer::{read_id, read_token, read_u32, LexError, Token};
use super::{Ck3Token, Ck3Tokens, FailedResolveStrategy, OverlayFlags, TokenResolver};
use crate::common::Ck3Date;
use crate::envelope::ZIP_MAGIC;
use crate::json::JsonSink;
use crate::{Error, ErrorKind};
use std::borrow::Cow;

/// Length of the checksum line, excluding the trailing newline
const CHECKSUM_LEN: usize = 23;

/// The control variable threaded through consecutive calls to
/// [`BinParser::parse_chunk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Looking for the optional checksum line at the start of a save
    Checksum,

    /// Dispatching on the next token
    Token,

    /// A typed value in key position
    IdentifierKey,

    /// The value of a key or an array element
    Value,

    /// The value of an implicit object found in an array
    HiddenValue,

    /// An `Open` was consumed and its kind is not yet known
    Container,

    /// A `Close` that returns to the document root
    ContainerToRoot,

    /// The root closed and a compressed section follows
    DecompressGamestate,
}

/// An entry on the container stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,

    /// Implicit single key object for a `key = value` pair inside an array
    HiddenObject,

    /// A keyless object at the root whose fields are written into the root
    RootObject,
}

/// How much of a chunk the parser used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    /// Bytes that the parser has fully processed. The caller resumes with the
    /// data that follows.
    pub consumed: usize,

    /// Bytes the parser looked at. When this exceeds `consumed`, the parser
    /// needs more input before it can make progress.
    pub examined: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct OverlayFrame {
    /// Flags set when the container was opened
    inherited: OverlayFlags,

    /// Flags of the most recent key
    key: OverlayFlags,

    /// Token of the key whose values are being grouped in an open array
    flattening: Option<u16>,

    /// A key was written and its value has not been
    key_pending: bool,
}

impl OverlayFrame {
    #[inline]
    fn active(&self) -> OverlayFlags {
        self.inherited | self.key
    }

    /// Clear value flags after they were used unless they repeat
    fn used(&mut self, flags: OverlayFlags) {
        if !self.active().contains(OverlayFlags::REPEATS) {
            self.inherited.remove(flags);
            self.key.remove(flags);
        }
    }

    /// The key's value is complete so its flags no longer apply
    fn value_done(&mut self) {
        self.key = OverlayFlags::empty();
        self.key_pending = false;
    }

    fn close_flatten<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        if self.flattening.take().is_some() {
            sink.end_array()?;
        }
        Ok(())
    }
}

enum Halt {
    /// The data ended before the step could complete
    Incomplete,
    Fatal(Error),
}

impl From<Error> for Halt {
    fn from(value: Error) -> Self {
        Halt::Fatal(value)
    }
}

impl From<ErrorKind> for Halt {
    fn from(value: ErrorKind) -> Self {
        Halt::Fatal(Error::new(value))
    }
}

/// Streaming state machine that decodes the binary format into a
/// [`JsonSink`]
///
/// Data is pushed a chunk at a time. Each step decodes everything it needs
/// (including lookahead) before touching the sink or the stacks, so when a
/// chunk ends mid token the parser reports the bytes it consumed and the
/// caller retries the tail once more data is available.
///
/// The caller owns the outermost object scope: the parser writes fields as if
/// an object were already open.
///
/// ```
/// use ck3bin::binary::{BinParser, Ck3Tokens, ParseState, TokenDictionary};
/// use ck3bin::json::JsonWriter;
///
/// # fn main() -> Result<(), ck3bin::Error> {
/// let dictionary: TokenDictionary = vec![(0x058f, "save_game_version")].into_iter().collect();
/// let tokens = Ck3Tokens::new(dictionary);
///
/// // save_game_version = 3
/// let data = [0x8f, 0x05, 0x01, 0x00, 0x0c, 0x00, 0x03, 0x00, 0x00, 0x00];
/// let mut writer = JsonWriter::new(Vec::new());
/// let mut parser = BinParser::new(ParseState::Token, &tokens);
///
/// use ck3bin::json::JsonSink;
/// writer.begin_object()?;
/// let progress = parser.parse_chunk(&data[..5], false, &mut writer)?;
/// assert_eq!(progress.consumed, 4);
/// let progress = parser.parse_chunk(&data[4..], true, &mut writer)?;
/// assert_eq!(progress.consumed, 6);
/// parser.finish(&mut writer)?;
/// writer.end_object()?;
///
/// assert_eq!(writer.into_inner(), br#"{"save_game_version":3}"#);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BinParser<'a> {
    tokens: &'a Ck3Tokens,
    on_failed_resolve: FailedResolveStrategy,
    detect_gamestate: bool,
    state: ParseState,
    containers: Vec<ContainerKind>,
    overlays: Vec<OverlayFrame>,
    root: OverlayFrame,
    offset: usize,
    checksum: Option<String>,
}

impl<'a> BinParser<'a> {
    /// Create a parser. A save starts in [`ParseState::Checksum`] while an
    /// embedded document starts in [`ParseState::Token`].
    pub fn new(initial: ParseState, tokens: &'a Ck3Tokens) -> Self {
        BinParser {
            tokens,
            on_failed_resolve: FailedResolveStrategy::Error,
            detect_gamestate: true,
            state: initial,
            containers: Vec::new(),
            overlays: Vec::new(),
            root: OverlayFrame::default(),
            offset: 0,
            checksum: None,
        }
    }

    /// Set how identifiers missing from the token dictionary are handled
    pub fn on_failed_resolve(mut self, strategy: FailedResolveStrategy) -> Self {
        self.on_failed_resolve = strategy;
        self
    }

    /// Set whether a zip entry after the root closes is recognized as the
    /// compressed gamestate. Embedded documents turn this off.
    pub fn detect_gamestate(mut self, detect: bool) -> Self {
        self.detect_gamestate = detect;
        self
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Current container nesting
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// Total number of bytes consumed
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The checksum line, if the document started with one
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Parse as much of the chunk as possible
    ///
    /// `is_final` signals that no data follows this chunk, so lookahead that
    /// runs off the end is a failed match instead of a request for more input.
    pub fn parse_chunk<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        is_final: bool,
        sink: &mut S,
    ) -> Result<ParseProgress, Error> {
        let mut pos = 0;
        while self.state != ParseState::DecompressGamestate {
            match self.step(&data[pos..], is_final, sink) {
                Ok(consumed) => {
                    pos += consumed;
                    self.offset += consumed;
                }
                Err(Halt::Incomplete) => {
                    return Ok(ParseProgress {
                        consumed: pos,
                        examined: data.len(),
                    })
                }
                Err(Halt::Fatal(e)) => return Err(e),
            }
        }

        Ok(ParseProgress {
            consumed: pos,
            examined: pos,
        })
    }

    /// Validate that the document is complete and close any array that is
    /// grouping repeated root keys
    pub fn finish<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        let at_rest = matches!(
            self.state,
            ParseState::Token | ParseState::Checksum | ParseState::DecompressGamestate
        );

        if !at_rest || !self.containers.is_empty() || self.root.key_pending {
            return Err(Error::new(ErrorKind::Eof {
                offset: self.offset,
            }));
        }

        self.finish_root(sink)
    }

    /// Close an array grouping repeated root keys so more root fields can be
    /// written
    pub fn finish_root<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        self.root.close_flatten(sink)
    }

    fn step<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        is_final: bool,
        sink: &mut S,
    ) -> Result<usize, Halt> {
        match self.state {
            ParseState::Checksum => self.parse_checksum(data, is_final, sink),
            ParseState::Token => self.parse_token(data, sink),
            ParseState::IdentifierKey => self.parse_identifier_key(data, sink),
            ParseState::Value | ParseState::HiddenValue | ParseState::ContainerToRoot => {
                self.parse_value(data, is_final, sink)
            }
            ParseState::Container => self.parse_container(data, sink),
            ParseState::DecompressGamestate => Ok(0),
        }
    }

    #[inline]
    fn frame(&self) -> &OverlayFrame {
        self.overlays.last().unwrap_or(&self.root)
    }

    #[inline]
    fn frame_mut(&mut self) -> &mut OverlayFrame {
        self.overlays.last_mut().unwrap_or(&mut self.root)
    }

    /// The innermost scope is an object whose keys come from the stream
    #[inline]
    fn in_object(&self) -> bool {
        matches!(
            self.containers.last(),
            None | Some(ContainerKind::Object) | Some(ContainerKind::RootObject)
        )
    }

    fn unexpected(&self, token: Ck3Token) -> Error {
        Error::new(ErrorKind::UnexpectedToken {
            token_id: token.id(),
            offset: self.offset,
        })
    }

    fn lex_halt(&self, err: LexError) -> Halt {
        match err {
            LexError::Eof => Halt::Incomplete,
            LexError::InvalidRgb => ErrorKind::InvalidRgb {
                offset: self.offset,
            }
            .into(),
        }
    }

    fn resolve(&self, id: u16) -> Result<Cow<'a, str>, Error> {
        let tokens: &'a Ck3Tokens = self.tokens;
        match tokens.resolve(id) {
            Some(name) => Ok(Cow::Borrowed(name)),
            None => match self.on_failed_resolve {
                FailedResolveStrategy::Error => Err(Error::new(ErrorKind::UnknownToken {
                    token_id: id,
                    offset: self.offset,
                })),
                FailedResolveStrategy::Stringify => Ok(Cow::Owned(format!("0x{:04x}", id))),
            },
        }
    }

    fn date_text(&self, raw: i32) -> Result<String, Error> {
        match Ck3Date::from_binary(raw) {
            Some(date) => Ok(date.to_string()),
            None => Err(Error::new(ErrorKind::InvalidDate {
                raw,
                offset: self.offset,
            })),
        }
    }

    /// Text of a value in key position. Returns the overlay flags that were
    /// used to render it.
    fn key_text<'b>(
        &self,
        token: &Token<'b>,
    ) -> Result<Option<(Cow<'b, str>, OverlayFlags)>, Error>
    where
        'a: 'b,
    {
        let flags = self.frame().active();
        let text = match *token {
            Token::I32(x) if flags.contains(OverlayFlags::AS_DATE) => {
                return Ok(Some((
                    Cow::Owned(self.date_text(x)?),
                    OverlayFlags::AS_DATE,
                )))
            }
            Token::I32(x) => Cow::Owned(String::from(itoa::Buffer::new().format(x))),
            Token::U32(x) => Cow::Owned(String::from(itoa::Buffer::new().format(x))),
            Token::Quoted(x) | Token::Unquoted(x) => String::from_utf8_lossy(x),
            Token::Id(id) => self.resolve(id)?,
            _ => return Ok(None),
        };

        Ok(Some((text, OverlayFlags::empty())))
    }

    /// Write a property name into the innermost object, grouping the values of
    /// repeated flattened keys into a single array
    fn write_key<S: JsonSink + ?Sized>(
        &mut self,
        sink: &mut S,
        name: &str,
        flags: OverlayFlags,
        id: Option<u16>,
    ) -> Result<(), Error> {
        let frame = self.frame_mut();
        if let Some(flattening) = frame.flattening {
            if id == Some(flattening) {
                frame.key = flags;
                frame.key_pending = true;
                return Ok(());
            }

            frame.close_flatten(sink)?;
        }

        sink.property_name(name)?;
        if let (true, Some(id)) = (flags.contains(OverlayFlags::FLATTEN), id) {
            sink.begin_array()?;
            frame.flattening = Some(id);
        }

        frame.key = flags;
        frame.key_pending = true;
        Ok(())
    }

    fn parse_checksum<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        is_final: bool,
        sink: &mut S,
    ) -> Result<usize, Halt> {
        let line = match data.get(..=CHECKSUM_LEN) {
            Some(line) => line,
            None => {
                let prefix = data.len().min(3);
                if data[..prefix] == b"SAV"[..prefix] && !is_final {
                    return Err(Halt::Incomplete);
                }

                self.state = ParseState::Token;
                return Ok(0);
            }
        };

        self.state = ParseState::Token;
        if !line.starts_with(b"SAV") || line[CHECKSUM_LEN] != b'\n' {
            log::debug!("save does not start with a checksum line");
            return Ok(0);
        }

        let text = String::from_utf8_lossy(&line[..CHECKSUM_LEN]).into_owned();
        log::debug!("found checksum line: {}", text);
        sink.property_name("checksum")?;
        sink.string_value(&text)?;
        self.checksum = Some(text);
        Ok(line.len())
    }

    fn parse_token<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        sink: &mut S,
    ) -> Result<usize, Halt> {
        let (token, _) = read_id(data).map_err(|e| self.lex_halt(e))?;
        match token {
            Ck3Token::EQUAL => {
                self.state = match self.containers.last() {
                    Some(ContainerKind::HiddenObject) => ParseState::HiddenValue,
                    _ => ParseState::Value,
                };
                Ok(2)
            }
            Ck3Token::CLOSE if self.containers.len() == 1 => {
                self.state = ParseState::ContainerToRoot;
                Ok(0)
            }
            x if x.is_identifier() && self.in_object() => {
                let name = self.resolve(x.id())?;
                let flags = self.tokens.overlay(x.id());
                self.write_key(sink, &name, flags, Some(x.id()))?;
                Ok(2)
            }
            x if x.is_identifier()
                && matches!(self.containers.last(), Some(ContainerKind::HiddenObject)) =>
            {
                Err(self.unexpected(x).into())
            }
            x if x.is_key_eligible() && self.in_object() => {
                self.state = ParseState::IdentifierKey;
                Ok(0)
            }
            _ => {
                self.state = ParseState::Value;
                Ok(0)
            }
        }
    }

    fn parse_identifier_key<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        sink: &mut S,
    ) -> Result<usize, Halt> {
        let (token, rest) = read_token(data).map_err(|e| self.lex_halt(e))?;

        // A typed key is only governed by the flags its container inherited
        self.frame_mut().key = OverlayFlags::empty();
        let (text, used) = match self.key_text(&token)? {
            Some(x) => x,
            None => {
                let (id, _) = read_id(data).map_err(|e| self.lex_halt(e))?;
                return Err(self.unexpected(id).into());
            }
        };

        self.frame_mut().used(used);
        self.write_key(sink, &text, OverlayFlags::empty(), None)?;
        self.state = ParseState::Token;
        Ok(data.len() - rest.len())
    }

    fn parse_value<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        is_final: bool,
        sink: &mut S,
    ) -> Result<usize, Halt> {
        let (token, rest) = read_token(data).map_err(|e| self.lex_halt(e))?;
        let consumed = data.len() - rest.len();
        match token {
            Token::Open => {
                self.state = ParseState::Container;
                return Ok(consumed);
            }
            Token::Close => {
                self.parse_close(rest, is_final, sink)?;
                return Ok(consumed);
            }
            Token::Equal => return Err(self.unexpected(Ck3Token::EQUAL).into()),
            _ => {}
        }

        if self.hidden_object_candidate() {
            let is_pair = match read_id(rest) {
                Ok((next, _)) => next == Ck3Token::EQUAL,
                Err(_) if is_final => false,
                Err(_) => return Err(Halt::Incomplete),
            };

            if is_pair {
                if let Some((text, used)) = self.key_text(&token)? {
                    let key = match token {
                        Token::Id(id) => self.tokens.overlay(id),
                        _ => OverlayFlags::empty(),
                    };

                    self.frame_mut().used(used);
                    sink.begin_object()?;
                    sink.property_name(&text)?;
                    self.containers.push(ContainerKind::HiddenObject);
                    self.overlays.push(OverlayFrame {
                        key,
                        key_pending: true,
                        ..OverlayFrame::default()
                    });
                    self.state = ParseState::Token;
                    return Ok(consumed);
                }
            }
        }

        if self.in_object() && !self.frame().key_pending {
            let (id, _) = read_id(data).map_err(|e| self.lex_halt(e))?;
            return Err(self.unexpected(id).into());
        }

        self.write_scalar(token, sink)?;
        self.value_written(sink)?;
        self.state = ParseState::Token;
        Ok(consumed)
    }

    #[inline]
    fn hidden_object_candidate(&self) -> bool {
        matches!(self.containers.last(), Some(ContainerKind::Array))
            && self
                .frame()
                .active()
                .contains(OverlayFlags::HIDDEN_OBJECT_CONTAINER)
    }

    fn write_scalar<S: JsonSink + ?Sized>(
        &mut self,
        token: Token,
        sink: &mut S,
    ) -> Result<(), Error> {
        let flags = self.frame().active();
        match token {
            Token::I32(x) if flags.contains(OverlayFlags::AS_DATE) => {
                let date = self.date_text(x)?;
                sink.string_value(&date)?;
                self.frame_mut().used(OverlayFlags::AS_DATE);
            }
            Token::I32(x) => sink.i32_value(x)?,
            Token::U32(x) => sink.u32_value(x)?,
            Token::U64(x) => sink.u64_value(x)?,
            Token::F32(x) => sink.f32_value(x)?,
            Token::Bool(x) => sink.bool_value(x)?,
            Token::F64(x) if flags.contains(OverlayFlags::AS_Q) => {
                sink.f64_value(decode_q49_15(x))?;
                self.frame_mut().used(OverlayFlags::AS_Q);
            }
            Token::F64(x) => sink.f64_value(decode_long_float(x))?,
            Token::Quoted(x) | Token::Unquoted(x) => {
                sink.string_value(&String::from_utf8_lossy(x))?
            }
            Token::Rgb(color) => {
                sink.begin_array()?;
                sink.u32_value(color.r)?;
                sink.u32_value(color.g)?;
                sink.u32_value(color.b)?;
                sink.end_array()?;
            }
            Token::Id(id) => {
                let name = self.resolve(id)?;
                sink.string_value(&name)?;
            }
            Token::Equal => return Err(self.unexpected(Ck3Token::EQUAL)),
            Token::Open => return Err(self.unexpected(Ck3Token::OPEN)),
            Token::Close => return Err(self.unexpected(Ck3Token::CLOSE)),
        }

        Ok(())
    }

    /// Bookkeeping after a scalar or a nested container completes: the pending
    /// key is satisfied and an implicit object is closed
    fn value_written<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        self.frame_mut().value_done();
        if let Some(ContainerKind::HiddenObject) = self.containers.last() {
            self.containers.pop();
            self.overlays.pop();
            sink.end_object()?;
            self.frame_mut().value_done();
        }
        Ok(())
    }

    fn parse_close<S: JsonSink + ?Sized>(
        &mut self,
        rest: &[u8],
        is_final: bool,
        sink: &mut S,
    ) -> Result<(), Halt> {
        let kind = match self.containers.last() {
            None => {
                return Err(ErrorKind::StackEmpty {
                    offset: self.offset,
                }
                .into())
            }
            Some(ContainerKind::HiddenObject) => {
                return Err(ErrorKind::DanglingHiddenObject {
                    offset: self.offset,
                }
                .into())
            }
            Some(kind) => *kind,
        };

        let to_root = self.containers.len() == 1;
        let gamestate_follows = to_root
            && self.detect_gamestate
            && match read_u32(rest) {
                Ok((magic, _)) => magic == ZIP_MAGIC,
                Err(_) if is_final => false,
                Err(_) => return Err(Halt::Incomplete),
            };

        self.containers.pop();
        let mut frame = self.overlays.pop().unwrap_or_default();
        match kind {
            ContainerKind::Object => {
                frame.close_flatten(sink)?;
                sink.end_object()?;
            }
            ContainerKind::Array => sink.end_array()?,
            ContainerKind::RootObject => frame.close_flatten(sink)?,
            ContainerKind::HiddenObject => {}
        }

        self.value_written(sink)?;
        self.state = if gamestate_follows {
            log::debug!("compressed section follows root at offset {}", self.offset);
            ParseState::DecompressGamestate
        } else {
            ParseState::Token
        };

        Ok(())
    }

    fn parse_container<S: JsonSink + ?Sized>(
        &mut self,
        data: &[u8],
        sink: &mut S,
    ) -> Result<usize, Halt> {
        let guess = match peek_container(data) {
            Ok(guess) => guess,
            Err(PeekError::Eof) => return Err(Halt::Incomplete),
            Err(PeekError::InvalidRgb) => {
                return Err(ErrorKind::InvalidRgb {
                    offset: self.offset,
                }
                .into())
            }
            Err(PeekError::UnexpectedToken(token)) => return Err(self.unexpected(token).into()),
        };

        let parent = *self.frame();
        let active = parent.active();
        let mut inherited = if active.contains(OverlayFlags::KEEP_FOR_CHILDREN) {
            active & OverlayFlags::VALUE_FLAGS
        } else {
            OverlayFlags::empty()
        };
        inherited |= parent.key & OverlayFlags::HIDDEN_OBJECT_CONTAINER;

        self.state = ParseState::Token;
        if self.in_object() && !parent.key_pending {
            let splice = self.containers.is_empty() && guess.kind == GuessKind::Object;
            if !splice || guess.empty {
                return Err(ErrorKind::UnnamedContainer {
                    offset: self.offset,
                }
                .into());
            }

            log::trace!("keyless object at root offset {}", self.offset);
            self.root.close_flatten(sink)?;
            self.containers.push(ContainerKind::RootObject);
            self.overlays.push(OverlayFrame {
                inherited,
                ..OverlayFrame::default()
            });
            return Ok(0);
        }

        let kind = match guess.kind {
            GuessKind::Object => {
                sink.begin_object()?;
                ContainerKind::Object
            }
            GuessKind::Array => {
                sink.begin_array()?;
                ContainerKind::Array
            }
        };

        log::trace!("resolved {:?} at offset {}", kind, self.offset);
        self.frame_mut().key_pending = false;
        self.containers.push(kind);
        self.overlays.push(OverlayFrame {
            inherited,
            ..OverlayFrame::default()
        });
        Ok(0)
    }
}
