use crate::binary::{BinParser, Ck3Tokens, FailedResolveStrategy, ParseState};
use crate::buffer::{BufferWindow, BufferWindowBuilder};
use crate::envelope::{pump, ChannelReader, CompressedGamestateReader, GamestateInfo};
use crate::json::{JsonSink, JsonWriter, ValueSink};
use crate::{Error, ErrorKind};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;

/// A cloneable flag that stops an in progress decode
///
/// The decoder checks the flag before every read of the input and of the
/// decompressed gamestate. A cancelled decode returns
/// [`ErrorKind::Cancelled`] and whatever was written to the sink is not a
/// complete document.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Cancellation::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What was found while decoding a save
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodeSummary {
    /// The checksum line at the start of the save
    pub checksum: Option<String>,

    /// The header of the compressed gamestate entry, when one was decoded
    pub gamestate: Option<GamestateInfo>,
}

/// Build a customized decoder
#[derive(Debug, Clone)]
pub struct DecoderBuilder {
    parse_gamestate: bool,
    buffer_len: usize,
    channel_capacity: usize,
    threaded: bool,
    on_failed_resolve: FailedResolveStrategy,
    cancellation: Cancellation,
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        DecoderBuilder {
            parse_gamestate: true,
            // Default buffer size of 32 KiB, same size that flate2 uses.
            buffer_len: 32 * 1024,
            channel_capacity: 4,
            threaded: true,
            on_failed_resolve: FailedResolveStrategy::Error,
            cancellation: Cancellation::default(),
        }
    }
}

impl DecoderBuilder {
    /// Decode the compressed gamestate that follows the metadata. When false,
    /// decoding stops once the metadata ends.
    pub fn parse_gamestate(mut self, parse_gamestate: bool) -> Self {
        self.parse_gamestate = parse_gamestate;
        self
    }

    /// Initial size of the read buffer. The buffer grows when a single token
    /// does not fit.
    pub fn buffer_len(mut self, buffer_len: usize) -> Self {
        self.buffer_len = buffer_len.max(1);
        self
    }

    /// Number of decompressed chunks that may be in flight between the
    /// decompressor and the gamestate parser
    pub fn channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Decompress the gamestate on a separate thread. When false, the
    /// gamestate parser pulls from the decompressor directly.
    pub fn threaded(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    /// Set the behavior when an identifier is missing from the token
    /// dictionary
    pub fn on_failed_resolve(mut self, strategy: FailedResolveStrategy) -> Self {
        self.on_failed_resolve = strategy;
        self
    }

    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn build(self, tokens: &Ck3Tokens) -> Decoder<'_> {
        Decoder {
            tokens,
            options: self,
        }
    }
}

/// Decodes a save read from an input stream into a [`JsonSink`]
///
/// The output is a single object holding the `checksum`, the metadata fields,
/// and the `gamestate` object.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    tokens: &'a Ck3Tokens,
    options: DecoderBuilder,
}

impl<'a> Decoder<'a> {
    /// A decoder with the default options
    pub fn new(tokens: &'a Ck3Tokens) -> Self {
        DecoderBuilder::default().build(tokens)
    }

    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::default()
    }

    pub fn decode<R, S>(&self, mut reader: R, sink: &mut S) -> Result<DecodeSummary, Error>
    where
        R: Read + Send,
        S: JsonSink + ?Sized,
    {
        sink.begin_object()?;
        let mut buf = BufferWindowBuilder::default()
            .buffer_len(self.options.buffer_len)
            .build();
        let mut parser = BinParser::new(ParseState::Checksum, self.tokens)
            .on_failed_resolve(self.options.on_failed_resolve);
        self.drive(&mut parser, &mut buf, &mut reader, sink)?;
        parser.finish(sink)?;

        let mut summary = DecodeSummary {
            checksum: parser.checksum().map(String::from),
            gamestate: None,
        };

        if parser.state() == ParseState::DecompressGamestate && self.options.parse_gamestate {
            sink.property_name("gamestate")?;
            sink.begin_object()?;
            let gamestate = CompressedGamestateReader::new(buf.window().chain(&mut reader))?;
            summary.gamestate = Some(gamestate.info());
            self.decode_gamestate(gamestate, sink)?;
            sink.end_object()?;
        }

        sink.end_object()?;
        log::info!(
            "decoded save (checksum: {}, gamestate: {})",
            summary.checksum.is_some(),
            summary.gamestate.is_some()
        );
        Ok(summary)
    }

    /// Decode a save into a minified JSON byte vector
    pub fn to_json_vec<R: Read + Send>(&self, reader: R) -> Result<Vec<u8>, Error> {
        let mut writer = JsonWriter::new(Vec::new());
        self.decode(reader, &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Decode a save into an in memory JSON value
    pub fn to_value<R: Read + Send>(&self, reader: R) -> Result<serde_json::Value, Error> {
        let mut sink = ValueSink::new();
        self.decode(reader, &mut sink)?;
        sink.into_value()
    }

    /// Feed the parser until its input is exhausted or the gamestate begins
    fn drive<R, S>(
        &self,
        parser: &mut BinParser,
        buf: &mut BufferWindow,
        mut reader: R,
        sink: &mut S,
    ) -> Result<(), Error>
    where
        R: Read,
        S: JsonSink + ?Sized,
    {
        loop {
            if self.options.cancellation.is_cancelled() {
                return Err(Error::new(ErrorKind::Cancelled));
            }

            buf.fill_buf(&mut reader)?;
            let is_final = buf.is_eof();
            let progress = parser.parse_chunk(buf.window(), is_final, sink)?;
            buf.advance(progress.consumed);

            if parser.state() == ParseState::DecompressGamestate {
                return Ok(());
            }

            if is_final {
                if buf.window_len() != 0 {
                    return Err(Error::new(ErrorKind::Eof {
                        offset: buf.position(),
                    }));
                }

                return Ok(());
            }
        }
    }

    /// Parse the decompressed gamestate, which has no checksum and is not
    /// searched for further compressed sections
    fn decode_document<R, S>(&self, reader: R, sink: &mut S) -> Result<(), Error>
    where
        R: Read,
        S: JsonSink + ?Sized,
    {
        let mut buf = BufferWindowBuilder::default()
            .buffer_len(self.options.buffer_len)
            .build();
        let mut parser = BinParser::new(ParseState::Token, self.tokens)
            .on_failed_resolve(self.options.on_failed_resolve)
            .detect_gamestate(false);
        self.drive(&mut parser, &mut buf, reader, sink)?;
        parser.finish(sink)
    }

    fn decode_gamestate<G, S>(&self, gamestate: G, sink: &mut S) -> Result<(), Error>
    where
        G: Read + Send,
        S: JsonSink + ?Sized,
    {
        if !self.options.threaded {
            return self.decode_document(gamestate, sink);
        }

        let (sender, receiver) = sync_channel(self.options.channel_capacity);
        let chunk_len = self.options.buffer_len;
        let cancel = &self.options.cancellation;
        std::thread::scope(|s| {
            let pumper = s.spawn(move || pump(gamestate, sender, chunk_len, cancel));
            let parsed = self.decode_document(ChannelReader::new(receiver), sink);
            let pumped = match pumper.join() {
                Ok(x) => x,
                Err(e) => std::panic::resume_unwind(e),
            };

            // A failed decompression surfaces to the parser as a truncated
            // document, so report the root cause
            pumped?;
            parsed
        })
    }
}

/// Decode a token fragment that has no checksum or compressed section into a
/// JSON string
///
/// ```
/// use ck3bin::binary::{Ck3Tokens, FragmentBuilder, TokenDictionary};
///
/// # fn main() -> Result<(), ck3bin::Error> {
/// let dictionary: TokenDictionary = vec![(0x3155, "meta_data")].into_iter().collect();
/// let tokens = Ck3Tokens::new(dictionary);
/// let data = FragmentBuilder::new().id(0x3155).eq().open().close().build();
/// assert_eq!(ck3bin::decode_fragment(&data, &tokens)?, r#"{"meta_data":{}}"#);
/// # Ok(())
/// # }
/// ```
pub fn decode_fragment(data: &[u8], tokens: &Ck3Tokens) -> Result<String, Error> {
    let mut writer = JsonWriter::new(Vec::new());
    writer.begin_object()?;
    let mut parser = BinParser::new(ParseState::Token, tokens).detect_gamestate(false);
    let progress = parser.parse_chunk(data, true, &mut writer)?;
    if progress.consumed != data.len() {
        return Err(Error::new(ErrorKind::Eof {
            offset: progress.consumed,
        }));
    }

    parser.finish(&mut writer)?;
    writer.end_object()?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::new(ErrorKind::Sink(e.to_string())))
}
