use super::Ck3Token;

/// Encodes a sequence of tokens in the binary format
///
/// Handy for building synthetic saves in tests and tools.
///
/// ```
/// use ck3bin::binary::FragmentBuilder;
///
/// // save_game_version = 3
/// let data = FragmentBuilder::new().id(0x058f).eq().int(3).build();
/// assert_eq!(data, [0x8f, 0x05, 0x01, 0x00, 0x0c, 0x00, 0x03, 0x00, 0x00, 0x00]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FragmentBuilder {
    data: Vec<u8>,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        FragmentBuilder::default()
    }

    #[inline]
    fn push_token(mut self, token: Ck3Token) -> Self {
        self.data.extend_from_slice(&token.id().to_le_bytes());
        self
    }

    /// Any raw token, including identifiers
    pub fn token(self, token: Ck3Token) -> Self {
        self.push_token(token)
    }

    /// An identifier token
    pub fn id(self, id: u16) -> Self {
        self.push_token(Ck3Token::new(id))
    }

    pub fn eq(self) -> Self {
        self.push_token(Ck3Token::EQUAL)
    }

    pub fn open(self) -> Self {
        self.push_token(Ck3Token::OPEN)
    }

    pub fn close(self) -> Self {
        self.push_token(Ck3Token::CLOSE)
    }

    pub fn int(self, x: i32) -> Self {
        let mut this = self.push_token(Ck3Token::I32);
        this.data.extend_from_slice(&x.to_le_bytes());
        this
    }

    pub fn uint(self, x: u32) -> Self {
        let mut this = self.push_token(Ck3Token::U32);
        this.data.extend_from_slice(&x.to_le_bytes());
        this
    }

    pub fn ulong(self, x: u64) -> Self {
        let mut this = self.push_token(Ck3Token::U64);
        this.data.extend_from_slice(&x.to_le_bytes());
        this
    }

    pub fn float(self, x: f32) -> Self {
        let mut this = self.push_token(Ck3Token::F32);
        this.data.extend_from_slice(&x.to_le_bytes());
        this
    }

    /// A `long_float` in its raw fixed point form
    pub fn long_float(self, raw: i64) -> Self {
        let mut this = self.push_token(Ck3Token::F64);
        this.data.extend_from_slice(&raw.to_le_bytes());
        this
    }

    pub fn bool(self, x: bool) -> Self {
        let mut this = self.push_token(Ck3Token::BOOL);
        this.data.push(u8::from(x));
        this
    }

    pub fn quoted(self, x: &str) -> Self {
        self.string(Ck3Token::QUOTED, x)
    }

    pub fn unquoted(self, x: &str) -> Self {
        self.string(Ck3Token::UNQUOTED, x)
    }

    fn string(self, token: Ck3Token, x: &str) -> Self {
        // Strings longer than a u16 length prefix are truncated
        let bytes = &x.as_bytes()[..x.len().min(usize::from(u16::MAX))];
        let mut this = self.push_token(token);
        this.data
            .extend_from_slice(&(bytes.len() as u16).to_le_bytes());
        this.data.extend_from_slice(bytes);
        this
    }

    pub fn rgb(self, r: u32, g: u32, b: u32) -> Self {
        let mut this = self.push_token(Ck3Token::RGB).open();
        for channel in [r, g, b] {
            this = this.push_token(Ck3Token::U32);
            this.data.extend_from_slice(&channel.to_le_bytes());
        }
        this.close()
    }

    /// Append bytes verbatim
    pub fn raw(mut self, data: &[u8]) -> Self {
        self.data.extend_from_slice(data);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}
