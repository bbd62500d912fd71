use super::{OverlayFlags, TokenResolver, OVERLAYS};
use crate::{Error, ErrorKind};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Environment variable that names the token dictionary asset used by
/// [`Ck3Tokens::global`]
pub const TOKENS_ENV: &str = "CK3_TOKENS";

/// Token dictionary asset used by [`Ck3Tokens::global`] when [`TOKENS_ENV`]
/// is not set
pub const DEFAULT_TOKENS_PATH: &str = "assets/ck3.tok";

/// An immutable map of 16 bit token ids to their identifier text
///
/// The asset format is line oriented: a hexadecimal id (optionally prefixed
/// with `0x`) followed by whitespace and the name. Blank lines and lines
/// starting with `#` are ignored.
///
/// ```
/// use ck3bin::binary::{TokenDictionary, TokenResolver};
/// let data = "# ck3 tokens\n0x3155 meta_data\n58f save_game_version\n";
/// let dictionary = TokenDictionary::parse(data)?;
/// assert_eq!(dictionary.resolve(0x058f), Some("save_game_version"));
/// assert_eq!(dictionary.id_of("meta_data"), Some(0x3155));
/// # Ok::<(), ck3bin::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenDictionary {
    names: HashMap<u16, String>,
}

impl TokenDictionary {
    pub fn parse(data: &str) -> Result<Self, Error> {
        let mut names = HashMap::new();
        for (i, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = || Error::new(ErrorKind::TokenFile { line: i + 1 });
            let mut fields = line.split_whitespace();
            let (id, name) = match (fields.next(), fields.next()) {
                (Some(id), Some(name)) => (id, name),
                _ => return Err(malformed()),
            };

            let hex = id
                .strip_prefix("0x")
                .or_else(|| id.strip_prefix("0X"))
                .unwrap_or(id);
            let id = u16::from_str_radix(hex, 16).map_err(|_| malformed())?;
            names.insert(id, String::from(name));
        }

        Ok(TokenDictionary { names })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut data = String::new();
        reader.read_to_string(&mut data)?;
        Self::parse(&data)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn get(&self, id: u16) -> Option<&str> {
        self.names.get(&id).map(|x| x.as_str())
    }

    /// Reverse lookup of an identifier's id. This is a linear scan.
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .find(|(_, x)| x.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

impl TokenResolver for TokenDictionary {
    fn resolve(&self, token: u16) -> Option<&str> {
        self.get(token)
    }
}

impl<S: Into<String>> FromIterator<(u16, S)> for TokenDictionary {
    fn from_iter<T: IntoIterator<Item = (u16, S)>>(iter: T) -> Self {
        let names = iter
            .into_iter()
            .map(|(id, name)| (id, name.into()))
            .collect();
        TokenDictionary { names }
    }
}

/// The token dictionary composed with the overlay table
///
/// Built once and then only read, so a single instance can be shared by any
/// number of parsers.
#[derive(Debug, Clone, Default)]
pub struct Ck3Tokens {
    dictionary: TokenDictionary,
    overlays: HashMap<u16, OverlayFlags>,
}

static GLOBAL_TOKENS: OnceCell<Ck3Tokens> = OnceCell::new();

impl Ck3Tokens {
    /// Join the dictionary with the curated [`OVERLAYS`]
    pub fn new(dictionary: TokenDictionary) -> Self {
        Self::with_overlays(dictionary, OVERLAYS)
    }

    /// Snapshot the names of any resolver, such as a `HashMap` built by the
    /// caller, and join them with the curated [`OVERLAYS`]
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use ck3bin::binary::{Ck3Tokens, OverlayFlags, TokenResolver};
    ///
    /// let mut map = HashMap::new();
    /// map.insert(0x2c81, "gold");
    /// let tokens = Ck3Tokens::from_resolver(&map);
    /// assert_eq!(tokens.resolve(0x2c81), Some("gold"));
    /// assert_eq!(tokens.overlay(0x2c81), OverlayFlags::AS_Q);
    /// ```
    pub fn from_resolver<R: TokenResolver + ?Sized>(resolver: &R) -> Self {
        let dictionary = (0..=u16::MAX)
            .filter_map(|id| resolver.resolve(id).map(|name| (id, name)))
            .collect();
        Self::new(dictionary)
    }

    /// Join the dictionary with a custom overlay list. Names that the
    /// dictionary does not contain are dropped.
    pub fn with_overlays(dictionary: TokenDictionary, overlays: &[(&str, OverlayFlags)]) -> Self {
        let by_name: HashMap<&str, OverlayFlags> = overlays.iter().copied().collect();
        let overlays = dictionary
            .iter()
            .filter_map(|(id, name)| by_name.get(name).map(|flags| (id, *flags)))
            .collect();

        Ck3Tokens {
            dictionary,
            overlays,
        }
    }

    /// The process wide tokens, loaded on first use from the file named by
    /// the `CK3_TOKENS` environment variable or `assets/ck3.tok`.
    pub fn global() -> Result<&'static Ck3Tokens, Error> {
        GLOBAL_TOKENS.get_or_try_init(|| {
            let path =
                std::env::var(TOKENS_ENV).unwrap_or_else(|_| String::from(DEFAULT_TOKENS_PATH));
            let dictionary = TokenDictionary::from_file(&path)?;
            log::debug!("loaded {} tokens from {}", dictionary.len(), path);
            Ok(Ck3Tokens::new(dictionary))
        })
    }

    pub fn dictionary(&self) -> &TokenDictionary {
        &self.dictionary
    }

    /// Overlay for the identifier, empty if it has none
    #[inline]
    pub fn overlay(&self, id: u16) -> OverlayFlags {
        self.overlays.get(&id).copied().unwrap_or_default()
    }
}

impl TokenResolver for Ck3Tokens {
    fn resolve(&self, token: u16) -> Option<&str> {
        self.dictionary.get(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dictionary() {
        let data = "# comment\n\n0x00e1 type\n0X626 male\n6ef age extra\n";
        let dictionary = TokenDictionary::parse(data).unwrap();
        assert_eq!(dictionary.len(), 3);
        assert_eq!(dictionary.get(0xe1), Some("type"));
        assert_eq!(dictionary.get(0x626), Some("male"));
        assert_eq!(dictionary.get(0x6ef), Some("age"));
    }

    #[test]
    fn test_parse_dictionary_malformed() {
        let err = TokenDictionary::parse("0x00e1 type\nzzzz bad\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TokenFile { line: 2 }));

        let err = TokenDictionary::parse("0x00e1\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TokenFile { line: 1 }));
    }

    #[test]
    fn test_overlay_join() {
        let dictionary: TokenDictionary =
            vec![(0x10, "birth"), (0x11, "gold"), (0x12, "name")].into_iter().collect();
        let tokens = Ck3Tokens::new(dictionary);
        assert_eq!(tokens.overlay(0x10), OverlayFlags::AS_DATE);
        assert_eq!(tokens.overlay(0x11), OverlayFlags::AS_Q);
        assert_eq!(tokens.overlay(0x12), OverlayFlags::empty());
        assert_eq!(tokens.overlay(0x13), OverlayFlags::empty());
    }

    #[test]
    fn test_overlay_join_custom() {
        let dictionary: TokenDictionary = vec![(0x10, "a")].into_iter().collect();
        let tokens = Ck3Tokens::with_overlays(
            dictionary,
            &[("a", OverlayFlags::FLATTEN), ("missing", OverlayFlags::AS_Q)],
        );
        assert_eq!(tokens.overlay(0x10), OverlayFlags::FLATTEN);
        assert_eq!(tokens.resolve(0x10), Some("a"));
    }

    #[test]
    fn test_from_resolver() {
        let map: HashMap<u16, String> = vec![
            (0x10, String::from("birth")),
            (0x11, String::from("triggered_event")),
        ]
        .into_iter()
        .collect();
        let tokens = Ck3Tokens::from_resolver(&map);
        assert_eq!(tokens.dictionary().len(), 2);
        assert_eq!(tokens.resolve(0x11), Some("triggered_event"));
        assert_eq!(tokens.overlay(0x10), OverlayFlags::AS_DATE);
        assert_eq!(tokens.overlay(0x11), OverlayFlags::FLATTEN);
    }

    #[test]
    fn test_global_asset() {
        let tokens = Ck3Tokens::global().unwrap();
        let id = tokens.dictionary().id_of("meta_data").unwrap();
        assert_eq!(id, 0x3155);
    }
}
