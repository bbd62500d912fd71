//! The compressed section that follows the metadata of a save
//!
//! A CK3 save is laid out as:
//!
//! 1. A checksum line (`SAV` followed by 20 characters and a newline)
//! 2. The metadata, a binary document whose root closes just before
//! 3. A zip local file header for an entry named `gamestate`, followed by the
//!    deflate compressed gamestate document
//!
//! Only the single `gamestate` entry is read. The central directory and any
//! other entries that follow it are never touched, so the reader stops
//! exactly `compressed_size` bytes after the entry's header.
//!
//! ```text
//! CompressedGamestateReader
//! ├── LocalFileHeader (30 bytes, validated)
//! ├── filename (must be "gamestate") and extra field
//! └── DeflateDecoder<Take<R>> → decompressed gamestate bytes
//! ```

mod file;
mod header;

pub use file::*;
pub use header::*;
