use super::{GamestateInfo, LocalFileHeader, DEFLATE_METHOD, LOCAL_HEADER_LEN, ZIP_MAGIC};
use crate::decoder::Cancellation;
use crate::{Error, ErrorKind};
use flate2::read::DeflateDecoder;
use std::io::{Read, Take};
use std::sync::mpsc::{Receiver, SyncSender};

const GAMESTATE_NAME: &[u8] = b"gamestate";

/// Streams the decompressed gamestate out of the zip entry that follows the
/// metadata
///
/// Construction reads the local file header, the filename, and the extra
/// field. Reads then inflate at most `compressed_size` bytes of the
/// underlying reader, which is left positioned at the end of the entry.
#[derive(Debug)]
pub struct CompressedGamestateReader<R> {
    reader: DeflateDecoder<Take<R>>,
    info: GamestateInfo,
}

impl<R: Read> CompressedGamestateReader<R> {
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let mut data = [0u8; LOCAL_HEADER_LEN];
        reader.read_exact(&mut data)?;
        let header = LocalFileHeader::from_slice(&data);
        if header.signature != ZIP_MAGIC {
            return Err(Error::new(ErrorKind::ZipSignature {
                signature: header.signature,
            }));
        }

        let mut filename = vec![0u8; usize::from(header.filename_len)];
        reader.read_exact(&mut filename)?;
        if filename != GAMESTATE_NAME {
            return Err(Error::new(ErrorKind::ZipFilename {
                filename: String::from_utf8_lossy(&filename).into_owned(),
            }));
        }

        if header.compression_method != DEFLATE_METHOD {
            return Err(Error::new(ErrorKind::ZipCompression {
                method: header.compression_method,
            }));
        }

        let mut extra = vec![0u8; usize::from(header.extra_len)];
        reader.read_exact(&mut extra)?;

        let info = header.info();
        log::debug!(
            "gamestate entry: {} compressed bytes, {} uncompressed bytes, crc32 {:08x}",
            info.compressed_size,
            info.uncompressed_size,
            info.crc32
        );

        let reader = DeflateDecoder::new(reader.take(u64::from(info.compressed_size)));
        Ok(CompressedGamestateReader { reader, info })
    }
}

impl<R> CompressedGamestateReader<R> {
    /// The sizes and checksum declared by the entry
    pub fn info(&self) -> GamestateInfo {
        self.info
    }

    /// Returns the underlying reader
    pub fn into_inner(self) -> R {
        self.reader.into_inner().into_inner()
    }
}

impl<R: Read> Read for CompressedGamestateReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Move everything from the reader into the channel in chunks of at most
/// `chunk_len` bytes
///
/// The channel is bounded, so the pump blocks while the receiving side is
/// behind. Returns the number of bytes sent. A receiver that hangs up ends the
/// pump early without an error.
pub fn pump<R: Read>(
    mut reader: R,
    sender: SyncSender<Vec<u8>>,
    chunk_len: usize,
    cancel: &Cancellation,
) -> Result<u64, Error> {
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::new(ErrorKind::Cancelled));
        }

        let mut chunk = vec![0u8; chunk_len.max(1)];
        let read = match reader.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        chunk.truncate(read);
        total += read as u64;
        if sender.send(chunk).is_err() {
            log::debug!("receiver hung up after {} bytes", total);
            return Ok(total);
        }
    }
}

/// Adapts the receiving end of a [`pump`] back into a reader
///
/// Reading returns 0 once the sender has finished and every chunk is drained.
#[derive(Debug)]
pub struct ChannelReader {
    receiver: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    pub fn new(receiver: Receiver<Vec<u8>>) -> Self {
        ChannelReader {
            receiver,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos == self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }

        let remaining = &self.chunk[self.pos..];
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.pos += len;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::sync::mpsc::sync_channel;

    fn entry(name: &[u8], method: u16, body: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        let compressed = encoder.finish().unwrap();
        let header = LocalFileHeader {
            signature: ZIP_MAGIC,
            version_to_extract: 20,
            flags: 0,
            compression_method: method,
            dos_time: 0,
            crc32: 0,
            compressed_size: compressed.len() as u32,
            uncompressed_size: body.len() as u32,
            filename_len: name.len() as u16,
            extra_len: 3,
        };

        let mut out = header.to_bytes().to_vec();
        out.extend_from_slice(name);
        out.extend_from_slice(b"xyz");
        out.extend_from_slice(&compressed);
        out
    }

    #[test]
    fn test_stops_at_entry_end() {
        let mut data = entry(b"gamestate", DEFLATE_METHOD, b"hello world");
        data.extend_from_slice(b"PK\x01\x02trailing");

        let mut reader = CompressedGamestateReader::new(&data[..]).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
        assert_eq!(reader.info().uncompressed_size, 11);
        assert_eq!(reader.into_inner(), b"PK\x01\x02trailing");
    }

    #[test]
    fn test_wrong_filename() {
        let data = entry(b"meta", DEFLATE_METHOD, b"hello");
        let err = CompressedGamestateReader::new(&data[..]).unwrap_err();
        match err.kind() {
            ErrorKind::ZipFilename { filename } => assert_eq!(filename, "meta"),
            x => panic!("unexpected error: {:?}", x),
        }
    }

    #[test]
    fn test_wrong_compression() {
        let data = entry(b"gamestate", 0, b"hello");
        let err = CompressedGamestateReader::new(&data[..]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ZipCompression { method: 0 }));
    }

    #[test]
    fn test_wrong_signature() {
        let mut data = entry(b"gamestate", DEFLATE_METHOD, b"hello");
        data[3] = 0x05;
        let err = CompressedGamestateReader::new(&data[..]).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::ZipSignature {
                signature: 0x05034b50
            }
        ));
    }

    #[test]
    fn test_pump_through_channel() {
        let body: Vec<u8> = (0..10_000u32).map(|x| (x % 251) as u8).collect();
        let (tx, rx) = sync_channel(1);
        let cancel = Cancellation::new();
        let sent = std::thread::scope(|s| {
            let handle = s.spawn(|| pump(&body[..], tx, 1000, &cancel));
            let mut out = Vec::new();
            ChannelReader::new(rx).read_to_end(&mut out).unwrap();
            assert_eq!(out, body);
            handle.join().unwrap()
        });
        assert_eq!(sent.unwrap(), 10_000);
    }

    #[test]
    fn test_pump_cancelled() {
        let (tx, _rx) = sync_channel(4);
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = pump(&b"abc"[..], tx, 2, &cancel).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Cancelled));
    }
}
