use std::io::Read;

/// A sliding window over a byte buffer that is refilled from a reader
#[derive(Debug)]
pub(crate) struct BufferWindow {
    buf: Vec<u8>,

    // start of window into buffer
    start: usize,

    // end of window into buffer
    end: usize,

    // number of consumed bytes from prior reads
    prior_reads: usize,

    // the reader returned 0 bytes
    eof: bool,
}

impl BufferWindow {
    #[inline]
    pub fn advance(&mut self, amt: usize) {
        debug_assert!(self.start + amt <= self.end);
        self.start += amt;
    }

    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    #[inline]
    pub fn window_len(&self) -> usize {
        self.end - self.start
    }

    /// Number of bytes consumed since the start of the stream
    #[inline]
    pub fn position(&self) -> usize {
        self.prior_reads + self.start
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// This seems similar to `BufRead::fill_buf`, but whereas the `BufRead`
    /// will only call the underlying read if the buffer is currently empty,
    /// this function will copy over the bytes that haven't been consumed to the
    /// start. When the unconsumed bytes already fill the buffer, the buffer
    /// doubles in size.
    pub fn fill_buf(&mut self, mut reader: impl Read) -> std::io::Result<usize> {
        // Copy over the unconsumed bytes to the start of the buffer
        let carry_over = self.window_len();
        self.buf.copy_within(self.start..self.end, 0);
        self.prior_reads += self.start;
        self.start = 0;
        self.end = carry_over;

        if carry_over >= self.buf.len() {
            let new_len = (self.buf.len() * 2).max(carry_over + 1);
            log::trace!("growing buffer to {} bytes", new_len);
            self.buf.resize(new_len, 0);
        }

        // Have the reader start filling in bytes after unconsumed bytes
        loop {
            match reader.read(&mut self.buf[carry_over..]) {
                Ok(r) => {
                    self.end += r;
                    self.eof = r == 0;
                    return Ok(r);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct BufferWindowBuilder {
    buffer_len: usize,
}

impl Default for BufferWindowBuilder {
    fn default() -> Self {
        // Default buffer size of 32 KiB, same size that flate2 uses.
        let buffer_len = 32 * 1024;
        Self { buffer_len }
    }
}

impl BufferWindowBuilder {
    #[inline]
    pub fn buffer_len(mut self, val: usize) -> BufferWindowBuilder {
        self.buffer_len = val;
        self
    }

    #[inline]
    pub fn build(self) -> BufferWindow {
        BufferWindow {
            buf: vec![0; self.buffer_len.max(1)],
            start: 0,
            end: 0,
            prior_reads: 0,
            eof: false,
        }
    }
}
