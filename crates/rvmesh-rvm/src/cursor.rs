//! Buffered big-endian byte cursor with a running content digest.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::error::RvmError;

const BUFFER_SIZE: usize = 64 * 1024;

/// Forward-only cursor over an RVM byte stream.
///
/// All multi-byte values in the format are big-endian. Every byte handed out
/// is also fed to a SHA-256 digest; the traversal resets the digest at the
/// start of each exported root and reads it back when the root closes, which
/// gives a stable per-root content fingerprint.
pub struct ByteCursor<R: Read> {
    inner: R,
    buf: Vec<u8>,
    fill: usize,
    pos: usize,
    consumed: u64,
    len: u64,
    digest: Sha256,
}

impl<R: Read> ByteCursor<R> {
    /// Wraps a reader whose total length is `len` bytes.
    pub fn new(inner: R, len: u64) -> Self {
        ByteCursor {
            inner,
            buf: vec![0; BUFFER_SIZE],
            fill: 0,
            pos: 0,
            consumed: 0,
            len,
            digest: Sha256::new(),
        }
    }

    /// Absolute byte offset of the next unread byte. Chunk headers declare
    /// record ends as values of this offset.
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Bytes left before end of input.
    pub fn remaining(&self) -> u64 {
        self.len - self.consumed
    }

    fn refill(&mut self) -> Result<(), RvmError> {
        self.fill = self.inner.read(&mut self.buf)?;
        self.pos = 0;
        Ok(())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, RvmError> {
        if self.pos == self.fill {
            self.refill()?;
            if self.fill == 0 {
                return Err(RvmError::TruncatedInput { at: self.consumed });
            }
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        self.consumed += 1;
        self.digest.update(std::slice::from_ref(&b));
        Ok(b)
    }

    /// Reads a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, RvmError> {
        let mut v = 0u32;
        for _ in 0..4 {
            v = (v << 8) | self.read_u8()? as u32;
        }
        Ok(v)
    }

    /// Reads a big-endian f32.
    pub fn read_f32(&mut self) -> Result<f32, RvmError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads a length-prefixed string.
    ///
    /// The prefix is a word count; the payload is four times that many
    /// bytes, NUL-terminated with padding that must still be consumed.
    pub fn read_string(&mut self) -> Result<String, RvmError> {
        let words = self.read_u32()?;
        let len = 4 * words as usize;
        let mut bytes = Vec::new();
        let mut taken = 0;
        while taken < len {
            let b = self.read_u8()?;
            taken += 1;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        while taken < len {
            self.read_u8()?;
            taken += 1;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Discards `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<(), RvmError> {
        for _ in 0..n {
            self.read_u8()?;
        }
        Ok(())
    }

    /// Restarts the content digest; bytes consumed so far no longer count.
    pub fn digest_reset(&mut self) {
        self.digest = Sha256::new();
    }

    /// Hex digest over the bytes consumed since the last reset.
    pub fn digest_hex(&self) -> String {
        let out = self.digest.clone().finalize();
        let mut s = String::with_capacity(2 * out.len());
        for b in out {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cursor(bytes: &[u8]) -> ByteCursor<Cursor<Vec<u8>>> {
        ByteCursor::new(Cursor::new(bytes.to_vec()), bytes.len() as u64)
    }

    #[test]
    fn reads_big_endian() {
        let mut c = cursor(&[0x00, 0x00, 0x00, 0x2a, 0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(c.read_u32().unwrap(), 42);
        assert_eq!(c.read_f32().unwrap(), 1.0);
        assert_eq!(c.position(), 8);
    }

    #[test]
    fn truncation_reports_offset() {
        let mut c = cursor(&[0x00, 0x01]);
        match c.read_u32() {
            Err(RvmError::TruncatedInput { at }) => assert_eq!(at, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn string_consumes_padding() {
        // Two words, "abc" NUL-terminated, then padding that belongs to the
        // string and one trailing marker byte.
        let mut c = cursor(&[0, 0, 0, 2, b'a', b'b', b'c', 0, 0xaa, 0xbb, 0xcc, 0xdd, 0x7f]);
        assert_eq!(c.read_string().unwrap(), "abc");
        assert_eq!(c.position(), 12);
        assert_eq!(c.read_u8().unwrap(), 0x7f);
    }

    #[test]
    fn string_without_terminator_uses_full_length() {
        let mut c = cursor(&[0, 0, 0, 1, b'f', b'u', b'l', b'l']);
        assert_eq!(c.read_string().unwrap(), "full");
    }

    #[test]
    fn digest_reset_scopes_the_hash() {
        let mut a = cursor(&[1, 2, 3, 4, 5, 6, 7, 8]);
        a.skip(4).unwrap();
        a.digest_reset();
        a.skip(4).unwrap();
        let mut b = cursor(&[5, 6, 7, 8]);
        b.skip(4).unwrap();
        assert_eq!(a.digest_hex(), b.digest_hex());
    }
}
