//! Armor encoder.
//!
//! Produces the minimum armored shape: BEGIN line, headers, blank
//! line, radix-64 body wrapped at 64 characters, the `=XXXX` checksum
//! line, and the END line.  Line endings are LF.

use std::io;

use super::Kind;
use super::base64::{ALPHABET, Crc24};

// Number of 4-character groups per body line: pgp dislikes 72 here,
// so wrap at 64 characters.
const QUADS_PER_LINE: usize = 64 / 4;

/// Encodes bytes into an armored document.
///
/// Data written to the `Writer` is encoded on the fly;
/// [`Writer::finalize`] emits the padding, the checksum line, and the
/// END line, and returns the inner writer.
///
/// # Examples
///
/// ```rust
/// use pgstream::armor::{Kind, Writer};
///
/// # fn main() -> std::io::Result<()> {
/// let mut w = Writer::new(Vec::new(), Kind::Message)?;
/// std::io::Write::write_all(&mut w, b"\xc0\xffee")?;
/// let armored = w.finalize()?;
/// assert!(armored.starts_with(b"-----BEGIN PGP MESSAGE-----\n"));
/// # Ok(()) }
/// ```
pub struct Writer<W: io::Write> {
    inner: Option<W>,
    kind: Kind,
    headers: Vec<(String, String)>,
    started: bool,
    crc: Crc24,
    stash: [u8; 3],
    stash_len: usize,
    quads: usize,
}

impl<W: io::Write> Writer<W> {
    /// Creates a writer framing `kind`.
    pub fn new(inner: W, kind: Kind) -> io::Result<Self> {
        Ok(Writer {
            inner: Some(inner),
            kind,
            headers: vec![
                ("Version".into(),
                 format!("pgstream v{}", crate::VERSION)),
            ],
            started: false,
            crc: Crc24::new(),
            stash: [0; 3],
            stash_len: 0,
            quads: 0,
        })
    }

    /// Adds a `Key: Value` armor header.
    ///
    /// Headers must be added before the first write.
    pub fn add_header(&mut self, key: &str, value: &str) {
        debug_assert!(!self.started);
        self.headers.push((key.into(), value.into()));
    }

    fn inner(&mut self) -> &mut W {
        self.inner.as_mut().expect("inner taken only by finalize")
    }

    fn write_preamble(&mut self) -> io::Result<()> {
        let begin = self.kind.begin();
        let headers = std::mem::take(&mut self.headers);
        let sink = self.inner();
        writeln!(sink, "{}", begin)?;
        for (key, value) in &headers {
            writeln!(sink, "{}: {}", key, value)?;
        }
        writeln!(sink)?;
        Ok(())
    }

    fn write_quad(&mut self, quad: [u8; 4]) -> io::Result<()> {
        self.inner().write_all(&quad)?;
        self.quads += 1;
        if self.quads >= QUADS_PER_LINE {
            self.quads = 0;
            self.inner().write_all(b"\n")?;
        }
        Ok(())
    }

    fn encode_group(&mut self, group: [u8; 3]) -> io::Result<()> {
        self.write_quad([
            ALPHABET[(group[0] >> 2) as usize],
            ALPHABET[(((group[0] << 4) | (group[1] >> 4)) & 0x3f) as usize],
            ALPHABET[(((group[1] << 2) | (group[2] >> 6)) & 0x3f) as usize],
            ALPHABET[(group[2] & 0x3f) as usize],
        ])
    }

    /// Writes the padding, the checksum line, and the END line, and
    /// returns the inner writer.
    pub fn finalize(mut self) -> io::Result<W> {
        if !self.started {
            self.started = true;
            self.write_preamble()?;
        }

        match self.stash_len {
            0 => (),
            1 => {
                let b = self.stash[0];
                self.write_quad([
                    ALPHABET[(b >> 2) as usize],
                    ALPHABET[((b << 4) & 0x3f) as usize],
                    b'=',
                    b'=',
                ])?;
            }
            2 => {
                let (b0, b1) = (self.stash[0], self.stash[1]);
                self.write_quad([
                    ALPHABET[(b0 >> 2) as usize],
                    ALPHABET[(((b0 << 4) | (b1 >> 4)) & 0x3f) as usize],
                    ALPHABET[((b1 << 2) & 0x3f) as usize],
                    b'=',
                ])?;
            }
            _ => unreachable!("stash holds at most two bytes"),
        }
        self.stash_len = 0;

        if self.quads > 0 {
            self.quads = 0;
            self.inner().write_all(b"\n")?;
        }

        let crc = self.crc.value();
        let crc_bytes = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
        let end = self.kind.end();
        let sink = self.inner();
        sink.write_all(b"=")?;
        sink.write_all(&[
            ALPHABET[(crc_bytes[0] >> 2) as usize],
            ALPHABET[(((crc_bytes[0] << 4) | (crc_bytes[1] >> 4)) & 0x3f)
                     as usize],
            ALPHABET[(((crc_bytes[1] << 2) | (crc_bytes[2] >> 6)) & 0x3f)
                     as usize],
            ALPHABET[(crc_bytes[2] & 0x3f) as usize],
        ])?;
        sink.write_all(b"\n")?;
        writeln!(sink, "{}", end)?;
        sink.flush()?;

        Ok(self.inner.take().expect("inner taken only by finalize"))
    }
}

impl<W: io::Write> io::Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.started {
            self.started = true;
            self.write_preamble()?;
        }

        self.crc.update(buf);

        let mut input = buf;
        while !input.is_empty() {
            let want = 3 - self.stash_len;
            let take = std::cmp::min(want, input.len());
            self.stash[self.stash_len..self.stash_len + take]
                .copy_from_slice(&input[..take]);
            self.stash_len += take;
            input = &input[take..];

            if self.stash_len == 3 {
                let group = self.stash;
                self.stash_len = 0;
                self.encode_group(group)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            log::debug!("armor writer dropped without finalize; \
                         output is truncated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn armor(kind: Kind, data: &[u8]) -> String {
        let mut w = Writer::new(Vec::new(), kind).unwrap();
        w.write_all(data).unwrap();
        String::from_utf8(w.finalize().unwrap()).unwrap()
    }

    #[test]
    fn shape() {
        let out = armor(Kind::Message, b"hello");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "-----BEGIN PGP MESSAGE-----");
        assert!(lines[1].starts_with("Version: "));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "aGVsbG8=");
        assert!(lines[4].starts_with('='));
        assert_eq!(lines[4].len(), 5);
        assert_eq!(lines[5], "-----END PGP MESSAGE-----");
    }

    #[test]
    fn known_encodings() {
        // RFC 4648 test vectors.
        for (input, expect) in [(&b"f"[..], "Zg=="),
                                (b"fo", "Zm8="),
                                (b"foo", "Zm9v"),
                                (b"foob", "Zm9vYg=="),
                                (b"fooba", "Zm9vYmE="),
                                (b"foobar", "Zm9vYmFy")] {
            let out = armor(Kind::File, input);
            let body: Vec<&str> = out.lines()
                .skip_while(|l| !l.is_empty())
                .skip(1)
                .take_while(|l| !l.starts_with('='))
                .collect();
            assert_eq!(body.concat(), expect, "{:?}", input);
        }
    }

    #[test]
    fn body_wraps_at_64_characters() {
        let data = vec![0xAB; 100];
        let out = armor(Kind::PublicKey, &data);
        for line in out.lines()
            .skip_while(|l| !l.is_empty()).skip(1)
            .take_while(|l| !l.starts_with('='))
        {
            assert!(line.len() <= 64, "{:?}", line);
        }
    }

    #[test]
    fn empty_payload_still_frames() {
        let out = armor(Kind::Signature, b"");
        assert!(out.contains("-----BEGIN PGP SIGNATURE-----"));
        assert!(out.contains("-----END PGP SIGNATURE-----"));
        // CRC of the empty stream.
        assert!(out.contains("\n=twTO\n"),
                "{:?}", out);
    }
}
