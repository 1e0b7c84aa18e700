//! ASCII armor.
//!
//! OpenPGP binary data is commonly wrapped in an ASCII-safe encoding
//! framed by `-----BEGIN …-----` / `-----END …-----` lines: a header
//! block, a radix-64 body wrapped at 64 characters, and a CRC-24
//! checksum line.  Clearsigned messages are a special armor mode that
//! carries human-readable text plus a detached signature in one
//! document.
//!
//! [`Reader`] is a [`Filter`] that undoes the armoring on the fly.
//! It detects whether its input is armored at all (bypassing
//! unarmored input unchanged), decodes radix-64 regions, and renders
//! clearsigned text as a synthesized packet stream: one one-pass
//! signature packet per declared hash followed by a literal data
//! packet holding the canonicalized text, so that the downstream
//! packet machinery needs no special case for clearsigned input.
//!
//! [`Writer`] produces armored output; [`detect`] is the cheap
//! peek-one-byte heuristic for deciding whether to insert the
//! [`Reader`] at all.

use std::fmt;
use std::io;

use crate::Error;
use crate::Result;
use crate::filter::{Filter, Produced, Source};
use crate::packet::Tag;
use crate::types::HashAlgorithm;

pub(crate) mod base64;
use base64::Crc24;

mod writer;
pub use writer::Writer;

/// Maximum length of an armor line, excluding the line ending.
pub const MAX_LINE_LEN: usize = 20_000;

/// Specifies the type of data an armored region frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Kind {
    /// A generic OpenPGP message.
    Message,
    /// A transferable public key block.
    PublicKey,
    /// A detached signature.
    Signature,
    /// A clearsigned message.
    SignedMessage,
    /// An armored file.  A GnuPG extension.
    File,
    /// A transferable secret key block.
    PrivateKey,
    /// A transferable secret key block, as written by PGP 2.
    SecretKey,
}

const KIND_VARIANTS: [Kind; 7] = [
    Kind::Message,
    Kind::PublicKey,
    Kind::Signature,
    Kind::SignedMessage,
    Kind::File,
    Kind::PrivateKey,
    Kind::SecretKey,
];

impl Kind {
    fn blurb(&self) -> &'static str {
        match self {
            Kind::Message => "PGP MESSAGE",
            Kind::PublicKey => "PGP PUBLIC KEY BLOCK",
            Kind::Signature => "PGP SIGNATURE",
            Kind::SignedMessage => "PGP SIGNED MESSAGE",
            Kind::File => "PGP ARMORED FILE",
            Kind::PrivateKey => "PGP PRIVATE KEY BLOCK",
            Kind::SecretKey => "PGP SECRET KEY BLOCK",
        }
    }

    /// Returns the BEGIN line framing this kind.
    pub fn begin(&self) -> String {
        format!("-----BEGIN {}-----", self.blurb())
    }

    /// Returns the END line framing this kind.
    pub fn end(&self) -> String {
        format!("-----END {}-----", self.blurb())
    }

    /// Returns whether this kind frames key material.
    pub fn is_keyblock(&self) -> bool {
        matches!(self,
                 Kind::PublicKey | Kind::PrivateKey | Kind::SecretKey)
    }

    fn from_blurb(label: &[u8]) -> Option<Kind> {
        KIND_VARIANTS.iter()
            .find(|k| k.blurb().as_bytes() == label)
            .copied()
    }

    /// Returns an iterator over all variants.
    pub fn variants() -> impl Iterator<Item=Kind> {
        KIND_VARIANTS.iter().cloned()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.blurb())
    }
}

/// Checks whether the first byte of a stream looks armored.
///
/// A byte without the packet marker bit, or one whose tag cannot
/// start an OpenPGP stream, is assumed to begin armored text.
fn is_armored(ctb: u8) -> bool {
    if ctb & 0x80 == 0 {
        // Invalid packet: assume it is armored.
        return true;
    }
    let tag = if ctb & 0x40 != 0 {
        ctb & 0x3f
    } else {
        (ctb >> 2) & 0xf
    };
    !Tag::from(tag).valid_start_of_stream()
}

/// Checks whether the input may be armored, without consuming it.
///
/// Peeks at the first byte.  Returns `false` on an empty stream: with
/// no data it does not matter whether the armor filter runs.
pub fn detect<R: io::BufRead>(reader: &mut R) -> io::Result<bool> {
    let buf = reader.fill_buf()?;
    if buf.is_empty() {
        return Ok(false);
    }
    Ok(is_armored(buf[0]))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_trailing_ws(line: &[u8]) -> &[u8] {
    let end = line.iter()
        .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .map(|p| p + 1)
        .unwrap_or(0);
    &line[..end]
}

/// Extracts the label of a `-----LABEL-----` armor line, or `None`
/// if the line is not one.  Garbage after the closing dashes
/// disqualifies the line.
fn parse_armor_line(line: &[u8]) -> Option<&[u8]> {
    let line = trim_line_ending(line);
    if line.len() < 15 || !line.starts_with(b"-----") {
        return None;
    }
    let rest = &line[5..];
    let close = rest.windows(5).position(|w| w == b"-----")?;
    if !rest[close + 5..].is_empty() {
        return None;
    }
    Some(&rest[..close])
}

fn parse_begin(line: &[u8]) -> Option<Kind> {
    let label = parse_armor_line(line)?;
    Kind::from_blurb(label.strip_prefix(b"BEGIN ")?)
}

fn parse_end(line: &[u8]) -> Option<Kind> {
    let label = parse_armor_line(line)?;
    Kind::from_blurb(label.strip_prefix(b"END ")?)
}

/// Parses a clearsign `Hash:` header into a bitmask over the allowed
/// digest algorithms.  Returns `None` if the line is not a well
/// formed hash header.
fn parse_hash_header(line: &[u8]) -> Option<u8> {
    if line.len() < 6 || line.len() > 60 {
        return None;
    }
    let value = line.strip_prefix(b"Hash:")?;
    let mut found = 0u8;
    for name in value.split(|&b| b == b',') {
        let name = trim_trailing_ws(name);
        let name = &name[name.iter()
                         .position(|&b| b != b' ' && b != b'\t')
                         .unwrap_or(name.len())..];
        if name.is_empty() {
            continue;
        }
        found |= match name {
            b"RIPEMD160" => HASH_RMD160,
            b"SHA1" => HASH_SHA1,
            b"MD5" => HASH_MD5,
            b"TIGER" => HASH_TIGER,
            _ => return None,
        };
    }
    if found == 0 {
        None
    } else {
        Some(found)
    }
}

const HASH_RMD160: u8 = 1;
const HASH_SHA1: u8 = 2;
const HASH_MD5: u8 = 4;
const HASH_TIGER: u8 = 8;

/// States of the armor reader.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Nothing read yet; armored or not is still open.
    Detect,
    /// The input is not armored; pass it through unchanged.
    Bypass,
    /// Scanning for a BEGIN line, skipping garbage.
    FindBegin,
    /// Consuming `Key: Value` lines up to the blank separator.
    ReadHeaders,
    /// Rendering clearsigned text as a faked packet stream.
    ClearsignBody,
    /// Decoding the radix-64 body.
    Radix64Body,
    /// The CRC matched; the END line is still owed.
    Tail,
    /// Orderly end of input.
    Done,
}

/// Classification of an input line for the header scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum InputClass {
    /// Empty, or carriage return only.
    BlankLine,
    /// Starts with five dashes.
    DashLine,
    /// Contains a colon.
    ColonLine,
    /// Anything else.
    TextLine,
    /// End of input.
    Eof,
}

fn classify(line: &[u8]) -> InputClass {
    let line = trim_line_ending(line);
    if line.is_empty() {
        InputClass::BlankLine
    } else if line.starts_with(b"-----") {
        InputClass::DashLine
    } else if line.contains(&b':') {
        InputClass::ColonLine
    } else {
        InputClass::TextLine
    }
}

/// The header-scan transition table.
///
/// Covers the line-oriented phases; the body phases consume input on
/// their own terms.  A `DashLine` in `FindBegin` is assumed to be a
/// recognized BEGIN line; the driver keeps scanning on unknown
/// labels.
fn transition(state: State, class: InputClass, clearsig: bool)
              -> Result<State> {
    use self::{InputClass::*, State::*};
    match (state, class) {
        (FindBegin, DashLine) => Ok(ReadHeaders),
        (FindBegin, Eof) => Ok(Done),
        (FindBegin, _) => Ok(FindBegin),

        (ReadHeaders, ColonLine) => Ok(ReadHeaders),
        (ReadHeaders, BlankLine) if clearsig => Ok(ClearsignBody),
        (ReadHeaders, BlankLine) => Ok(Radix64Body),
        (ReadHeaders, DashLine) | (ReadHeaders, TextLine) =>
            Err(Error::InvalidArmor("invalid armor header".into()).into()),
        (ReadHeaders, Eof) =>
            Err(Error::InvalidArmor(
                "unexpected end of armor headers".into()).into()),

        _ => Err(Error::InvalidOperation(
            format!("no transition from {:?} on {:?}", state, class)).into()),
    }
}

enum LineRead {
    Eof,
    Line(Vec<u8>),
    Overflow(Vec<u8>),
}

/// The armor filter.
///
/// Insert into a [`crate::filter::Pipeline`] below the packet parser.
/// Unarmored input is passed through unchanged; armored input is
/// decoded; clearsigned input is rendered as a faked packet stream
/// (see the module documentation).  Concatenated armored regions
/// decode in sequence.
pub struct Reader {
    state: State,
    kind: Option<Kind>,
    only_keyblocks: bool,

    // Raw bytes pulled from upstream but not yet consumed.
    inbuf: Vec<u8>,
    inlen: usize,
    inpos: usize,

    // Synthesized or replayed bytes owed to the consumer.
    pending: Vec<u8>,
    pending_pos: usize,

    // Clearsign machinery.
    in_cleartext: bool,
    not_dash_escaped: bool,
    hashes: u8,
    empty: usize,

    // Radix-64 decoder registers.
    idx: u8,
    val: u8,
    crc: Crc24,

    any_data: bool,
}

impl Default for Reader {
    fn default() -> Self {
        Reader {
            state: State::Detect,
            kind: None,
            only_keyblocks: false,
            inbuf: vec![0; 8192],
            inlen: 0,
            inpos: 0,
            pending: Vec::new(),
            pending_pos: 0,
            in_cleartext: false,
            not_dash_escaped: false,
            hashes: 0,
            empty: 0,
            idx: 0,
            val: 0,
            crc: Crc24::new(),
            any_data: false,
        }
    }
}

impl Reader {
    /// Creates an armor reader.
    pub fn new() -> Self {
        Default::default()
    }

    /// Restricts the reader to key-block armor; all other BEGIN
    /// labels are skipped during the scan.
    pub fn only_keyblocks(mut self, enabled: bool) -> Self {
        self.only_keyblocks = enabled;
        self
    }

    fn next_byte(&mut self, upstream: &mut dyn Source)
                 -> Result<Option<u8>> {
        if self.inpos >= self.inlen {
            match upstream.pull(&mut self.inbuf)? {
                Produced::Bytes(n) => {
                    self.inlen = n;
                    self.inpos = 0;
                }
                Produced::Eof => return Ok(None),
            }
        }
        let b = self.inbuf[self.inpos];
        self.inpos += 1;
        Ok(Some(b))
    }

    /// Reads one raw line including its terminator.  Stops collecting
    /// once the content exceeds `limit` bytes; the caller decides
    /// whether that is fatal.
    fn read_line(&mut self, upstream: &mut dyn Source, limit: usize)
                 -> Result<LineRead> {
        let mut line = Vec::new();
        loop {
            match self.next_byte(upstream)? {
                None => {
                    return Ok(if line.is_empty() {
                        LineRead::Eof
                    } else {
                        LineRead::Line(line)
                    });
                }
                Some(b'\n') => {
                    line.push(b'\n');
                    return Ok(LineRead::Line(line));
                }
                Some(b) => {
                    line.push(b);
                    if line.len() > limit {
                        return Ok(LineRead::Overflow(line));
                    }
                }
            }
        }
    }

    fn skip_rest_of_line(&mut self, upstream: &mut dyn Source)
                         -> Result<()> {
        while let Some(b) = self.next_byte(upstream)? {
            if b == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn queue(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Queues one length-framed chunk of the faked literal packet.
    fn queue_chunk(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= 0xFFFF);
        self.pending.push((payload.len() >> 8) as u8);
        self.pending.push(payload.len() as u8);
        self.pending.extend_from_slice(payload);
    }

    fn start_bypass(&mut self, replay: Vec<u8>) {
        self.pending = replay;
        self.pending_pos = 0;
        self.state = State::Bypass;
    }

    /// Figures out whether the input is armored at all.
    fn detect_input(&mut self, upstream: &mut dyn Source) -> Result<()> {
        let line = match self.read_line(upstream, MAX_LINE_LEN)? {
            LineRead::Eof => {
                self.state = State::Done;
                return Ok(());
            }
            LineRead::Overflow(line) => {
                // A line this long is not armor; assume a binary
                // stream.
                self.start_bypass(line);
                return Ok(());
            }
            LineRead::Line(line) => line,
        };

        let content = trim_line_ending(&line);
        if content.is_empty() {
            // A leading blank line may still precede armor.
            self.state = State::FindBegin;
            return Ok(());
        }
        if !is_armored(content[0]) {
            self.start_bypass(line);
            return Ok(());
        }
        self.state = State::FindBegin;
        // The first line may itself be the BEGIN line.
        self.scan_line(&line)
    }

    fn find_begin(&mut self, upstream: &mut dyn Source) -> Result<()> {
        match self.read_line(upstream, MAX_LINE_LEN)? {
            LineRead::Eof => {
                self.state = transition(State::FindBegin, InputClass::Eof,
                                        self.in_cleartext)?;
            }
            LineRead::Overflow(_) => {
                // Over-long garbage before the BEGIN line; skip it.
                self.skip_rest_of_line(upstream)?;
            }
            LineRead::Line(line) => self.scan_line(&line)?,
        }
        Ok(())
    }

    fn scan_line(&mut self, line: &[u8]) -> Result<()> {
        let kind = match parse_begin(line) {
            Some(kind) => kind,
            None => return Ok(()),
        };
        if self.only_keyblocks && !kind.is_keyblock() {
            return Ok(());
        }
        if kind == Kind::SignedMessage {
            if self.in_cleartext {
                log::error!("nested clear text signatures");
                return Err(Error::InvalidArmor(
                    "nested clear text signatures".into()).into());
            }
            self.in_cleartext = true;
        }
        log::debug!("armor: {}", kind);
        self.kind = Some(kind);
        self.not_dash_escaped = false;
        self.state = transition(State::FindBegin, classify(line),
                                self.in_cleartext)?;
        Ok(())
    }

    /// Parses one `Key: Value` line.  Returns false on the blank line
    /// that terminates the header block.
    fn parse_header_line(&mut self, line: &[u8]) -> Result<bool> {
        let content = trim_trailing_ws(line);
        if content.is_empty() {
            return Ok(false);
        }

        if !content.contains(&b':') {
            log::error!("invalid armor header: {}",
                        String::from_utf8_lossy(content));
            return Err(Error::InvalidArmor("header without colon".into())
                       .into());
        }
        log::info!("armor header: {}", String::from_utf8_lossy(content));

        if self.in_cleartext {
            if let Some(hashes) = parse_hash_header(content) {
                self.hashes |= hashes;
            } else if content.starts_with(b"NotDashEscaped:") {
                self.not_dash_escaped = true;
            } else {
                log::error!("invalid clearsig header");
                return Err(Error::InvalidArmor(
                    "invalid clearsig header".into()).into());
            }
        }
        Ok(true)
    }

    fn read_headers(&mut self, upstream: &mut dyn Source) -> Result<()> {
        loop {
            let line = match self.read_line(upstream, MAX_LINE_LEN)? {
                LineRead::Eof =>
                    return transition(State::ReadHeaders, InputClass::Eof,
                                      self.in_cleartext).map(|_| ()),
                LineRead::Overflow(_) =>
                    return Err(Error::LineTooLong(MAX_LINE_LEN).into()),
                LineRead::Line(line) => line,
            };
            if !self.parse_header_line(&line)? {
                break;
            }
        }

        self.state = transition(State::ReadHeaders, InputClass::BlankLine,
                                self.in_cleartext)?;
        if self.state == State::ClearsignBody {
            self.queue_faked_prelude();
        } else {
            self.idx = 0;
            self.val = 0;
            self.crc = Crc24::new();
        }
        Ok(())
    }

    /// Queues the synthesized one-pass signature packets and the
    /// literal packet header that announce the clearsigned text.
    fn queue_faked_prelude(&mut self) {
        let mut hashes = self.hashes & 0xf;
        if hashes == 0 {
            // No Hash header: default to MD5 for backwards
            // compatibility.
            hashes = HASH_MD5;
        }

        let enabled: Vec<HashAlgorithm> =
            [(HASH_TIGER, HashAlgorithm::Tiger),
             (HASH_MD5, HashAlgorithm::MD5),
             (HASH_SHA1, HashAlgorithm::SHA1),
             (HASH_RMD160, HashAlgorithm::RipeMD)]
            .iter()
            .filter(|(bit, _)| hashes & bit != 0)
            .map(|(_, algo)| *algo)
            .collect();

        for (i, algo) in enabled.iter().enumerate() {
            let last = i + 1 == enabled.len();
            // Old format, type 4, one length byte.
            self.queue(&[0x90, 13, 3]);
            // Canonical text signature over data the signer key is
            // unknown for: key id and public key algorithm are zero.
            self.queue(&[0x01, u8::from(*algo), 0]);
            self.queue(&[0; 8]);
            self.queue(&[last as u8]);
        }

        // A literal data packet header in partial-length framing; the
        // first chunk holds format 't', a zero name length, and a
        // zero timestamp.
        self.queue(&[0xaf, 0x00, 0x06, b't', 0, 0, 0, 0, 0]);
        self.empty = 0;
    }

    fn flush_empty_lines(&mut self) {
        while self.empty > 0 {
            let n = std::cmp::min(self.empty, 2048);
            self.empty -= n;
            let payload: Vec<u8> = b"\r\n".iter().copied().cycle()
                .take(n * 2).collect();
            self.queue_chunk(&payload);
        }
    }

    /// Renders the next line of clearsigned text as a literal packet
    /// chunk, or finishes the text when the signature block starts.
    fn clearsign_chunk(&mut self, upstream: &mut dyn Source) -> Result<()> {
        let line = match self.read_line(upstream, MAX_LINE_LEN)? {
            LineRead::Eof =>
                return Err(Error::IncompleteLine(
                    "clear text ended without a signature block"
                        .into()).into()),
            LineRead::Overflow(_) =>
                return Err(Error::LineTooLong(MAX_LINE_LEN).into()),
            LineRead::Line(line) => line,
        };

        let mut content = trim_trailing_ws(&line).to_vec();
        if content.is_empty() {
            self.empty += 1;
            return Ok(());
        }

        if content.len() > 2 && content[0] == b'-' {
            if content[1] == b' ' && !self.not_dash_escaped {
                // Dash escaped line.
                if content[2] != b'-' && !content[2..].starts_with(b"From ") {
                    log::info!("invalid dash escaped line: {}",
                               String::from_utf8_lossy(&content));
                }
                content.drain(..2);
            } else if content.len() >= 15 && content[1..4] == *b"---" {
                if parse_begin(&content) != Some(Kind::Signature) {
                    log::info!("unexpected armor: {}",
                               String::from_utf8_lossy(&content));
                }
                return self.end_cleartext(upstream);
            }
        }

        self.flush_empty_lines();
        content.extend_from_slice(b"\r\n");
        self.queue_chunk(&content);
        Ok(())
    }

    /// Closes the faked literal packet and prepares to decode the
    /// trailing signature block.
    fn end_cleartext(&mut self, upstream: &mut dyn Source) -> Result<()> {
        self.flush_empty_lines();
        // Zero-length trailer chunk.
        self.queue_chunk(&[]);

        self.in_cleartext = false;
        self.kind = Some(Kind::Signature);

        // Consume the signature's own armor header block.
        loop {
            let line = match self.read_line(upstream, MAX_LINE_LEN)? {
                LineRead::Eof =>
                    return Err(Error::InvalidArmor(
                        "unexpected end of armor headers".into()).into()),
                LineRead::Overflow(_) =>
                    return Err(Error::LineTooLong(MAX_LINE_LEN).into()),
                LineRead::Line(line) => line,
            };
            if !self.parse_header_line(&line)? {
                break;
            }
        }

        self.idx = 0;
        self.val = 0;
        self.crc = Crc24::new();
        self.state = State::Radix64Body;
        Ok(())
    }

    /// Decodes radix-64 body bytes into `buf`.  Returns the number of
    /// bytes produced; on the `=` terminator the CRC is verified and
    /// the state advances to [`State::Tail`].
    fn radix64_read(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
                    -> Result<usize> {
        let mut n = 0;
        let mut check_crc = false;
        while n < buf.len() {
            let c = match self.next_byte(upstream)? {
                Some(c) => c,
                None =>
                    return Err(Error::InvalidArmor(
                        "premature end of armored data (no CRC)".into())
                               .into()),
            };
            match c {
                b'\n' | b' ' | b'\r' | b'\t' => continue,
                b'=' => {
                    check_crc = true;
                    break;
                }
                c => match base64::value(c) {
                    None => {
                        log::error!(
                            "invalid radix64 character {:02x} skipped", c);
                        continue;
                    }
                    Some(v) => {
                        match self.idx {
                            0 => self.val = v << 2,
                            1 => {
                                buf[n] = self.val | (v >> 4);
                                n += 1;
                                self.val = (v << 4) & 0xf0;
                            }
                            2 => {
                                buf[n] = self.val | (v >> 2);
                                n += 1;
                                self.val = (v << 6) & 0xc0;
                            }
                            3 => {
                                buf[n] = self.val | v;
                                n += 1;
                            }
                            _ => unreachable!("idx is mod 4"),
                        }
                        self.idx = (self.idx + 1) % 4;
                    }
                },
            }
        }
        self.crc.update(&buf[..n]);

        if check_crc {
            self.verify_crc(upstream)?;
            self.any_data = true;
            self.state = State::Tail;
        }
        Ok(n)
    }

    fn verify_crc(&mut self, upstream: &mut dyn Source) -> Result<()> {
        // Skip line feeds and pad characters between the terminator
        // and the CRC quantum.
        let first = loop {
            match self.next_byte(upstream)? {
                None =>
                    return Err(Error::InvalidArmor(
                        "premature end of armored data (no CRC)".into())
                               .into()),
                Some(b'\n') | Some(b' ') | Some(b'\r') | Some(b'\t')
                    | Some(b'=') => continue,
                Some(c) => break c,
            }
        };

        let mut quantum = [first, 0, 0, 0];
        for q in quantum.iter_mut().skip(1) {
            *q = match self.next_byte(upstream)? {
                Some(c) => c,
                None =>
                    return Err(Error::InvalidArmor(
                        "premature end of armored data (in CRC)".into())
                               .into()),
            };
        }

        let mut their = 0u32;
        for &c in &quantum {
            match base64::value(c) {
                Some(v) => their = (their << 6) | v as u32,
                None =>
                    return Err(Error::InvalidArmor("malformed CRC".into())
                               .into()),
            }
        }

        if their != self.crc.value() {
            log::error!("CRC error; {:06x} - {:06x}",
                        self.crc.value(), their);
            return Err(Error::InvalidArmor("checksum mismatch".into())
                       .into());
        }
        Ok(())
    }

    /// Consumes the END line of a completed region and resumes
    /// scanning, so concatenated regions decode in sequence.
    fn read_tail(&mut self, upstream: &mut dyn Source) -> Result<()> {
        loop {
            let line = match self.read_line(upstream, MAX_LINE_LEN)? {
                LineRead::Eof =>
                    return Err(Error::InvalidArmor(
                        "missing armor trailer".into()).into()),
                LineRead::Overflow(_) =>
                    return Err(Error::LineTooLong(MAX_LINE_LEN).into()),
                LineRead::Line(line) => line,
            };
            let content = trim_line_ending(&line);
            if content.is_empty() {
                continue;
            }
            if parse_end(content) == self.kind {
                self.kind = None;
                self.hashes = 0;
                self.not_dash_escaped = false;
                self.state = State::FindBegin;
                return Ok(());
            }
            log::error!("invalid armor trailer: {}",
                        String::from_utf8_lossy(content));
            return Err(Error::InvalidArmor("invalid armor trailer".into())
                       .into());
        }
    }

    fn bypass_pull(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
                   -> Result<Produced> {
        if self.inpos < self.inlen {
            let n = std::cmp::min(buf.len(), self.inlen - self.inpos);
            buf[..n].copy_from_slice(&self.inbuf[self.inpos..self.inpos + n]);
            self.inpos += n;
            return Ok(Produced::Bytes(n));
        }
        upstream.pull(buf)
    }
}

impl Filter for Reader {
    fn name(&self) -> &'static str {
        "armor"
    }

    fn pull(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
            -> Result<Produced> {
        loop {
            if self.pending_pos < self.pending.len() {
                let n = std::cmp::min(buf.len(),
                                      self.pending.len() - self.pending_pos);
                buf[..n].copy_from_slice(
                    &self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                if self.pending_pos == self.pending.len() {
                    self.pending.clear();
                    self.pending_pos = 0;
                }
                return Ok(Produced::Bytes(n));
            }

            match self.state {
                State::Detect => self.detect_input(upstream)?,
                State::Bypass => return self.bypass_pull(upstream, buf),
                State::FindBegin => self.find_begin(upstream)?,
                State::ReadHeaders => self.read_headers(upstream)?,
                State::ClearsignBody => self.clearsign_chunk(upstream)?,
                State::Radix64Body => {
                    let n = self.radix64_read(upstream, buf)?;
                    if n > 0 {
                        return Ok(Produced::Bytes(n));
                    }
                }
                State::Tail => self.read_tail(upstream)?,
                State::Done => return Ok(Produced::Eof),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.any_data && self.state != State::Bypass {
            // Reported, not raised: the driver decides whether an
            // empty result matters.
            log::error!("no valid OpenPGP data found");
        }
        Ok(())
    }
}
