//! End-to-end exercises: armored input through the filter pipeline, a
//! small test packet parser, and the sequencer.

use std::cell::RefCell;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pgstream::{
    Error, Helper, PacketSource, Result, StatusCode,
    armor,
    crypto::{Dek, DigestSet, Mpi},
    filter::{Pipeline, Produced},
    helper::Options,
    packet::{Compressed, Encrypted, Key, OnePassSig, Packet, Plaintext,
             PubkeyEnc, Signature, UserId},
    sequencer,
    types::{HashAlgorithm, SymmetricAlgorithm},
};

// --- a minimal old-format packet parser, driving the pipeline ---

struct MiniParser<'a> {
    pipe: Pipeline<'a>,
}

impl<'a> MiniParser<'a> {
    fn new(pipe: Pipeline<'a>) -> Self {
        MiniParser { pipe }
    }

    fn over(bytes: Vec<u8>) -> MiniParser<'static> {
        MiniParser::new(Pipeline::new(std::io::Cursor::new(bytes)))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.pipe.pull(&mut buf)? {
            Produced::Bytes(_) => Ok(Some(buf[0])),
            Produced::Eof => Ok(None),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.pipe.pull(&mut buf[filled..])? {
                Produced::Bytes(n) => filled += n,
                Produced::Eof =>
                    return Err(Error::MalformedPacket(
                        "unexpected end of stream".into()).into()),
            }
        }
        Ok(())
    }

    fn read_len(&mut self, lentype: u8) -> Result<usize> {
        match lentype {
            0 => {
                let mut b = [0u8; 1];
                self.read_exact(&mut b)?;
                Ok(b[0] as usize)
            }
            1 => {
                let mut b = [0u8; 2];
                self.read_exact(&mut b)?;
                Ok(u16::from_be_bytes(b) as usize)
            }
            _ => Err(Error::MalformedPacket(
                format!("unhandled length type {}", lentype)).into()),
        }
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut body = vec![0u8; len];
        self.read_exact(&mut body)?;
        Ok(body)
    }

    fn read_chunked(&mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let mut lenbuf = [0u8; 2];
            self.read_exact(&mut lenbuf)?;
            let len = u16::from_be_bytes(lenbuf) as usize;
            if len == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&self.read_vec(len)?);
        }
    }
}

fn be64(b: &[u8]) -> u64 {
    u64::from_be_bytes(b.try_into().unwrap())
}

fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes(b.try_into().unwrap())
}

impl<'a> PacketSource for MiniParser<'a> {
    fn parse_packet(&mut self) -> Result<Option<Packet>> {
        let ctb = match self.read_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        if ctb & 0x80 == 0 {
            return Err(Error::MalformedPacket(
                format!("invalid packet marker {:02x}", ctb)).into());
        }
        let tag = (ctb >> 2) & 0x0f;
        let lentype = ctb & 3;

        match tag {
            // Public key encrypted session key.
            1 => {
                let body = {
                    let len = self.read_len(lentype)?;
                    self.read_vec(len)?
                };
                Ok(Some(Packet::PubkeyEnc(PubkeyEnc {
                    version: 3,
                    keyid: be64(&body[..8]),
                    pubkey_algo: body[8].into(),
                    mpis: vec![],
                })))
            }
            // Signature.
            2 => {
                let len = self.read_len(lentype)?;
                let body = self.read_vec(len)?;
                Ok(Some(Packet::Signature(Signature {
                    version: 3,
                    sig_class: body[0].into(),
                    timestamp: be32(&body[1..5]),
                    keyid: be64(&body[5..13]),
                    pubkey_algo: body[13].into(),
                    digest_algo: body[14].into(),
                    digest_start: [0; 2],
                    mpis: vec![],
                })))
            }
            // One-pass signature.
            4 => {
                let len = self.read_len(lentype)?;
                let body = self.read_vec(len)?;
                assert_eq!(body[0], 3, "one-pass version");
                Ok(Some(Packet::OnePassSig(OnePassSig {
                    sig_class: body[1].into(),
                    digest_algo: body[2].into(),
                    pubkey_algo: body[3].into(),
                    keyid: be64(&body[4..12]),
                    last: body[12] != 0,
                })))
            }
            // Public key.
            6 => {
                let len = self.read_len(lentype)?;
                let body = self.read_vec(len)?;
                let bits = u16::from_be_bytes([body[13], body[14]]) as usize;
                let mpi = body[15..15 + (bits + 7) / 8].to_vec();
                Ok(Some(Packet::PublicKey(Key {
                    timestamp: be32(&body[..4]),
                    valid_days: 0,
                    algo: body[4].into(),
                    keyid: be64(&body[5..13]),
                    mpis: vec![Mpi::new(mpi)],
                })))
            }
            // Compressed data.
            8 => {
                let len = self.read_len(lentype)?;
                let body = self.read_vec(len)?;
                Ok(Some(Packet::Compressed(Compressed {
                    algo: body[0].into(),
                    body: body[1..].to_vec(),
                })))
            }
            // Symmetrically encrypted data.
            9 => {
                let len = self.read_len(lentype)?;
                Ok(Some(Packet::Encrypted(Encrypted {
                    body: self.read_vec(len)?,
                })))
            }
            // Literal data.
            11 => {
                let body = if lentype == 3 {
                    self.read_chunked()?
                } else {
                    let len = self.read_len(lentype)?;
                    self.read_vec(len)?
                };
                let namelen = body[1] as usize;
                Ok(Some(Packet::Plaintext(Plaintext {
                    format: body[0].into(),
                    name: body[2..2 + namelen].to_vec(),
                    timestamp: be32(&body[2 + namelen..6 + namelen]),
                    body: body[6 + namelen..].to_vec(),
                })))
            }
            // User id.
            13 => {
                let len = self.read_len(lentype)?;
                Ok(Some(Packet::UserId(UserId {
                    value: self.read_vec(len)?,
                })))
            }
            t => Err(Error::MalformedPacket(
                format!("unhandled tag {}", t)).into()),
        }
    }
}

// --- serializers for the test wire format ---

fn wire_public_key(keyid: u64, ts: u32) -> Vec<u8> {
    let mpi = vec![0x80; 128];
    let mut body = Vec::new();
    body.extend_from_slice(&ts.to_be_bytes());
    body.push(17); // DSA
    body.extend_from_slice(&keyid.to_be_bytes());
    body.extend_from_slice(&((mpi.len() * 8) as u16).to_be_bytes());
    body.extend_from_slice(&mpi);
    let mut out = vec![0x99];
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

fn wire_user_id(name: &str) -> Vec<u8> {
    let mut out = vec![0xb4, name.len() as u8];
    out.extend_from_slice(name.as_bytes());
    out
}

fn wire_signature(class: u8, keyid: u64, digest: HashAlgorithm) -> Vec<u8> {
    let mut body = vec![class];
    body.extend_from_slice(&2000u32.to_be_bytes());
    body.extend_from_slice(&keyid.to_be_bytes());
    body.push(17); // DSA
    body.push(digest.into());
    let mut out = vec![0x88, body.len() as u8];
    out.extend_from_slice(&body);
    out
}

fn wire_one_pass(class: u8, keyid: u64, digest: HashAlgorithm, last: bool)
                 -> Vec<u8> {
    let mut out = vec![0x90, 13, 3, class, digest.into(), 17];
    out.extend_from_slice(&keyid.to_be_bytes());
    out.push(last as u8);
    out
}

fn wire_literal(body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xac, (6 + body.len()) as u8, b'b', 0];
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(body);
    out
}

fn wire_pubkey_enc(keyid: u64) -> Vec<u8> {
    let mut out = vec![0x84, 9];
    out.extend_from_slice(&keyid.to_be_bytes());
    out.push(16); // ElGamal encrypt-only
    out
}

fn wire_encrypted(inner: &[u8]) -> Vec<u8> {
    let mut out = vec![0xa4, inner.len() as u8];
    out.extend_from_slice(inner);
    out
}

fn wire_compressed(inner: &[u8]) -> Vec<u8> {
    let mut out = vec![0xa0, (1 + inner.len()) as u8, 1]; // ZIP
    out.extend_from_slice(inner);
    out
}

// --- a recording helper ---

#[derive(Default)]
struct Record {
    statuses: Vec<StatusCode>,
    display: Vec<String>,
    key_checks: usize,
    plaintext: Vec<(Vec<u8>, bool)>, // body, clearsig
    expect_digest_of: Option<Vec<u8>>,
}

struct TestHelper {
    record: Rc<RefCell<Record>>,
}

fn fixture() -> (Rc<RefCell<Record>>, TestHelper) {
    let record = Rc::new(RefCell::new(Record::default()));
    let helper = TestHelper { record: record.clone() };
    (record, helper)
}

fn digest_of(algo: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut ctx = algo.context().unwrap();
    ctx.update(data);
    ctx.into_digest().unwrap()
}

impl Helper for TestHelper {
    fn get_session_key(&mut self, _enc: &PubkeyEnc) -> Result<Dek> {
        Ok(Dek::new(SymmetricAlgorithm::CAST5, vec![7; 16]))
    }

    fn decrypt_data(&mut self, enc: &Encrypted, _dek: &Dek)
                    -> Result<Box<dyn PacketSource>> {
        // The test cipher is the identity.
        Ok(Box::new(MiniParser::over(enc.body.clone())))
    }

    fn handle_compressed(&mut self, zd: &Compressed)
                         -> Result<Box<dyn PacketSource>> {
        // So is the test compressor.
        Ok(Box::new(MiniParser::over(zd.body.clone())))
    }

    fn handle_plaintext(&mut self, pt: &Plaintext, md: &mut DigestSet,
                        _sigs_only: bool, clearsig: bool) -> Result<()> {
        self.record.borrow_mut().plaintext
            .push((pt.body.clone(), clearsig));
        md.update(&pt.body);
        Ok(())
    }

    fn signature_check(&mut self, sig: &Signature, md: DigestSet)
                       -> Result<()> {
        let ctx = md.copy_context(sig.digest_algo)
            .ok_or(Error::UnsupportedHashAlgorithm(sig.digest_algo))?;
        let digest = ctx.into_digest()?;
        let record = self.record.borrow();
        match &record.expect_digest_of {
            Some(expect) if &digest == expect => Ok(()),
            Some(_) => Err(Error::BadSignature("digest mismatch".into())
                           .into()),
            None => Ok(()),
        }
    }

    fn check_key_signature(&mut self, _keyblock: &pgstream::Keyblock,
                           _sig_index: usize) -> Result<bool> {
        self.record.borrow_mut().key_checks += 1;
        Ok(true)
    }

    fn hash_datafiles(&mut self, _md: &mut DigestSet, _names: &[PathBuf],
                      _sig: Option<&Path>, _textmode: bool) -> Result<()> {
        Ok(())
    }

    fn ask_for_detached_datafile(&mut self, _md: &mut DigestSet,
                                 _filename: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn write_status(&mut self, status: StatusCode) {
        self.record.borrow_mut().statuses.push(status);
    }

    fn display(&mut self, line: &str) {
        self.record.borrow_mut().display.push(line.into());
    }
}

fn armored(kind: armor::Kind, data: &[u8]) -> Vec<u8> {
    let mut w = armor::Writer::new(Vec::new(), kind).unwrap();
    w.write_all(data).unwrap();
    w.finalize().unwrap()
}

fn parser_for(input: Vec<u8>) -> MiniParser<'static> {
    let mut pipe = Pipeline::new(std::io::Cursor::new(input));
    pipe.push(armor::Reader::new()).unwrap();
    MiniParser::new(pipe)
}

#[test]
fn armored_key_block_round_trips_and_lists() {
    let mut packets = Vec::new();
    packets.extend_from_slice(&wire_public_key(0x1122334455667788, 1000));
    packets.extend_from_slice(&wire_user_id("alice <alice@example.org>"));
    packets.extend_from_slice(
        &wire_signature(0x13, 0x1122334455667788, HashAlgorithm::SHA1));
    let input = armored(armor::Kind::PublicKey, &packets);

    // The armor layer must reproduce the packet bytes exactly.
    let mut pipe = Pipeline::new(std::io::Cursor::new(input.clone()));
    pipe.push(armor::Reader::new()).unwrap();
    let mut decoded = Vec::new();
    std::io::Read::read_to_end(&mut pipe, &mut decoded).unwrap();
    assert_eq!(decoded, packets);

    // And the sequencer builds one tree rooted in the key.
    let (record, mut helper) = fixture();
    let opt = Options { list_sigs: true, check_sigs: true,
                        ..Default::default() };
    let mut source = parser_for(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();

    let record = record.borrow();
    assert!(record.display.iter().any(|l| l.starts_with("pub")),
            "{:?}", record.display);
    assert!(record.display.iter().any(|l| l.contains("alice")),
            "{:?}", record.display);
    assert!(record.display.iter().any(|l| l.starts_with("sig!")),
            "{:?}", record.display);
    assert_eq!(record.key_checks, 1);
}

#[test]
fn clearsigned_message_verifies() {
    let mut input = Vec::new();
    input.extend_from_slice(
        b"-----BEGIN PGP SIGNED MESSAGE-----\n\
          Hash: SHA1\n\
          \n\
          hello\n");
    input.extend_from_slice(&armored(
        armor::Kind::Signature,
        &wire_signature(0x01, 0, HashAlgorithm::SHA1)));

    let (record, mut helper) = fixture();
    record.borrow_mut().expect_digest_of =
        Some(digest_of(HashAlgorithm::SHA1, b"hello\r\n"));

    let opt = Options::default();
    let mut source = parser_for(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();

    let record = record.borrow();
    assert_eq!(record.statuses, vec![StatusCode::GoodSig]);
    assert_eq!(record.plaintext.len(), 1);
    let (body, clearsig) = &record.plaintext[0];
    assert_eq!(body, b"hello\r\n");
    assert!(clearsig);
}

#[test]
fn clearsigned_bad_digest_is_a_bad_signature() {
    let mut input = Vec::new();
    input.extend_from_slice(
        b"-----BEGIN PGP SIGNED MESSAGE-----\n\
          Hash: SHA1\n\
          \n\
          goodbye\n");
    input.extend_from_slice(&armored(
        armor::Kind::Signature,
        &wire_signature(0x01, 0, HashAlgorithm::SHA1)));

    let (record, mut helper) = fixture();
    record.borrow_mut().expect_digest_of =
        Some(digest_of(HashAlgorithm::SHA1, b"hello\r\n"));

    let opt = Options::default();
    let mut source = parser_for(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();
    assert_eq!(record.borrow().statuses, vec![StatusCode::BadSig]);
}

#[test]
fn corrupt_crc_reports_badarmor() {
    let armored = armored(armor::Kind::Message, &wire_literal(b"data"));
    let text = String::from_utf8(armored).unwrap();
    let mut lines: Vec<String> = text.lines().map(Into::into).collect();
    let crc_line = lines.len() - 2;
    assert!(lines[crc_line].starts_with('='));
    let flip = if lines[crc_line].ends_with('A') { "B" } else { "A" };
    let new_len = lines[crc_line].len() - 1;
    lines[crc_line].truncate(new_len);
    lines[crc_line].push_str(flip);
    let input = (lines.join("\n") + "\n").into_bytes();

    let (record, mut helper) = fixture();
    let opt = Options::default();
    let mut source = parser_for(input);
    let err = sequencer::process_packets(&mut helper, &opt, &mut source)
        .unwrap_err();
    assert!(err.chain().any(|c| matches!(
        c.downcast_ref::<Error>(), Some(Error::InvalidArmor(_)))),
            "{}", err);
    assert_eq!(record.borrow().statuses, vec![StatusCode::BadArmor]);
}

#[test]
fn encrypted_compressed_signed_message() {
    // A one-pass signed literal, compressed, encrypted, and preceded
    // by a session key packet.  The test cipher and compressor are
    // both the identity, so the nesting alone is under test.
    let mut signed = Vec::new();
    signed.extend_from_slice(
        &wire_one_pass(0x00, 9, HashAlgorithm::RipeMD, true));
    signed.extend_from_slice(&wire_literal(b"deep payload"));
    signed.extend_from_slice(
        &wire_signature(0x00, 9, HashAlgorithm::RipeMD));

    let compressed = wire_compressed(&signed);
    let mut input = wire_pubkey_enc(0xCAFE);
    input.extend_from_slice(&wire_encrypted(&compressed));

    let (record, mut helper) = fixture();
    record.borrow_mut().expect_digest_of =
        Some(digest_of(HashAlgorithm::RipeMD, b"deep payload"));

    let opt = Options::default();
    let mut source = MiniParser::over(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();

    let record = record.borrow();
    assert_eq!(record.statuses, vec![StatusCode::GoodSig]);
    assert_eq!(record.plaintext.len(), 1);
    assert_eq!(record.plaintext[0].0, b"deep payload");
}

#[test]
fn multiple_hash_clearsign_enables_every_digest() {
    let mut input = Vec::new();
    input.extend_from_slice(
        b"-----BEGIN PGP SIGNED MESSAGE-----\n\
          Hash: SHA1,RIPEMD160\n\
          \n\
          two hashes\n");
    // Two signatures, one per declared hash.
    let mut sigs = Vec::new();
    sigs.extend_from_slice(
        &wire_signature(0x01, 0, HashAlgorithm::SHA1));
    sigs.extend_from_slice(
        &wire_signature(0x01, 0, HashAlgorithm::RipeMD));
    input.extend_from_slice(&armored(armor::Kind::Signature, &sigs));

    struct MultiHelper {
        checked: Rc<RefCell<Vec<(HashAlgorithm, Vec<u8>)>>>,
    }
    impl Helper for MultiHelper {
        fn handle_plaintext(&mut self, pt: &Plaintext, md: &mut DigestSet,
                            _s: bool, _c: bool) -> Result<()> {
            md.update(&pt.body);
            Ok(())
        }
        fn signature_check(&mut self, sig: &Signature, md: DigestSet)
                           -> Result<()> {
            let ctx = md.copy_context(sig.digest_algo)
                .ok_or(Error::UnsupportedHashAlgorithm(sig.digest_algo))?;
            self.checked.borrow_mut()
                .push((sig.digest_algo, ctx.into_digest()?));
            Ok(())
        }
    }

    let checked = Rc::new(RefCell::new(Vec::new()));
    let mut helper = MultiHelper { checked: checked.clone() };
    let opt = Options::default();
    let mut source = parser_for(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();

    let checked = checked.borrow();
    assert_eq!(checked.len(), 2);
    for (algo, digest) in checked.iter() {
        assert_eq!(digest, &digest_of(*algo, b"two hashes\r\n"),
                   "{}", algo);
    }
}

#[test]
fn literal_without_one_pass_enables_default_digests() {
    // An old-style PGP message: the signature precedes the data, so
    // the literal is hashed with the standard algorithms.
    let mut input = Vec::new();
    input.extend_from_slice(
        &wire_signature(0x00, 5, HashAlgorithm::MD5));
    input.extend_from_slice(&wire_literal(b"pgp style"));

    let (record, mut helper) = fixture();
    record.borrow_mut().expect_digest_of =
        Some(digest_of(HashAlgorithm::MD5, b"pgp style"));

    let opt = Options::default();
    let mut source = MiniParser::over(input);
    sequencer::process_packets(&mut helper, &opt, &mut source).unwrap();
    assert_eq!(record.borrow().statuses, vec![StatusCode::GoodSig]);
}
