//! The packet sequencer.
//!
//! Consumes decoded packets one at a time, assembles key material,
//! user ids, and signatures into [`Keyblock`] trees, and routes
//! session key, encrypted, literal, and compressed packets to the
//! caller's [`Helper`].  Completed trees are handed to the tree
//! processor, which drives verification.
//!
//! Three entry points select what the stream may contain:
//! [`process_packets`] accepts anything,
//! [`process_signature_packets`] only signature material, and
//! [`process_encryption_packets`] only decryption material.  A packet
//! that is forbidden in the current mode aborts with
//! [`Error::UnexpectedPacket`].
//!
//! Recoverable failures — a missing secret key, an unknown algorithm,
//! a signature that does not verify — are logged or reported through
//! the status channel and processing continues.  Only malformed
//! packets and forbidden packet types end the run.

use std::path::{Path, PathBuf};

use crate::Error;
use crate::Result;
use crate::crypto::{Dek, DigestSet};
use crate::helper::{Helper, Options, PacketSource};
use crate::keyblock::Keyblock;
use crate::packet::{Compressed, Encrypted, Packet, Plaintext, PubkeyEnc,
                    SymkeyEnc, Tag};
use crate::types::{HashAlgorithm, SignatureType};

/// What the packet stream is allowed to contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Full,
    SigsOnly,
    EncryptOnly,
}

/// Where the pending session key came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionKeyOrigin {
    Pubkey,
    Symkey,
}

pub(crate) struct Sequencer<'a> {
    pub(crate) helper: &'a mut dyn Helper,
    pub(crate) opt: &'a Options,
    pub(crate) mode: Mode,
    pub(crate) signed_data: &'a [PathBuf],
    pub(crate) sig_filename: Option<&'a Path>,
    pub(crate) filename: Option<String>,

    /// The live data digests, or empty when no data was hashed.
    pub(crate) mfx: DigestSet,
    /// Whether a literal data packet has been seen in-band.
    pub(crate) have_data: bool,

    list: Option<Keyblock>,
    dek: Option<Dek>,
    last_was_session_key: Option<SessionKeyOrigin>,
}

/// Processes an arbitrary packet stream.
///
/// Any root type is allowed: key blocks are listed (and optionally
/// checked), signed data is verified, encrypted data is decrypted and
/// recursed into.
pub fn process_packets(helper: &mut dyn Helper, opt: &Options,
                       source: &mut dyn PacketSource) -> Result<()> {
    Sequencer::new(helper, opt, Mode::Full).process(source)
}

/// Processes a stream that must contain only signature material.
///
/// `signed_data` names the detached data files; `sig_filename` is the
/// name of the signature file itself, used in diagnostics by the
/// hashing hook.
pub fn process_signature_packets(helper: &mut dyn Helper, opt: &Options,
                                 source: &mut dyn PacketSource,
                                 signed_data: &[PathBuf],
                                 sig_filename: Option<&Path>) -> Result<()> {
    let mut seq = Sequencer::new(helper, opt, Mode::SigsOnly);
    seq.signed_data = signed_data;
    seq.sig_filename = sig_filename;
    seq.process(source)
}

/// Processes a stream that must contain only decryption material.
pub fn process_encryption_packets(helper: &mut dyn Helper, opt: &Options,
                                  source: &mut dyn PacketSource)
                                  -> Result<()> {
    Sequencer::new(helper, opt, Mode::EncryptOnly).process(source)
}

/// Returns whether the error chain contains an armor-level failure.
///
/// The armor filter sits below the packet parser, so its errors
/// usually arrive wrapped in the parser's I/O error.
fn armor_failure(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(cause.downcast_ref::<Error>(),
                 Some(Error::InvalidArmor(_)
                      | Error::LineTooLong(_)
                      | Error::IncompleteLine(_)))
    })
}

impl<'a> Sequencer<'a> {
    fn new(helper: &'a mut dyn Helper, opt: &'a Options, mode: Mode)
           -> Self {
        Sequencer {
            helper,
            opt,
            mode,
            signed_data: &[],
            sig_filename: None,
            filename: None,
            mfx: DigestSet::new(),
            have_data: false,
            list: None,
            dek: None,
            last_was_session_key: None,
        }
    }

    fn process(&mut self, source: &mut dyn PacketSource) -> Result<()> {
        self.filename = source.filename().map(Into::into);
        let result = self.process_loop(source);
        // The open tree is flushed on every exit path, and a held
        // session key never outlives the run.
        let flushed = self.release_list();
        self.dek = None;
        result.and(flushed)
    }

    fn process_loop(&mut self, source: &mut dyn PacketSource) -> Result<()> {
        loop {
            let pkt = match source.parse_packet() {
                Ok(Some(pkt)) => pkt,
                Ok(None) => return Ok(()),
                Err(e) => {
                    if armor_failure(&e) {
                        self.helper.write_status(
                            crate::StatusCode::BadArmor);
                        return Err(e);
                    }
                    if matches!(e.downcast_ref::<Error>(),
                                Some(Error::MalformedPacket(_))) {
                        // Framing is gone; the stream is abandoned.
                        return Err(e);
                    }
                    log::error!("packet parse failed: {}", e);
                    continue;
                }
            };

            let tag = pkt.tag();

            // A held session key is stale unless the very next packet
            // is the encrypted data; burn it.
            if self.dek.is_some() && tag != Tag::Encrypted {
                self.dek = None;
            }

            match self.mode {
                Mode::Full => self.dispatch_full(pkt)?,
                Mode::SigsOnly => self.dispatch_sigs_only(pkt)?,
                Mode::EncryptOnly => self.dispatch_encrypt_only(pkt)?,
            }

            if tag != Tag::Signature {
                self.have_data = tag == Tag::Plaintext;
            }
        }
    }

    fn dispatch_full(&mut self, pkt: Packet) -> Result<()> {
        match pkt {
            p @ Packet::PublicKey(_) | p @ Packet::SecretKey(_) => {
                self.release_list()?;
                self.list = Some(Keyblock::new(p));
                Ok(())
            }
            p @ Packet::PublicSubkey(_) | p @ Packet::SecretSubkey(_) =>
                self.add_subkey(p),
            p @ Packet::UserId(_) => self.add_user_id(p),
            p @ Packet::Signature(_) => self.add_signature(p),
            p @ Packet::OnePassSig(_) => self.add_onepass_sig(p),
            Packet::PubkeyEnc(enc) => self.proc_pubkey_enc(enc),
            Packet::SymkeyEnc(enc) => self.proc_symkey_enc(enc),
            Packet::Encrypted(enc) => self.proc_encrypted(enc),
            Packet::Plaintext(pt) => self.proc_plaintext(pt),
            Packet::Compressed(zd) => self.proc_compressed(zd),
            Packet::Marker | Packet::Comment(_) => Ok(()),
            #[allow(unreachable_patterns)]
            _ => Ok(()),
        }
    }

    fn dispatch_sigs_only(&mut self, pkt: Packet) -> Result<()> {
        match pkt {
            Packet::PublicKey(_) | Packet::SecretKey(_)
            | Packet::UserId(_) | Packet::SymkeyEnc(_)
            | Packet::PubkeyEnc(_) | Packet::Encrypted(_) =>
                Err(Error::UnexpectedPacket(pkt.tag()).into()),
            p @ Packet::Signature(_) => self.add_signature(p),
            p @ Packet::OnePassSig(_) => self.add_onepass_sig(p),
            Packet::Plaintext(pt) => self.proc_plaintext(pt),
            Packet::Compressed(zd) => self.proc_compressed(zd),
            _ => Ok(()),
        }
    }

    fn dispatch_encrypt_only(&mut self, pkt: Packet) -> Result<()> {
        match pkt {
            Packet::PublicKey(_) | Packet::SecretKey(_)
            | Packet::UserId(_) =>
                Err(Error::UnexpectedPacket(pkt.tag()).into()),
            p @ Packet::Signature(_) => self.add_signature(p),
            p @ Packet::OnePassSig(_) => self.add_onepass_sig(p),
            Packet::SymkeyEnc(enc) => self.proc_symkey_enc(enc),
            Packet::PubkeyEnc(enc) => self.proc_pubkey_enc(enc),
            Packet::Encrypted(enc) => self.proc_encrypted(enc),
            Packet::Plaintext(pt) => self.proc_plaintext(pt),
            Packet::Compressed(zd) => self.proc_compressed(zd),
            _ => Ok(()),
        }
    }

    /// Flushes the open tree through the tree processor.
    fn release_list(&mut self) -> Result<()> {
        if let Some(list) = self.list.take() {
            crate::tree::proc_tree(self, &list)?;
        }
        Ok(())
    }

    fn add_onepass_sig(&mut self, pkt: Packet) -> Result<()> {
        let misplaced = self.list.as_ref()
            .map(|l| l.root().tag() != Tag::OnePassSig)
            .unwrap_or(false);
        if misplaced {
            log::error!("add_onepass_sig: another packet is in the way");
            self.release_list()?;
        }
        match &mut self.list {
            Some(list) => list.push(pkt),
            None => self.list = Some(Keyblock::new(pkt)),
        }
        Ok(())
    }

    fn add_user_id(&mut self, pkt: Packet) -> Result<()> {
        match &mut self.list {
            Some(list) => list.push(pkt),
            None => log::error!("orphaned user id"),
        }
        Ok(())
    }

    fn add_subkey(&mut self, pkt: Packet) -> Result<()> {
        match &mut self.list {
            Some(list) => list.push(pkt),
            None => log::error!("subkey w/o mainkey"),
        }
        Ok(())
    }

    fn add_signature(&mut self, pkt: Packet) -> Result<()> {
        match &mut self.list {
            Some(list) => list.push(pkt),
            None => {
                // The first signature for the following data file.
                // This tool always writes one-pass packets instead,
                // but PGP prepends the signature to the data; accept
                // it as a tree root for interoperability.
                self.list = Some(Keyblock::new(pkt));
            }
        }
        Ok(())
    }

    fn proc_pubkey_enc(&mut self, enc: PubkeyEnc) -> Result<()> {
        self.last_was_session_key = Some(SessionKeyOrigin::Pubkey);
        // Paranoid: delete a pending DEK.
        self.dek = None;
        if enc.pubkey_algo.for_encryption() {
            match self.helper.get_session_key(&enc) {
                Ok(dek) => {
                    log::debug!("pubkey_enc packet: good DEK");
                    self.dek = Some(dek);
                }
                Err(e) =>
                    log::error!("public key decryption failed: {}", e),
            }
        } else {
            log::error!("public key decryption failed: {}",
                        Error::UnsupportedPublicKeyAlgorithm(
                            enc.pubkey_algo));
        }
        Ok(())
    }

    fn proc_symkey_enc(&mut self, enc: SymkeyEnc) -> Result<()> {
        if !enc.session_key.is_empty() {
            log::error!(
                "symkey_enc packets with session keys are not supported");
            return Ok(());
        }
        self.last_was_session_key = Some(SessionKeyOrigin::Symkey);
        match self.helper.passphrase_to_dek(enc.cipher_algo,
                                            Some(&enc.s2k)) {
            Ok(dek) => self.dek = Some(dek),
            Err(e) => log::error!("passphrase conversion failed: {}", e),
        }
        Ok(())
    }

    fn proc_encrypted(&mut self, enc: Encrypted) -> Result<()> {
        let inner = self.decrypt(&enc);
        self.last_was_session_key = None;
        match inner {
            Ok(mut inner) => {
                log::debug!("decryption okay");
                let mut sub = Sequencer::new(&mut *self.helper, self.opt,
                                             Mode::EncryptOnly);
                sub.process(inner.as_mut())?;
            }
            Err(e) => log::error!("decryption failed: {}", e),
        }
        Ok(())
    }

    fn decrypt(&mut self, enc: &Encrypted)
               -> Result<Box<dyn PacketSource>> {
        if self.dek.is_none() {
            if self.last_was_session_key.is_none() {
                // No session key packet preceded the data: assume old
                // conventional encryption.
                let dek = self.helper.passphrase_to_dek(
                    self.opt.def_cipher_algo, None)?;
                self.dek = Some(dek);
            } else {
                return Err(Error::NoSecretKey.into());
            }
        }
        let dek = self.dek.take().expect("checked above");
        self.helper.decrypt_data(enc, &dek)
        // The DEK drops, and zeroizes, here.
    }

    fn proc_plaintext(&mut self, pt: Plaintext) -> Result<()> {
        if !pt.name.is_empty() {
            log::info!("original file name='{}'",
                       String::from_utf8_lossy(&pt.name));
        }

        self.mfx = DigestSet::new();
        let mut any = false;
        let mut clearsig = false;
        if let Some(list) = &self.list {
            for p in list.iter() {
                if let Packet::OnePassSig(ops) = p {
                    if u8::from(ops.digest_algo) != 0 {
                        any = true;
                        if let Err(e) = self.mfx.enable(ops.digest_algo) {
                            log::error!("can't hash with {}: {}",
                                        ops.digest_algo, e);
                        }
                    }
                    // A one-pass packet of class text with a zero key
                    // id is how the armor filter announces clearsigned
                    // text.  This can be faked, but faking it buys an
                    // attacker nothing that a real signature request
                    // would not.
                    if ops.sig_class == SignatureType::Text
                        && ops.keyid == 0 {
                        clearsig = true;
                    }
                }
            }
        }
        if !any {
            // No one-pass packet: enable all standard algorithms.
            for algo in [HashAlgorithm::RipeMD, HashAlgorithm::SHA1,
                         HashAlgorithm::MD5] {
                let _ = self.mfx.enable(algo);
            }
        }

        if let Err(e) = self.helper.handle_plaintext(
            &pt, &mut self.mfx, self.mode == Mode::SigsOnly, clearsig) {
            log::error!("handle plaintext failed: {}", e);
        }
        self.last_was_session_key = None;
        Ok(())
    }

    fn proc_compressed(&mut self, zd: Compressed) -> Result<()> {
        match self.helper.handle_compressed(&zd) {
            Ok(mut inner) => {
                let mut sub = Sequencer::new(&mut *self.helper, self.opt,
                                             self.mode);
                sub.signed_data = self.signed_data;
                sub.sig_filename = self.sig_filename;
                sub.process(inner.as_mut())?;
            }
            Err(e) => log::error!("uncompressing failed: {}", e),
        }
        self.last_was_session_key = None;
        Ok(())
    }
}
