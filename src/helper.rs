//! Collaborator traits.
//!
//! The ingestion pipeline stops at well-defined seams: it does not
//! parse packet bytes, perform public key operations, run bulk
//! ciphers, look up keys, or talk to the user.  Those concerns are
//! reached through the traits in this module, which the caller
//! implements.
//!
//! [`PacketSource`] is the external packet parser: the sequencer
//! pulls decoded [`Packet`]s from it one at a time.  [`Helper`]
//! bundles everything else: session key recovery, bulk decryption,
//! signature verification, plaintext delivery, and the status and
//! listing channels.

use std::path::{Path, PathBuf};

use crate::Result;
use crate::StatusCode;
use crate::crypto::{Dek, DigestSet, S2k};
use crate::keyblock::Keyblock;
use crate::packet::{Compressed, Encrypted, Packet, Plaintext, PubkeyEnc,
                    Signature};
use crate::types::SymmetricAlgorithm;

/// Pulls decoded packets from a byte stream.
///
/// This is the seam to the external packet parser.  `Ok(None)` is the
/// orderly end of the stream.  An error carrying
/// [`crate::Error::MalformedPacket`] abandons the stream; any other
/// error skips the offending packet and the sequencer continues.
pub trait PacketSource {
    /// Returns the next packet, or `None` at end of stream.
    fn parse_packet(&mut self) -> Result<Option<Packet>>;

    /// Returns the name of the underlying file, if there is one.
    ///
    /// Used to locate the data file belonging to a detached
    /// signature.
    fn filename(&self) -> Option<&str> {
        None
    }
}

/// Processing options.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Abort instead of asking when something fails; a trust failure
    /// on an otherwise good signature becomes an error.
    pub batch: bool,
    /// List signatures when listing keys.
    pub list_sigs: bool,
    /// Verify signatures while listing them.
    pub check_sigs: bool,
    /// Skip signature verification entirely.
    pub skip_verify: bool,
    /// Cipher assumed for old-style conventionally encrypted data
    /// that is not preceded by a session key packet.
    pub def_cipher_algo: SymmetricAlgorithm,
}

/// The collaborators of the packet sequencer.
///
/// Methods with a default implementation are optional channels; the
/// rest must be provided.  Recoverable failures (an unavailable
/// secret key, an unknown algorithm) are logged by the sequencer and
/// processing continues; see the module documentation of
/// [`crate::sequencer`].
pub trait Helper {
    /// Derives a data encryption key from a passphrase.
    ///
    /// `s2k` is `None` for old-style conventionally encrypted data,
    /// where the cipher defaults from [`Options::def_cipher_algo`].
    fn passphrase_to_dek(&mut self, algo: SymmetricAlgorithm,
                         s2k: Option<&S2k>) -> Result<Dek> {
        let _ = (algo, s2k);
        Err(crate::Error::NoSecretKey.into())
    }

    /// Recovers the session key from a public key encrypted session
    /// key packet, using the recipient's secret key.
    fn get_session_key(&mut self, enc: &PubkeyEnc) -> Result<Dek> {
        let _ = enc;
        Err(crate::Error::NoSecretKey.into())
    }

    /// Decrypts the bulk data, returning a parser over the inner
    /// packet stream.
    fn decrypt_data(&mut self, enc: &Encrypted, dek: &Dek)
                    -> Result<Box<dyn PacketSource>> {
        let _ = (enc, dek);
        Err(crate::Error::NoSecretKey.into())
    }

    /// Decompresses the packet, returning a parser over the inner
    /// packet stream.
    fn handle_compressed(&mut self, zd: &Compressed)
                         -> Result<Box<dyn PacketSource>> {
        let _ = zd;
        Err(crate::Error::InvalidOperation(
            "no decompressor available".into()).into())
    }

    /// Delivers literal data to the output sink.
    ///
    /// The implementation must feed every delivered byte through `md`
    /// in order; signature verification depends on byte-exact
    /// hashing.  With `sigs_only` set, nothing is written out and the
    /// data is only hashed.  `clearsig` marks text recovered from a
    /// clearsigned message.
    fn handle_plaintext(&mut self, pt: &Plaintext, md: &mut DigestSet,
                        sigs_only: bool, clearsig: bool) -> Result<()> {
        let _ = (sigs_only, clearsig);
        md.update(&pt.body);
        Ok(())
    }

    /// Verifies a signature over document data against the digest.
    fn signature_check(&mut self, sig: &Signature, md: DigestSet)
                       -> Result<()> {
        let _ = (sig, md);
        Err(crate::Error::NoPublicKey.into())
    }

    /// Verifies a key or certification signature inside `keyblock`.
    ///
    /// `sig_index` is the index of the signature node.  Returns
    /// whether the signature was made by the block's own key.
    fn check_key_signature(&mut self, keyblock: &Keyblock,
                           sig_index: usize) -> Result<bool> {
        let _ = (keyblock, sig_index);
        Err(crate::Error::NoPublicKey.into())
    }

    /// Feeds the named data files into `md` for a detached
    /// signature.  `textmode` selects canonical text hashing.
    fn hash_datafiles(&mut self, md: &mut DigestSet, names: &[PathBuf],
                      sig_filename: Option<&Path>, textmode: bool)
                      -> Result<()> {
        let _ = (md, names, sig_filename, textmode);
        Err(crate::Error::InvalidOperation(
            "no detached data available".into()).into())
    }

    /// Asks the user for the data file belonging to a detached
    /// signature and feeds it into `md`.
    fn ask_for_detached_datafile(&mut self, md: &mut DigestSet,
                                 filename: Option<&str>) -> Result<()> {
        let _ = (md, filename);
        Err(crate::Error::InvalidOperation(
            "no detached data available".into()).into())
    }

    /// Runs the trust model over a signature that verified
    /// correctly.
    fn check_signatures_trust(&mut self, sig: &Signature) -> Result<()> {
        let _ = sig;
        Ok(())
    }

    /// Emits a line of machine-readable status.
    fn write_status(&mut self, status: StatusCode) {
        let _ = status;
    }

    /// Presents a line of human-readable listing output.
    fn display(&mut self, line: &str) {
        let _ = line;
    }
}
