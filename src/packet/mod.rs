//! Packet-related data types.
//!
//! OpenPGP data structures are packet based.  This module defines the
//! decoded representation of every packet the ingestion pipeline
//! handles.  Packets are instantiated by the external parser (see
//! [`crate::helper::PacketSource`]) and consumed by the
//! [`crate::sequencer`]; this crate never parses packet bytes itself.
//!
//! Container-ish packets — [`Encrypted`], [`Plaintext`],
//! [`Compressed`] — carry their body as an owned buffer filled in by
//! the parser.  Structured packets carry the decoded fields:
//! algorithm identifiers, 64-bit key ids, timestamps, and MPI
//! magnitudes.

use std::fmt;

mod tag;
pub use self::tag::Tag;

use crate::crypto::{Mpi, S2k};
use crate::types::{
    CompressionAlgorithm,
    DataFormat,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    SymmetricAlgorithm,
};

/// Enumeration of packet types.
///
/// The variants correspond to the packet [`Tag`]s the sequencer
/// dispatches on.  Key packets use the same representation for
/// primary keys and subkeys; the distinction is carried by the
/// variant.
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Packet {
    /// Public key packet.
    PublicKey(Key),
    /// Public subkey packet.
    PublicSubkey(Key),
    /// Secret key packet.
    SecretKey(Key),
    /// Secret subkey packet.
    SecretSubkey(Key),
    /// User ID packet.
    UserId(UserId),
    /// Signature packet.
    Signature(Signature),
    /// One pass signature packet.
    OnePassSig(OnePassSig),
    /// Public key encrypted session key packet.
    PubkeyEnc(PubkeyEnc),
    /// Symmetric key encrypted session key packet.
    SymkeyEnc(SymkeyEnc),
    /// Symmetrically encrypted data packet.
    Encrypted(Encrypted),
    /// Literal data packet.
    Plaintext(Plaintext),
    /// Compressed data packet.
    Compressed(Compressed),
    /// Marker packet.
    Marker,
    /// Comment packet.
    Comment(Comment),
}

impl Packet {
    /// Returns the `Packet`'s corresponding OpenPGP tag.
    pub fn tag(&self) -> Tag {
        match self {
            Packet::PublicKey(_) => Tag::PublicKey,
            Packet::PublicSubkey(_) => Tag::PublicSubkey,
            Packet::SecretKey(_) => Tag::SecretKey,
            Packet::SecretSubkey(_) => Tag::SecretSubkey,
            Packet::UserId(_) => Tag::UserId,
            Packet::Signature(_) => Tag::Signature,
            Packet::OnePassSig(_) => Tag::OnePassSig,
            Packet::PubkeyEnc(_) => Tag::PubkeyEnc,
            Packet::SymkeyEnc(_) => Tag::SymkeyEnc,
            Packet::Encrypted(_) => Tag::Encrypted,
            Packet::Plaintext(_) => Tag::Plaintext,
            Packet::Compressed(_) => Tag::Compressed,
            Packet::Marker => Tag::Marker,
            Packet::Comment(_) => Tag::Comment,
        }
    }

    /// Returns a reference to the key, if this is a key packet.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Packet::PublicKey(k) | Packet::PublicSubkey(k)
            | Packet::SecretKey(k) | Packet::SecretSubkey(k) => Some(k),
            _ => None,
        }
    }

    /// Returns a reference to the signature, if this is a signature
    /// packet.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Packet::Signature(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a reference to the one-pass signature, if this is one.
    pub fn one_pass_sig(&self) -> Option<&OnePassSig> {
        match self {
            Packet::OnePassSig(o) => Some(o),
            _ => None,
        }
    }

    /// Returns whether this packet may root a key tree.
    pub fn is_key_root(&self) -> bool {
        matches!(self, Packet::PublicKey(_) | Packet::SecretKey(_))
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Holds a public or secret key packet.
///
/// The key id is computed by the external parser when it decodes the
/// packet; this crate only compares and displays it.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Key {
    /// Creation time, seconds since the epoch.
    pub timestamp: u32,
    /// Validity period in days; zero means forever.
    pub valid_days: u16,
    /// The public key algorithm.
    pub algo: PublicKeyAlgorithm,
    /// The 64-bit key id.
    pub keyid: u64,
    /// Algorithm-specific key material.
    pub mpis: Vec<Mpi>,
}

impl Key {
    /// Returns the size of the key's principal MPI in bits.
    pub fn nbits(&self) -> usize {
        self.mpis.first().map(|m| m.bits()).unwrap_or(0)
    }
}

/// Holds a user id packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct UserId {
    /// The user id, conventionally UTF-8 but not guaranteed to be.
    pub value: Vec<u8>,
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.value))
    }
}

/// Holds a signature packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Signature {
    /// Packet version.
    pub version: u8,
    /// The signature class.
    pub sig_class: SignatureType,
    /// Creation time, seconds since the epoch.
    pub timestamp: u32,
    /// The 64-bit key id of the issuing key.
    pub keyid: u64,
    /// The public key algorithm of the issuing key.
    pub pubkey_algo: PublicKeyAlgorithm,
    /// The hash algorithm the signature was made over.
    pub digest_algo: HashAlgorithm,
    /// The left 16 bits of the signed digest, a quick check value.
    pub digest_start: [u8; 2],
    /// Algorithm-specific signature material.
    pub mpis: Vec<Mpi>,
}

/// Holds a one-pass signature packet.
///
/// A one-pass signature packet precedes the signed data and declares
/// the hash to compute, so verification needs no second pass.  The
/// armor filter synthesizes these (with a zero key id) for
/// clearsigned messages.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct OnePassSig {
    /// The signature class of the matching signature.
    pub sig_class: SignatureType,
    /// The hash algorithm to enable.
    pub digest_algo: HashAlgorithm,
    /// The public key algorithm of the issuing key.
    pub pubkey_algo: PublicKeyAlgorithm,
    /// The 64-bit key id; zero for synthesized clearsig packets.
    pub keyid: u64,
    /// Set on the last one-pass packet of a group.
    pub last: bool,
}

/// Holds a public key encrypted session key packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct PubkeyEnc {
    /// Packet version.
    pub version: u8,
    /// The 64-bit key id of the intended recipient key.
    pub keyid: u64,
    /// The public key algorithm the session key is encrypted with.
    pub pubkey_algo: PublicKeyAlgorithm,
    /// The encrypted session key.
    pub mpis: Vec<Mpi>,
}

/// Holds a symmetric key encrypted session key packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SymkeyEnc {
    /// Packet version.
    pub version: u8,
    /// The cipher the derived key is for.
    pub cipher_algo: SymmetricAlgorithm,
    /// The string-to-key specifier.
    pub s2k: S2k,
    /// An encrypted session key; empty when the S2K output is the
    /// session key itself.
    pub session_key: Vec<u8>,
}

/// Holds a symmetrically encrypted data packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Encrypted {
    /// The raw ciphertext.
    pub body: Vec<u8>,
}

/// Holds a literal data packet.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Plaintext {
    /// Formatting hint for the body.
    pub format: DataFormat,
    /// The suggested file name; may be empty.
    pub name: Vec<u8>,
    /// Modification time of the original file, or zero.
    pub timestamp: u32,
    /// The literal bytes.
    pub body: Vec<u8>,
}

/// Holds a compressed data packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Compressed {
    /// The compression algorithm.
    pub algo: CompressionAlgorithm,
    /// The compressed bytes.
    pub body: Vec<u8>,
}

/// Holds a comment packet.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Comment {
    /// The comment text.
    pub text: Vec<u8>,
}

macro_rules! impl_from_variant {
    ($typ:ident, $variant:ident) => {
        impl From<$typ> for Packet {
            fn from(p: $typ) -> Self {
                Packet::$variant(p)
            }
        }
    };
}

impl_from_variant!(UserId, UserId);
impl_from_variant!(Signature, Signature);
impl_from_variant!(OnePassSig, OnePassSig);
impl_from_variant!(PubkeyEnc, PubkeyEnc);
impl_from_variant!(SymkeyEnc, SymkeyEnc);
impl_from_variant!(Encrypted, Encrypted);
impl_from_variant!(Plaintext, Plaintext);
impl_from_variant!(Compressed, Compressed);
impl_from_variant!(Comment, Comment);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_variants() {
        let uid = Packet::UserId(UserId { value: b"alice".to_vec() });
        assert_eq!(uid.tag(), Tag::UserId);
        assert_eq!(Tag::from(&uid), Tag::UserId);

        let key = Key {
            timestamp: 0,
            valid_days: 0,
            algo: crate::types::PublicKeyAlgorithm::DSA,
            keyid: 0x1234_5678_9abc_def0,
            mpis: vec![],
        };
        assert!(Packet::PublicKey(key.clone()).is_key_root());
        assert!(Packet::SecretKey(key.clone()).is_key_root());
        assert!(!Packet::PublicSubkey(key).is_key_root());
    }

    #[test]
    fn key_nbits() {
        let mut key = Key {
            timestamp: 0,
            valid_days: 0,
            algo: crate::types::PublicKeyAlgorithm::RSAEncryptSign,
            keyid: 0,
            mpis: vec![Mpi::new(vec![0x80, 0, 0, 0])],
        };
        assert_eq!(key.nbits(), 32);
        key.mpis.clear();
        assert_eq!(key.nbits(), 0);
    }
}
