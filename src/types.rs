//! Primitive types.
//!
//! This module provides the enumerations describing the algorithm and
//! class identifiers that appear on the wire in OpenPGP packets.  The
//! numeric values correspond to the serialized format as defined in
//! [Section 9 of RFC 4880].
//!
//!   [Section 9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::Error;

/// The OpenPGP hash algorithms.
///
/// Only the algorithms that may appear in a clearsigned `Hash:`
/// header and in legacy signatures are named; everything else is
/// carried through as [`HashAlgorithm::Unknown`].
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum HashAlgorithm {
    /// Rivest et.al. message digest 5.
    MD5,
    /// NIST Secure Hash Algorithm (deprecated).
    SHA1,
    /// RIPEMD-160.
    RipeMD,
    /// TIGER/192.
    Tiger,
    /// Private hash algorithm identifier.
    Private(u8),
    /// Unknown hash algorithm identifier.
    Unknown(u8),
}

const HASH_ALGORITHM_VARIANTS: [HashAlgorithm; 4] = [
    HashAlgorithm::MD5,
    HashAlgorithm::SHA1,
    HashAlgorithm::RipeMD,
    HashAlgorithm::Tiger,
];

impl From<u8> for HashAlgorithm {
    fn from(u: u8) -> Self {
        match u {
            1 => HashAlgorithm::MD5,
            2 => HashAlgorithm::SHA1,
            3 => HashAlgorithm::RipeMD,
            6 => HashAlgorithm::Tiger,
            100..=110 => HashAlgorithm::Private(u),
            u => HashAlgorithm::Unknown(u),
        }
    }
}

impl From<HashAlgorithm> for u8 {
    fn from(h: HashAlgorithm) -> u8 {
        match h {
            HashAlgorithm::MD5 => 1,
            HashAlgorithm::SHA1 => 2,
            HashAlgorithm::RipeMD => 3,
            HashAlgorithm::Tiger => 6,
            HashAlgorithm::Private(u) => u,
            HashAlgorithm::Unknown(u) => u,
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        if s.eq_ignore_ascii_case("MD5") {
            Ok(HashAlgorithm::MD5)
        } else if s.eq_ignore_ascii_case("SHA1") {
            Ok(HashAlgorithm::SHA1)
        } else if s.eq_ignore_ascii_case("RIPEMD160") {
            Ok(HashAlgorithm::RipeMD)
        } else if s.eq_ignore_ascii_case("TIGER") {
            Ok(HashAlgorithm::Tiger)
        } else {
            Err(Error::InvalidOperation(format!(
                "Unknown hash algorithm {:?}", s)))
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HashAlgorithm::MD5 => f.write_str("MD5"),
            HashAlgorithm::SHA1 => f.write_str("SHA1"),
            HashAlgorithm::RipeMD => f.write_str("RipeMD160"),
            HashAlgorithm::Tiger => f.write_str("TIGER"),
            HashAlgorithm::Private(u) =>
                f.write_fmt(format_args!("Private/Experimental hash algorithm {}", u)),
            HashAlgorithm::Unknown(u) =>
                f.write_fmt(format_args!("Unknown hash algorithm {}", u)),
        }
    }
}

impl HashAlgorithm {
    /// Returns the text name of this algorithm as used in the
    /// clearsigned `Hash:` armor header.
    pub fn text_name(&self) -> crate::Result<&str> {
        match self {
            HashAlgorithm::MD5 =>    Ok("MD5"),
            HashAlgorithm::SHA1 =>   Ok("SHA1"),
            HashAlgorithm::RipeMD => Ok("RIPEMD160"),
            HashAlgorithm::Tiger =>  Ok("TIGER"),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                Err(Error::UnsupportedHashAlgorithm(*self).into()),
        }
    }

    /// Returns the digest size in bytes.
    pub fn digest_size(&self) -> crate::Result<usize> {
        match self {
            HashAlgorithm::MD5 =>    Ok(16),
            HashAlgorithm::SHA1 =>   Ok(20),
            HashAlgorithm::RipeMD => Ok(20),
            HashAlgorithm::Tiger =>  Ok(24),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                Err(Error::UnsupportedHashAlgorithm(*self).into()),
        }
    }

    /// Returns an iterator over all valid variants.
    ///
    /// Returns an iterator over all known variants.  This does not
    /// include the [`HashAlgorithm::Private`], or
    /// [`HashAlgorithm::Unknown`] variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        HASH_ALGORITHM_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for HashAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP public key algorithms.
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt or Sign).
    RSAEncryptSign,
    /// RSA Encrypt-Only, deprecated.
    RSAEncrypt,
    /// RSA Sign-Only, deprecated.
    RSASign,
    /// ElGamal (Encrypt-Only).
    ElGamalEncrypt,
    /// DSA (Digital Signature Algorithm).
    DSA,
    /// ElGamal (Encrypt or Sign), deprecated.
    ElGamalEncryptSign,
    /// Private algorithm identifier.
    Private(u8),
    /// Unknown algorithm identifier.
    Unknown(u8),
}

const PUBLIC_KEY_ALGORITHM_VARIANTS: [PublicKeyAlgorithm; 6] = [
    PublicKeyAlgorithm::RSAEncryptSign,
    PublicKeyAlgorithm::RSAEncrypt,
    PublicKeyAlgorithm::RSASign,
    PublicKeyAlgorithm::ElGamalEncrypt,
    PublicKeyAlgorithm::DSA,
    PublicKeyAlgorithm::ElGamalEncryptSign,
];

impl From<u8> for PublicKeyAlgorithm {
    fn from(u: u8) -> Self {
        use self::PublicKeyAlgorithm::*;
        match u {
            1 => RSAEncryptSign,
            2 => RSAEncrypt,
            3 => RSASign,
            16 => ElGamalEncrypt,
            17 => DSA,
            20 => ElGamalEncryptSign,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<PublicKeyAlgorithm> for u8 {
    fn from(p: PublicKeyAlgorithm) -> u8 {
        use self::PublicKeyAlgorithm::*;
        match p {
            RSAEncryptSign => 1,
            RSAEncrypt => 2,
            RSASign => 3,
            ElGamalEncrypt => 16,
            DSA => 17,
            ElGamalEncryptSign => 20,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::PublicKeyAlgorithm::*;
        match *self {
            RSAEncryptSign => f.write_str("RSA"),
            RSAEncrypt => f.write_str("RSA (encrypt only)"),
            RSASign => f.write_str("RSA (sign only)"),
            ElGamalEncrypt => f.write_str("ElGamal (encrypt only)"),
            DSA => f.write_str("DSA"),
            ElGamalEncryptSign => f.write_str("ElGamal"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental public key algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown public key algorithm {}", u)),
        }
    }
}

impl PublicKeyAlgorithm {
    /// Returns whether the algorithm can encrypt a session key.
    pub fn for_encryption(&self) -> bool {
        use self::PublicKeyAlgorithm::*;
        matches!(self,
                 RSAEncryptSign | RSAEncrypt
                 | ElGamalEncrypt | ElGamalEncryptSign)
    }

    /// Returns the single-letter tag used in key listings.
    pub fn letter(&self) -> char {
        use self::PublicKeyAlgorithm::*;
        match self {
            RSAEncryptSign => 'R',
            RSAEncrypt => 'r',
            RSASign => 's',
            ElGamalEncrypt | ElGamalEncryptSign => 'G',
            DSA => 'D',
            Private(_) | Unknown(_) => '?',
        }
    }

    /// Returns an iterator over all valid variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        PUBLIC_KEY_ALGORITHM_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for PublicKeyAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP symmetric key algorithms.
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum SymmetricAlgorithm {
    /// Null encryption.
    Unencrypted,
    /// IDEA block cipher.
    IDEA,
    /// 3-DES in EDE configuration.
    TripleDES,
    /// CAST5/CAST128 block cipher.
    CAST5,
    /// Schneier et.al. Blowfish block cipher.
    Blowfish,
    /// Private algorithm identifier.
    Private(u8),
    /// Unknown algorithm identifier.
    Unknown(u8),
}

const SYMMETRIC_ALGORITHM_VARIANTS: [SymmetricAlgorithm; 4] = [
    SymmetricAlgorithm::IDEA,
    SymmetricAlgorithm::TripleDES,
    SymmetricAlgorithm::CAST5,
    SymmetricAlgorithm::Blowfish,
];

impl Default for SymmetricAlgorithm {
    fn default() -> Self {
        SymmetricAlgorithm::CAST5
    }
}

impl From<u8> for SymmetricAlgorithm {
    fn from(u: u8) -> Self {
        use self::SymmetricAlgorithm::*;
        match u {
            0 => Unencrypted,
            1 => IDEA,
            2 => TripleDES,
            3 => CAST5,
            4 => Blowfish,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<SymmetricAlgorithm> for u8 {
    fn from(s: SymmetricAlgorithm) -> u8 {
        use self::SymmetricAlgorithm::*;
        match s {
            Unencrypted => 0,
            IDEA => 1,
            TripleDES => 2,
            CAST5 => 3,
            Blowfish => 4,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::SymmetricAlgorithm::*;
        match *self {
            Unencrypted => f.write_str("Unencrypted"),
            IDEA => f.write_str("IDEA"),
            TripleDES => f.write_str("TripleDES"),
            CAST5 => f.write_str("CAST5"),
            Blowfish => f.write_str("Blowfish"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental symmetric algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown symmetric algorithm {}", u)),
        }
    }
}

impl SymmetricAlgorithm {
    /// Returns an iterator over all valid variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        SYMMETRIC_ALGORITHM_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for SymmetricAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP compression algorithms.
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum CompressionAlgorithm {
    /// Null compression.
    Uncompressed,
    /// DEFLATE Compressed Data.
    Zip,
    /// ZLIB Compressed Data.
    Zlib,
    /// Private compression algorithm identifier.
    Private(u8),
    /// Unknown compression algorithm identifier.
    Unknown(u8),
}

const COMPRESSION_ALGORITHM_VARIANTS: [CompressionAlgorithm; 3] = [
    CompressionAlgorithm::Uncompressed,
    CompressionAlgorithm::Zip,
    CompressionAlgorithm::Zlib,
];

impl From<u8> for CompressionAlgorithm {
    fn from(u: u8) -> Self {
        match u {
            0 => CompressionAlgorithm::Uncompressed,
            1 => CompressionAlgorithm::Zip,
            2 => CompressionAlgorithm::Zlib,
            100..=110 => CompressionAlgorithm::Private(u),
            u => CompressionAlgorithm::Unknown(u),
        }
    }
}

impl From<CompressionAlgorithm> for u8 {
    fn from(c: CompressionAlgorithm) -> u8 {
        match c {
            CompressionAlgorithm::Uncompressed => 0,
            CompressionAlgorithm::Zip => 1,
            CompressionAlgorithm::Zlib => 2,
            CompressionAlgorithm::Private(u) => u,
            CompressionAlgorithm::Unknown(u) => u,
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CompressionAlgorithm::Uncompressed => f.write_str("Uncompressed"),
            CompressionAlgorithm::Zip => f.write_str("ZIP"),
            CompressionAlgorithm::Zlib => f.write_str("ZLIB"),
            CompressionAlgorithm::Private(u) =>
                f.write_fmt(format_args!("Private/Experimental compression algorithm {}", u)),
            CompressionAlgorithm::Unknown(u) =>
                f.write_fmt(format_args!("Unknown compression algorithm {}", u)),
        }
    }
}

impl CompressionAlgorithm {
    /// Returns an iterator over all valid variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        COMPRESSION_ALGORITHM_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for CompressionAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// Signature class.
///
/// The values correspond to the serialized signature class octet.
/// Classes that this crate never needs to name individually round
/// trip through [`SignatureType::Unknown`].
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum SignatureType {
    /// Signature over a binary document.
    Binary,
    /// Signature over a canonical text document.
    Text,
    /// Standalone signature.
    Standalone,
    /// Generic certification of a User ID and Public-Key packet.
    GenericCertification,
    /// Persona certification of a User ID and Public-Key packet.
    PersonaCertification,
    /// Casual certification of a User ID and Public-Key packet.
    CasualCertification,
    /// Positive certification of a User ID and Public-Key packet.
    PositiveCertification,
    /// Subkey binding signature.
    SubkeyBinding,
    /// Signature directly on a key.
    DirectKey,
    /// Key revocation signature.
    KeyRevocation,
    /// Subkey revocation signature.
    SubkeyRevocation,
    /// Certification revocation signature.
    CertificationRevocation,
    /// Catchall.
    Unknown(u8),
}

const SIGNATURE_TYPE_VARIANTS: [SignatureType; 12] = [
    SignatureType::Binary,
    SignatureType::Text,
    SignatureType::Standalone,
    SignatureType::GenericCertification,
    SignatureType::PersonaCertification,
    SignatureType::CasualCertification,
    SignatureType::PositiveCertification,
    SignatureType::SubkeyBinding,
    SignatureType::DirectKey,
    SignatureType::KeyRevocation,
    SignatureType::SubkeyRevocation,
    SignatureType::CertificationRevocation,
];

impl From<u8> for SignatureType {
    fn from(u: u8) -> Self {
        match u {
            0x00 => SignatureType::Binary,
            0x01 => SignatureType::Text,
            0x02 => SignatureType::Standalone,
            0x10 => SignatureType::GenericCertification,
            0x11 => SignatureType::PersonaCertification,
            0x12 => SignatureType::CasualCertification,
            0x13 => SignatureType::PositiveCertification,
            0x18 => SignatureType::SubkeyBinding,
            0x1f => SignatureType::DirectKey,
            0x20 => SignatureType::KeyRevocation,
            0x28 => SignatureType::SubkeyRevocation,
            0x30 => SignatureType::CertificationRevocation,
            _ => SignatureType::Unknown(u),
        }
    }
}

impl From<SignatureType> for u8 {
    fn from(t: SignatureType) -> Self {
        match t {
            SignatureType::Binary => 0x00,
            SignatureType::Text => 0x01,
            SignatureType::Standalone => 0x02,
            SignatureType::GenericCertification => 0x10,
            SignatureType::PersonaCertification => 0x11,
            SignatureType::CasualCertification => 0x12,
            SignatureType::PositiveCertification => 0x13,
            SignatureType::SubkeyBinding => 0x18,
            SignatureType::DirectKey => 0x1f,
            SignatureType::KeyRevocation => 0x20,
            SignatureType::SubkeyRevocation => 0x28,
            SignatureType::CertificationRevocation => 0x30,
            SignatureType::Unknown(u) => u,
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SignatureType::Binary => f.write_str("Binary"),
            SignatureType::Text => f.write_str("Text"),
            SignatureType::Standalone => f.write_str("Standalone"),
            SignatureType::GenericCertification =>
                f.write_str("GenericCertification"),
            SignatureType::PersonaCertification =>
                f.write_str("PersonaCertification"),
            SignatureType::CasualCertification =>
                f.write_str("CasualCertification"),
            SignatureType::PositiveCertification =>
                f.write_str("PositiveCertification"),
            SignatureType::SubkeyBinding => f.write_str("SubkeyBinding"),
            SignatureType::DirectKey => f.write_str("DirectKey"),
            SignatureType::KeyRevocation => f.write_str("KeyRevocation"),
            SignatureType::SubkeyRevocation => f.write_str("SubkeyRevocation"),
            SignatureType::CertificationRevocation =>
                f.write_str("CertificationRevocation"),
            SignatureType::Unknown(u) =>
                f.write_fmt(format_args!("Unknown signature type 0x{:x}", u)),
        }
    }
}

impl SignatureType {
    /// Returns whether this class binds a signature to a key or user
    /// id rather than to document data.
    ///
    /// Covers the certification range 0x10..=0x17, subkey binding,
    /// and the revocation classes.
    pub fn is_key_binding(&self) -> bool {
        let class: u8 = (*self).into();
        matches!(class, 0x10..=0x17 | 0x18 | 0x20 | 0x30)
    }

    /// Returns whether this class signs document data.
    pub fn is_data(&self) -> bool {
        matches!(self, SignatureType::Binary | SignatureType::Text)
    }

    /// Returns an iterator over all valid variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        SIGNATURE_TYPE_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for SignatureType {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// Describes the format of the body of a literal data packet.
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum DataFormat {
    /// Binary data.
    Binary,
    /// Text data.
    Text,
    /// Text data, probably valid UTF-8.
    Unicode,
    /// Unknown format specifier.
    Unknown(u8),
}

const DATA_FORMAT_VARIANTS: [DataFormat; 3] = [
    DataFormat::Binary,
    DataFormat::Text,
    DataFormat::Unicode,
];

impl Default for DataFormat {
    fn default() -> Self {
        DataFormat::Binary
    }
}

impl From<u8> for DataFormat {
    fn from(u: u8) -> Self {
        match u {
            b'b' => DataFormat::Binary,
            b't' => DataFormat::Text,
            b'u' => DataFormat::Unicode,
            _ => DataFormat::Unknown(u),
        }
    }
}

impl From<DataFormat> for u8 {
    fn from(f: DataFormat) -> u8 {
        use self::DataFormat::*;
        match f {
            Binary => b'b',
            Text => b't',
            Unicode => b'u',
            Unknown(c) => c,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::DataFormat::*;
        match *self {
            Binary => f.write_str("Binary data"),
            Text => f.write_str("Text data"),
            Unicode => f.write_str("Text data (UTF-8)"),
            Unknown(c) =>
                f.write_fmt(format_args!(
                    "Unknown data format identifier {:?}", c)),
        }
    }
}

impl DataFormat {
    /// Returns an iterator over all valid variants.
    pub fn variants() -> impl Iterator<Item=Self> {
        DATA_FORMAT_VARIANTS.iter().cloned()
    }
}

#[cfg(test)]
impl Arbitrary for DataFormat {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}
