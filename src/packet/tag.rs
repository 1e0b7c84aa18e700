use std::fmt;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::packet::Packet;

/// The OpenPGP packet tags as defined in [Section 4.3 of RFC 4880].
///
///   [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3
///
/// The values correspond to the serialized format.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum Tag {
    /// Reserved packet tag.
    Reserved,
    /// Public-Key Encrypted Session Key packet.
    PubkeyEnc,
    /// Signature packet.
    Signature,
    /// Symmetric-Key Encrypted Session Key packet.
    SymkeyEnc,
    /// One-Pass Signature packet.
    OnePassSig,
    /// Secret-Key packet.
    SecretKey,
    /// Public-Key packet.
    PublicKey,
    /// Secret-Subkey packet.
    SecretSubkey,
    /// Compressed Data packet.
    Compressed,
    /// Symmetrically Encrypted Data packet.
    Encrypted,
    /// Marker packet.
    Marker,
    /// Literal Data packet.
    Plaintext,
    /// Trust packet.
    Trust,
    /// User ID packet.
    UserId,
    /// Public-Subkey packet.
    PublicSubkey,
    /// Comment packet (a GnuPG extension in the private range).
    Comment,
    /// Unassigned packets.
    Unknown(u8),
    /// Experimental packets.
    Private(u8),
}

impl Eq for Tag {}

impl PartialEq for Tag {
    fn eq(&self, other: &Tag) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        let a: u8 = (*self).into();
        let b: u8 = (*other).into();
        a.cmp(&b)
    }
}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let t: u8 = (*self).into();
        t.hash(state);
    }
}

impl From<u8> for Tag {
    fn from(u: u8) -> Self {
        use crate::packet::Tag::*;

        match u {
            0 => Reserved,
            1 => PubkeyEnc,
            2 => Signature,
            3 => SymkeyEnc,
            4 => OnePassSig,
            5 => SecretKey,
            6 => PublicKey,
            7 => SecretSubkey,
            8 => Compressed,
            9 => Encrypted,
            10 => Marker,
            11 => Plaintext,
            12 => Trust,
            13 => UserId,
            14 => PublicSubkey,
            61 => Comment,
            60 | 62 | 63 => Private(u),
            _ => Unknown(u),
        }
    }
}

impl From<Tag> for u8 {
    fn from(t: Tag) -> u8 {
        (&t).into()
    }
}

impl From<&Tag> for u8 {
    fn from(t: &Tag) -> u8 {
        match t {
            Tag::Reserved => 0,
            Tag::PubkeyEnc => 1,
            Tag::Signature => 2,
            Tag::SymkeyEnc => 3,
            Tag::OnePassSig => 4,
            Tag::SecretKey => 5,
            Tag::PublicKey => 6,
            Tag::SecretSubkey => 7,
            Tag::Compressed => 8,
            Tag::Encrypted => 9,
            Tag::Marker => 10,
            Tag::Plaintext => 11,
            Tag::Trust => 12,
            Tag::UserId => 13,
            Tag::PublicSubkey => 14,
            Tag::Comment => 61,
            Tag::Private(x) => *x,
            Tag::Unknown(x) => *x,
        }
    }
}

impl From<&Packet> for Tag {
    fn from(p: &Packet) -> Tag {
        p.tag()
    }
}

impl From<Packet> for Tag {
    fn from(p: Packet) -> Tag {
        p.tag()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Tag::Reserved =>
                f.write_str("Reserved - a packet tag MUST NOT have this value"),
            Tag::PubkeyEnc =>
                f.write_str("Public-Key Encrypted Session Key Packet"),
            Tag::Signature => f.write_str("Signature Packet"),
            Tag::SymkeyEnc =>
                f.write_str("Symmetric-Key Encrypted Session Key Packet"),
            Tag::OnePassSig => f.write_str("One-Pass Signature Packet"),
            Tag::SecretKey => f.write_str("Secret-Key Packet"),
            Tag::PublicKey => f.write_str("Public-Key Packet"),
            Tag::SecretSubkey => f.write_str("Secret-Subkey Packet"),
            Tag::Compressed => f.write_str("Compressed Data Packet"),
            Tag::Encrypted =>
                f.write_str("Symmetrically Encrypted Data Packet"),
            Tag::Marker => f.write_str("Marker Packet"),
            Tag::Plaintext => f.write_str("Literal Data Packet"),
            Tag::Trust => f.write_str("Trust Packet"),
            Tag::UserId => f.write_str("User ID Packet"),
            Tag::PublicSubkey => f.write_str("Public-Subkey Packet"),
            Tag::Comment => f.write_str("Comment Packet"),
            Tag::Private(u) =>
                f.write_fmt(format_args!("Private/Experimental Packet {}", u)),
            Tag::Unknown(u) =>
                f.write_fmt(format_args!("Unknown Packet {}", u)),
        }
    }
}

const PACKET_TAG_VARIANTS: [Tag; 15] = [
    Tag::PubkeyEnc,
    Tag::Signature,
    Tag::SymkeyEnc,
    Tag::OnePassSig,
    Tag::SecretKey,
    Tag::PublicKey,
    Tag::SecretSubkey,
    Tag::Compressed,
    Tag::Encrypted,
    Tag::Marker,
    Tag::Plaintext,
    Tag::Trust,
    Tag::UserId,
    Tag::PublicSubkey,
    Tag::Comment,
];

#[cfg(test)]
impl Arbitrary for Tag {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

impl Tag {
    /// Returns whether a packet with this tag may plausibly start an
    /// unarmored OpenPGP stream.
    ///
    /// The armor detector peeks at the first byte of its input: if
    /// the byte decodes to a tag in this set, the input is assumed to
    /// be a bare binary stream and armor processing is bypassed.
    pub fn valid_start_of_stream(&self) -> bool {
        matches!(self,
                 Tag::Marker | Tag::SymkeyEnc | Tag::PublicKey
                 | Tag::SecretKey | Tag::PubkeyEnc | Tag::Signature
                 | Tag::Comment | Tag::Plaintext | Tag::Compressed
                 | Tag::Encrypted)
    }

    /// Returns an iterator over all valid variants.
    ///
    /// This does not include the [`Tag::Reserved`], [`Tag::Private`],
    /// or [`Tag::Unknown`] variants.
    pub fn variants() -> impl Iterator<Item=Tag> {
        PACKET_TAG_VARIANTS.iter().cloned()
    }
}
