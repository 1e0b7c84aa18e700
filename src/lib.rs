//! Streaming OpenPGP message ingestion.
//!
//! This crate implements the front half of an OpenPGP processor: it
//! consumes an opaque byte stream, strips ASCII armor when present
//! (including clearsigned text), assembles the resulting packet
//! sequence into logical trees, and dispatches each tree to
//! verification or decryption.
//!
//! The crate deliberately does *not* implement the low-level packet
//! parser, the cryptographic primitives, key lookup, or any user
//! interface.  Those are collaborators reached through the
//! [`PacketSource`] and [`Helper`] traits; see the [`helper`] module.
//!
//! # Overview
//!
//! Raw bytes flow through a pull-driven [`filter::Pipeline`].  The
//! [`armor::Reader`] filter detects armored input, decodes the
//! radix-64 body and verifies its CRC-24, or, for clearsigned
//! messages, synthesizes the one-pass signature and literal data
//! packets that make the text verifiable in a single pass.  The
//! decoded packets are then fed to the [`sequencer`], which groups
//! keys, user ids, and signatures into trees and drives signature
//! verification and decryption through the caller's [`Helper`].
//!
//! ```no_run
//! use pgstream::{helper::Options, sequencer};
//! # struct MySource; struct MyHelper;
//! # impl pgstream::helper::PacketSource for MySource {
//! #     fn parse_packet(&mut self) -> pgstream::Result<Option<pgstream::packet::Packet>> {
//! #         Ok(None)
//! #     }
//! # }
//! # impl pgstream::helper::Helper for MyHelper {}
//! # fn main() -> pgstream::Result<()> {
//! let mut source = MySource;
//! let mut helper = MyHelper;
//! let opt = Options::default();
//! sequencer::process_packets(&mut helper, &opt, &mut source)?;
//! # Ok(()) }
//! ```

#![warn(missing_docs)]

// Public re-exports.
//
// We should provide public re-exports for any crate defining types
// that we use in our public API.  This allows downstream consumers to
// name the types without explicitly depending on the third-party
// crates.
pub use anyhow;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod types;
use crate::types::{
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
};

pub mod packet;
#[doc(inline)]
pub use packet::Packet;

pub mod crypto;
pub mod filter;
pub mod armor;

mod keyblock;
pub use keyblock::Keyblock;

pub mod status;
pub use status::StatusCode;

pub mod helper;
#[doc(inline)]
pub use helper::{Helper, PacketSource};

pub mod sequencer;
pub(crate) mod tree;

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors used in this crate.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An input line exceeded the armor line limit.
    #[error("Line longer than the armor limit of {0} bytes")]
    LineTooLong(usize),

    /// A line ended before its framing was complete.
    #[error("Incomplete line: {0}")]
    IncompleteLine(String),

    /// Any armor-level structural or CRC failure.
    #[error("Invalid armor: {0}")]
    InvalidArmor(String),

    /// A malformed packet; the stream is abandoned.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// A packet type that is forbidden in the current processing mode.
    #[error("Unexpected packet: {0}")]
    UnexpectedPacket(packet::Tag),

    /// Unsupported public key algorithm identifier.
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(PublicKeyAlgorithm),

    /// Unsupported hash algorithm identifier.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// A signature class this implementation cannot check.
    #[error("Unsupported signature class: {0}")]
    UnsupportedSignatureClass(SignatureType),

    /// The secret key needed for decryption is not available.
    #[error("Secret key not available")]
    NoSecretKey,

    /// The public key needed for verification is not available.
    #[error("Public key not found")]
    NoPublicKey,

    /// The signature did not verify.
    #[error("Bad signature: {0}")]
    BadSignature(String),

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
