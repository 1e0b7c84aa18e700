//! Cryptographic hash contexts and key material containers.
//!
//! This module provides [`Context`], a hash function context that is
//! independent of the concrete digest implementation, and
//! [`DigestSet`], the multi-hash context used when the set of
//! signature algorithms is not yet known (a one-pass group may
//! declare several).  Bulk ciphers and public key operations are the
//! collaborators' business; only the digest side lives here because
//! the clearsign canonicalization rules require the pipeline itself
//! to feed the hashes.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> pgstream::Result<()> {
//! use pgstream::types::HashAlgorithm;
//!
//! let mut ctx = HashAlgorithm::SHA1.context()?;
//! ctx.update(b"The quick brown fox jumps over the lazy dog");
//! let digest = ctx.into_digest()?;
//! assert_eq!(digest.len(), 20);
//! # Ok(()) }
//! ```

use std::fmt;

use dyn_clone::DynClone;
use zeroize::Zeroize;

use crate::Error;
use crate::Result;
use crate::types::{HashAlgorithm, SymmetricAlgorithm};

/// Hasher capable of calculating a digest for the input byte stream.
///
/// This provides an abstract interface to the hash functions used in
/// OpenPGP, so that the rest of the crate does not depend on the
/// concrete digest types.
pub(crate) trait Digest: DynClone + Send + Sync {
    /// Writes data into the hash function.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function context.  `digest` must be at least
    /// `digest_size()` bytes large, otherwise the digest will be
    /// truncated.
    fn digest(&mut self, digest: &mut [u8]) -> Result<()>;
}

dyn_clone::clone_trait_object!(Digest);

#[derive(Clone)]
struct Hasher<T>(T);

impl<T> Digest for Hasher<T>
where
    T: digest::Digest + digest::FixedOutputReset + Clone + Send + Sync,
{
    fn update(&mut self, data: &[u8]) {
        <T as digest::Digest>::update(&mut self.0, data);
    }

    fn digest(&mut self, digest: &mut [u8]) -> Result<()> {
        let d = <T as digest::Digest>::finalize_reset(&mut self.0);
        let d = d.as_slice();
        let n = std::cmp::min(digest.len(), d.len());
        digest[..n].copy_from_slice(&d[..n]);
        Ok(())
    }
}

/// A hash algorithm context.
#[derive(Clone)]
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn Digest>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context").field("algo", &self.algo).finish()
    }
}

impl Context {
    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes.
    pub fn digest_size(&self) -> usize {
        self.algo.digest_size()
            .expect("we only create Contexts for known hash algos")
    }

    /// Writes data into the hash function.
    pub fn update(&mut self, data: &[u8]) {
        self.ctx.update(data)
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function context.  `digest` must be at least
    /// `self.digest_size()` bytes large, otherwise the digest will be
    /// truncated.
    pub fn digest(&mut self, digest: &mut [u8]) -> Result<()> {
        self.ctx.digest(digest)
    }

    /// Finalizes the hash function and computes the digest.
    pub fn into_digest(mut self) -> Result<Vec<u8>> {
        let mut digest = vec![0u8; self.digest_size()];
        self.digest(&mut digest)?;
        Ok(digest)
    }
}

impl HashAlgorithm {
    /// Returns whether this algorithm has a backing implementation.
    pub fn is_supported(&self) -> bool {
        use HashAlgorithm::*;
        matches!(self, MD5 | SHA1 | RipeMD | Tiger)
    }

    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedHashAlgorithm`] if there is no
    /// backing implementation.
    pub fn context(self) -> Result<Context> {
        let ctx: Box<dyn Digest> = match self {
            HashAlgorithm::MD5 =>
                Box::new(Hasher(md5::Md5::default())),
            HashAlgorithm::SHA1 =>
                Box::new(Hasher(sha1::Sha1::default())),
            HashAlgorithm::RipeMD =>
                Box::new(Hasher(ripemd::Ripemd160::default())),
            HashAlgorithm::Tiger =>
                Box::new(Hasher(tiger::Tiger::default())),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                return Err(Error::UnsupportedHashAlgorithm(self).into()),
        };
        Ok(Context { algo: self, ctx })
    }
}

/// A set of live hash contexts fed in lockstep.
///
/// When data arrives before the signatures that cover it, every
/// algorithm declared by a preceding one-pass packet must be hashed
/// simultaneously.  Cloning the set yields independent contexts, so a
/// per-signature copy can be finalized without disturbing the stream
/// hash.
#[derive(Clone, Debug, Default)]
pub struct DigestSet {
    hashes: Vec<Context>,
}

impl DigestSet {
    /// Returns an empty set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Enables `algo`.  Enabling an algorithm twice is not an error.
    pub fn enable(&mut self, algo: HashAlgorithm) -> Result<()> {
        if self.hashes.iter().any(|c| c.algo() == algo) {
            return Ok(());
        }
        self.hashes.push(algo.context()?);
        Ok(())
    }

    /// Writes data into every enabled hash function.
    pub fn update(&mut self, data: &[u8]) {
        for ctx in &mut self.hashes {
            ctx.update(data);
        }
    }

    /// Returns the context for `algo`, if enabled.
    pub fn context(&self, algo: HashAlgorithm) -> Option<&Context> {
        self.hashes.iter().find(|c| c.algo() == algo)
    }

    /// Returns a finalizable copy of the context for `algo`.
    pub fn copy_context(&self, algo: HashAlgorithm) -> Option<Context> {
        self.context(algo).cloned()
    }

    /// Returns the enabled algorithms.
    pub fn algos(&self) -> impl Iterator<Item = HashAlgorithm> + '_ {
        self.hashes.iter().map(|c| c.algo())
    }

    /// Returns whether no algorithm is enabled.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// A data encryption key for symmetric bulk decryption.
///
/// The key bytes are secret material; they are zeroized when the
/// `Dek` is dropped.
pub struct Dek {
    /// The cipher this key is for.
    pub algo: SymmetricAlgorithm,
    key: Vec<u8>,
}

impl Dek {
    /// Wraps raw key material.
    pub fn new(algo: SymmetricAlgorithm, key: Vec<u8>) -> Self {
        Dek { algo, key }
    }

    /// Returns the raw key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for Dek {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for Dek {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Dek")
            .field("algo", &self.algo)
            .field("key", &"[redacted]")
            .finish()
    }
}

/// A string-to-key specifier.
///
/// Carried by symmetric session key packets; interpreted by the
/// collaborator that derives the [`Dek`] from a passphrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S2k {
    /// The S2K mode: 0 simple, 1 salted, 3 iterated and salted.
    pub mode: u8,
    /// The hash algorithm to run the passphrase through.
    pub hash_algo: HashAlgorithm,
    /// The salt, for modes 1 and 3.
    pub salt: [u8; 8],
    /// The iteration count, for mode 3.
    pub count: u32,
}

/// A multi-precision integer.
///
/// Stored as a big-endian magnitude without the OpenPGP bit-length
/// prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Mpi {
    value: Vec<u8>,
}

impl Mpi {
    /// Wraps a big-endian magnitude.
    pub fn new(value: Vec<u8>) -> Self {
        Mpi { value }
    }

    /// Returns the magnitude bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the number of significant bits.
    pub fn bits(&self) -> usize {
        for (i, &b) in self.value.iter().enumerate() {
            if b != 0 {
                return (self.value.len() - i - 1) * 8
                    + (8 - b.leading_zeros() as usize);
            }
        }
        0
    }
}

impl fmt::Debug for Mpi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Mpi({} bits)", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hexdigest(algo: HashAlgorithm, data: &[u8]) -> String {
        let mut ctx = algo.context().unwrap();
        ctx.update(data);
        hex::encode(ctx.into_digest().unwrap())
    }

    #[test]
    fn known_vectors() {
        assert_eq!(hexdigest(HashAlgorithm::MD5, b"abc"),
                   "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(hexdigest(HashAlgorithm::SHA1, b"abc"),
                   "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(hexdigest(HashAlgorithm::RipeMD, b"abc"),
                   "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc");
    }

    #[test]
    fn chunked_update_matches_single() {
        for algo in HashAlgorithm::variants() {
            let mut one = algo.context().unwrap();
            one.update(b"hello world");
            let mut two = algo.context().unwrap();
            two.update(b"hello");
            two.update(b" world");
            assert_eq!(one.into_digest().unwrap(),
                       two.into_digest().unwrap(),
                       "{}", algo);
        }
    }

    #[test]
    fn digest_set_copies_are_independent() {
        let mut md = DigestSet::new();
        md.enable(HashAlgorithm::SHA1).unwrap();
        md.enable(HashAlgorithm::SHA1).unwrap();
        md.enable(HashAlgorithm::MD5).unwrap();
        assert_eq!(md.algos().count(), 2);

        md.update(b"signed ");
        let copy = md.copy_context(HashAlgorithm::SHA1).unwrap();
        md.update(b"data");

        let direct = {
            let mut ctx = HashAlgorithm::SHA1.context().unwrap();
            ctx.update(b"signed ");
            ctx.into_digest().unwrap()
        };
        assert_eq!(copy.into_digest().unwrap(), direct);

        let full = md.copy_context(HashAlgorithm::SHA1).unwrap()
            .into_digest().unwrap();
        let expect = {
            let mut ctx = HashAlgorithm::SHA1.context().unwrap();
            ctx.update(b"signed data");
            ctx.into_digest().unwrap()
        };
        assert_eq!(full, expect);
    }

    #[test]
    fn unsupported_algo_is_an_error() {
        assert!(HashAlgorithm::Unknown(42).context().is_err());
        let mut md = DigestSet::new();
        assert!(md.enable(HashAlgorithm::Private(100)).is_err());
    }

    #[test]
    fn dek_debug_is_redacted() {
        let dek = Dek::new(SymmetricAlgorithm::CAST5, vec![1, 2, 3]);
        let s = format!("{:?}", dek);
        assert!(s.contains("redacted"));
        assert!(!s.contains("[1, 2, 3]"));
    }

    #[test]
    fn mpi_bits() {
        assert_eq!(Mpi::new(vec![]).bits(), 0);
        assert_eq!(Mpi::new(vec![0, 0]).bits(), 0);
        assert_eq!(Mpi::new(vec![1]).bits(), 1);
        assert_eq!(Mpi::new(vec![0x80]).bits(), 8);
        assert_eq!(Mpi::new(vec![0, 0x05, 0xff]).bits(), 11);
    }
}
