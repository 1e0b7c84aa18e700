//! Ordered packet trees.

use crate::packet::{Packet, Tag};

/// An ordered grouping of packets with implicit structure.
///
/// A keyblock is how OpenPGP transmits a tree as a flat sequence: the
/// first packet is the root (a primary key, a one-pass signature, or
/// an old-style signature), and the packets that follow are its
/// children in document order.  The sequencer assembles keyblocks;
/// the tree processor walks them.
#[derive(Clone, Debug, Default)]
pub struct Keyblock {
    nodes: Vec<Packet>,
}

impl Keyblock {
    /// Creates a keyblock rooted at `root`.
    pub fn new(root: Packet) -> Self {
        Keyblock { nodes: vec![root] }
    }

    /// Returns the root packet.
    ///
    /// # Panics
    ///
    /// Panics on a default-constructed, still empty block;
    /// [`Keyblock::new`] always installs a root.
    pub fn root(&self) -> &Packet {
        &self.nodes[0]
    }

    /// Appends a packet in document order.
    pub fn push(&mut self, packet: Packet) {
        self.nodes.push(packet);
    }

    /// Returns the number of packets, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the block holds no packets.
    ///
    /// Only a default-constructed block is empty; [`Keyblock::new`]
    /// always installs a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the packet at `index`.
    pub fn get(&self, index: usize) -> Option<&Packet> {
        self.nodes.get(index)
    }

    /// Iterates over the packets in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.nodes.iter()
    }

    /// Returns the index of the next packet with tag `tag` strictly
    /// after `index`.
    pub fn find_next(&self, index: usize, tag: Tag) -> Option<usize> {
        self.nodes.iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, p)| p.tag() == tag)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{OnePassSig, Signature, UserId};
    use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};

    fn sig(keyid: u64) -> Packet {
        Packet::Signature(Signature {
            version: 3,
            sig_class: SignatureType::Binary,
            timestamp: 0,
            keyid,
            pubkey_algo: PublicKeyAlgorithm::DSA,
            digest_algo: HashAlgorithm::SHA1,
            digest_start: [0; 2],
            mpis: vec![],
        })
    }

    #[test]
    fn find_next_walks_forward() {
        let mut kb = Keyblock::new(Packet::OnePassSig(OnePassSig {
            sig_class: SignatureType::Binary,
            digest_algo: HashAlgorithm::SHA1,
            pubkey_algo: PublicKeyAlgorithm::DSA,
            keyid: 1,
            last: true,
        }));
        kb.push(Packet::UserId(UserId { value: b"x".to_vec() }));
        kb.push(sig(1));
        kb.push(sig(2));

        assert_eq!(kb.find_next(0, Tag::Signature), Some(2));
        assert_eq!(kb.find_next(2, Tag::Signature), Some(3));
        assert_eq!(kb.find_next(3, Tag::Signature), None);
        assert_eq!(kb.find_next(0, Tag::PublicKey), None);
        assert_eq!(kb.len(), 4);
    }
}
