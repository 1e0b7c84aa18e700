//! The tree processor.
//!
//! Walks an assembled [`Keyblock`] and drives what its root demands:
//! key-rooted trees are listed (and their signatures optionally
//! checked), one-pass and old-style signature trees are verified
//! against the streamed or detached data.

use crate::Error;
use crate::Result;
use crate::StatusCode;
use crate::crypto::DigestSet;
use crate::keyblock::Keyblock;
use crate::packet::{Packet, Signature, Tag};
use crate::sequencer::{Mode, Sequencer};
use crate::types::SignatureType;

fn datestr(timestamp: u32) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "????-??-??".into())
}

/// Processes the tree rooted at `list`.
pub(crate) fn proc_tree(seq: &mut Sequencer, list: &Keyblock)
                        -> Result<()> {
    match list.root() {
        Packet::PublicKey(_) | Packet::PublicSubkey(_)
        | Packet::SecretKey(_) => list_keyblock(seq, list),
        Packet::OnePassSig(_) => proc_onepass_group(seq, list),
        Packet::Signature(_) => proc_lone_signature(seq, list),
        other => {
            log::error!("proc_tree: invalid root packet of type {}",
                        other.tag());
            Ok(())
        }
    }
}

/// Checks one signature node.
///
/// For data signatures, hands a copy of the data digest to the
/// external verifier.  For key and certification signatures, the root
/// must be a public key; the external key checker reports whether the
/// signature is a self-signature.
fn do_check_sig(seq: &mut Sequencer, list: &Keyblock, sig_index: usize)
                -> Result<bool> {
    let sig = list.get(sig_index)
        .and_then(|p| p.signature())
        .ok_or_else(|| Error::InvalidOperation(
            "do_check_sig on a non-signature node".into()))?;

    let algo = sig.digest_algo;
    if u8::from(algo) == 0 || !algo.is_supported() {
        return Err(Error::UnsupportedHashAlgorithm(algo).into());
    }

    if sig.sig_class.is_data() {
        // Use a copy of the data digest; for a detached signature no
        // digest is live yet and the verifier starts from scratch.
        let md = if !seq.mfx.is_empty() {
            seq.mfx.clone()
        } else {
            DigestSet::new()
        };
        seq.helper.signature_check(sig, md)?;
        Ok(false)
    } else if sig.sig_class.is_key_binding() {
        match list.root() {
            Packet::PublicKey(_) | Packet::PublicSubkey(_) =>
                seq.helper.check_key_signature(list, sig_index),
            _ => {
                log::error!("invalid root packet for sigclass {:02x}",
                            u8::from(sig.sig_class));
                Err(Error::UnsupportedSignatureClass(sig.sig_class).into())
            }
        }
    } else {
        Err(Error::UnsupportedSignatureClass(sig.sig_class).into())
    }
}

/// Verifies one signature and reports the outcome.
///
/// Good and bad signatures go to the status channel and the log;
/// anything else is an ERRSIG.  A good signature still has to pass
/// the trust check.  In batch mode a bad signature or a trust failure
/// aborts the run.
fn check_sig_and_print(seq: &mut Sequencer, list: &Keyblock,
                       sig_index: usize) -> Result<()> {
    let sig = match list.get(sig_index).and_then(|p| p.signature()) {
        Some(sig) => sig.clone(),
        None => return Ok(()),
    };

    if seq.opt.skip_verify {
        log::info!("signature verification suppressed");
        return Ok(());
    }

    log::info!("Signature made {} using {} key ID {:08X}",
               datestr(sig.timestamp), sig.pubkey_algo,
               sig.keyid as u32);

    match do_check_sig(seq, list, sig_index) {
        Ok(_) => {
            seq.helper.write_status(StatusCode::GoodSig);
            log::info!("Good signature from key ID {:08X}",
                       sig.keyid as u32);
            if let Err(e) = seq.helper.check_signatures_trust(&sig) {
                log::error!("signature trust check failed: {}", e);
                if seq.opt.batch {
                    return Err(e);
                }
            }
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<Error>(),
                           Some(Error::BadSignature(_))) => {
            seq.helper.write_status(StatusCode::BadSig);
            log::error!("BAD signature from key ID {:08X}",
                        sig.keyid as u32);
            if seq.opt.batch {
                return Err(e);
            }
            Ok(())
        }
        Err(e) => {
            seq.helper.write_status(StatusCode::ErrSig);
            log::error!("Can't check signature: {}", e);
            Ok(())
        }
    }
}

/// Verifies a one-pass signature group.
///
/// If no literal data arrived in-band, the signed data is out of
/// band: hash the detached files, enabling every trailing signature's
/// digest algorithm first.  Then every trailing signature is checked.
fn proc_onepass_group(seq: &mut Sequencer, list: &Keyblock) -> Result<()> {
    if !seq.have_data {
        seq.mfx = DigestSet::new();
        let mut i = 0;
        while let Some(j) = list.find_next(i, Tag::Signature) {
            if let Some(sig) = list.get(j).and_then(|p| p.signature()) {
                if let Err(e) = seq.mfx.enable(sig.digest_algo) {
                    log::error!("can't hash with {}: {}",
                                sig.digest_algo, e);
                }
            }
            i = j;
        }

        let textmode = list.root().one_pass_sig()
            .map(|ops| ops.sig_class == SignatureType::Text)
            .unwrap_or(false);
        if let Err(e) = hash_detached(seq, textmode) {
            log::error!("can't hash datafile: {}", e);
            return Ok(());
        }
    }

    let mut i = 0;
    while let Some(j) = list.find_next(i, Tag::Signature) {
        check_sig_and_print(seq, list, j)?;
        i = j;
    }
    Ok(())
}

/// Verifies an old-style signature that roots its own tree.
fn proc_lone_signature(seq: &mut Sequencer, list: &Keyblock) -> Result<()> {
    let sig = match list.root().signature() {
        Some(sig) => sig.clone(),
        None => return Ok(()),
    };

    if !seq.have_data {
        seq.mfx = DigestSet::new();
        if let Err(e) = seq.mfx.enable(sig.digest_algo) {
            log::error!("can't hash with {}: {}", sig.digest_algo, e);
        }
        let textmode = sig.sig_class == SignatureType::Text;
        if let Err(e) = hash_detached(seq, textmode) {
            log::error!("can't hash datafile: {}", e);
            return Ok(());
        }
    } else {
        log::info!("old style signature");
    }

    check_sig_and_print(seq, list, 0)
}

fn hash_detached(seq: &mut Sequencer, textmode: bool) -> Result<()> {
    if seq.mode == Mode::SigsOnly {
        seq.helper.hash_datafiles(&mut seq.mfx, seq.signed_data,
                                  seq.sig_filename, textmode)
    } else {
        let filename = seq.filename.clone();
        seq.helper.ask_for_detached_datafile(&mut seq.mfx,
                                             filename.as_deref())
    }
}

/// Lists a key-rooted tree: the key, its user ids, its subkeys, and,
/// when enabled, its signatures.
fn list_keyblock(seq: &mut Sequencer, list: &Keyblock) -> Result<()> {
    for (index, node) in list.iter().enumerate() {
        match node {
            Packet::PublicKey(key) =>
                show_key_line(seq, "pub", key),
            Packet::PublicSubkey(key) =>
                show_key_line(seq, "sub", key),
            Packet::SecretKey(key) =>
                show_key_line(seq, "sec", key),
            Packet::SecretSubkey(key) =>
                show_key_line(seq, "ssb", key),
            Packet::UserId(uid) => {
                seq.helper.display(&format!("uid{:>25}{}", "", uid));
            }
            Packet::Signature(_) => {
                if seq.opt.list_sigs {
                    list_sig_node(seq, list, index)?;
                }
            }
            other =>
                log::error!("invalid node with packet of type {}",
                            other.tag()),
        }
    }
    Ok(())
}

fn show_key_line(seq: &mut Sequencer, prefix: &str,
                 key: &crate::packet::Key) {
    seq.helper.display(&format!(
        "{}  {:4}{}/{:08X} {}",
        prefix, key.nbits(), key.algo.letter(),
        key.keyid as u32, datestr(key.timestamp)));
}

/// Lists one signature node, classifying the check outcome as good
/// `!`, bad `-`, missing key `?`, or other error `%`.
fn list_sig_node(seq: &mut Sequencer, list: &Keyblock, sig_index: usize)
                 -> Result<()> {
    let sig = match list.get(sig_index).and_then(|p| p.signature()) {
        Some(sig) => sig.clone(),
        None => return Ok(()),
    };

    let revocation = matches!(sig.sig_class,
                              SignatureType::KeyRevocation
                              | SignatureType::CertificationRevocation);
    let tag = if revocation { "rev" } else { "sig" };

    let (sigrc, is_selfsig, error) = if seq.opt.check_sigs {
        match do_check_sig(seq, list, sig_index) {
            Ok(selfsig) => ('!', selfsig, None),
            Err(e) => {
                let c = match e.downcast_ref::<Error>() {
                    Some(Error::BadSignature(_)) => '-',
                    Some(Error::NoPublicKey) => '?',
                    _ => '%',
                };
                (c, false, Some(e))
            }
        }
    } else {
        let selfsig = selfsig_by_keyid(list, &sig);
        (' ', selfsig, None)
    };

    let note = match (&error, is_selfsig) {
        (Some(e), _) if sigrc == '%' => format!("[{}]", e),
        (_, true) if sig.sig_class == SignatureType::SubkeyBinding =>
            "[keybind]".into(),
        (_, true) => "[selfsig]".into(),
        _ => String::new(),
    };

    seq.helper.display(&format!(
        "{}{}       {:08X} {}   {}",
        tag, sigrc, sig.keyid as u32, datestr(sig.timestamp), note));
    Ok(())
}

/// Without checking the signature, a key id match against the root
/// key is the best self-signature indicator available.
fn selfsig_by_keyid(list: &Keyblock, sig: &Signature) -> bool {
    match list.root() {
        Packet::PublicKey(key) | Packet::SecretKey(key) =>
            key.keyid == sig.keyid,
        _ => false,
    }
}
