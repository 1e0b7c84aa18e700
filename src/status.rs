//! Machine-readable status codes.
//!
//! Wrapper programs drive interactive use through a stable,
//! line-oriented status protocol.  The core emits these codes through
//! [`crate::Helper::write_status`]; how they reach the wrapper (a
//! dedicated file descriptor, a pipe) is the caller's business.

use std::fmt;

/// A status code as written to the status channel.
///
/// The `Display` form is the stable wire name.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// A signature verified correctly.
    GoodSig,
    /// A signature did not verify.
    BadSig,
    /// A signature could not be checked at all.
    ErrSig,
    /// The armor layer was structurally invalid.
    BadArmor,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatusCode::GoodSig => f.write_str("GOODSIG"),
            StatusCode::BadSig => f.write_str("BADSIG"),
            StatusCode::ErrSig => f.write_str("ERRSIG"),
            StatusCode::BadArmor => f.write_str("BADARMOR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_stable() {
        assert_eq!(StatusCode::GoodSig.to_string(), "GOODSIG");
        assert_eq!(StatusCode::BadSig.to_string(), "BADSIG");
        assert_eq!(StatusCode::ErrSig.to_string(), "ERRSIG");
        assert_eq!(StatusCode::BadArmor.to_string(), "BADARMOR");
    }
}
