//! Supported algorithms for **compression**, **encryption**, **integrity** and **key-exchange**.

use std::str::FromStr;

use ssh_packet::{arch::NameList, trans::KexInit};

use crate::{Error, Result};

mod cipher;
pub use cipher::Cipher;
pub(crate) use cipher::CipherState;

mod compress;
pub use compress::Compress;

mod hmac;
pub use hmac::Hmac;

pub(crate) mod kex;
pub use kex::Kex;

pub(crate) mod key;
pub use key::Key;

/// Negociate a shared algorithm between the `client`'s and `server`'s [`KexInit`]
/// from the point of view of `S` (which side's preference list is authoritative).
///
/// `S` is a marker type (typically [`crate::side::client::Client`] or
/// [`crate::side::server::Server`]) used to disambiguate the _direction_
/// a [`KexInit`]'s field applies to: encryption/mac/compression algorithms are
/// negociated independently per-direction, so e.g. `Hmac` implements this trait
/// once for each side.
pub(crate) trait Negociate<S = ()> {
    /// The error returned when no common algorithm can be found.
    const ERR: Error;

    /// Extract the relevant [`NameList`] from a [`KexInit`], for this side.
    fn field<'f>(kex: &'f KexInit) -> &'f NameList<'f>;

    /// Negociate the algorithm preferred by the client among those the server supports.
    fn negociate(i_c: &KexInit, i_s: &KexInit) -> Result<Self>
    where
        Self: Sized + FromStr,
    {
        Self::field(i_c)
            .preferred_in(Self::field(i_s))
            .ok_or(Self::ERR)?
            .parse()
            .map_err(|_| Self::ERR)
    }
}
