use ssh_packet::{arch::NameList, trans::KexInit};

use crate::Error;

use super::Negociate;

#[doc(no_inline)]
pub use ssh_key::Algorithm as Key;

impl Negociate for ssh_key::Algorithm {
    const ERR: Error = Error::NoCommonKey;

    fn field<'f>(kex: &'f KexInit) -> &'f NameList<'f> {
        &kex.server_host_key_algorithms
    }
}
