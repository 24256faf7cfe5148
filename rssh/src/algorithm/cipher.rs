use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit as BlockKeyInit};
use cipher::KeyIvInit;
use ghash::{
    universal_hash::{KeyInit as UhKeyInit, UniversalHash},
    GHash,
};
use poly1305::Poly1305;
use ssh_packet::{arch::NameList, trans::KexInit};
use strum::{AsRefStr, EnumString};

use crate::{
    side::{client::Client, server::Server},
    Error, Result,
};

use super::Negociate;

// TODO: (optimization) Get rid of this Box<dyn> altogether.
pub type CipherState = Box<dyn std::any::Any + Send + Sync>;

/// A detached AEAD tag, kept as a plain array to avoid depending on any
/// single AEAD crate's `GenericArray` flavor across [`Cipher`] variants.
type Tag = [u8; 16];

impl Negociate<Client> for Cipher {
    const ERR: Error = Error::NoCommonCipher;

    fn field<'f>(kex: &'f KexInit) -> &'f NameList<'f> {
        &kex.encryption_algorithms_client_to_server
    }
}

impl Negociate<Server> for Cipher {
    const ERR: Error = Error::NoCommonCipher;

    fn field<'f>(kex: &'f KexInit) -> &'f NameList<'f> {
        &kex.encryption_algorithms_server_to_client
    }
}

/// SSH cipher algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Cipher {
    /// ChaCha20-Poly1305, as implemented by OpenSSH: a stream cipher and a
    /// one-time-key MAC, avoiding a dependency on AES-NI for constant-time operation.
    #[strum(serialize = "chacha20-poly1305@openssh.com")]
    Chacha20Poly1305,

    /// AES-256 in Galois/Counter Mode (GCM).
    #[strum(serialize = "aes256-gcm@openssh.com")]
    Aes256Gcm,

    /// AES-128 in Galois/Counter Mode (GCM).
    #[strum(serialize = "aes128-gcm@openssh.com")]
    Aes128Gcm,

    /// AES-256 in counter (CTR) mode.
    Aes256Ctr,

    /// AES-192 in counter (CTR) mode.
    Aes192Ctr,

    /// AES-128 in counter (CTR) mode.
    Aes128Ctr,

    /// AES-256 in cipher block chaining (CBC) mode.
    Aes256Cbc,

    /// AES-192 in cipher block chaining (CBC) mode.
    Aes192Cbc,

    /// AES-128 in cipher block chaining (CBC) mode.
    Aes128Cbc,

    /// TripleDES in cipher block chaining (CBC) mode.
    #[strum(serialize = "3des-cbc")]
    TDesCbc,

    /// No cipher algorithm.
    #[default]
    None,
}

impl Cipher {
    /// Whether this cipher is an AEAD construction, carrying its own
    /// integrity tag instead of relying on a negociated [`super::Hmac`].
    pub(crate) fn is_aead(&self) -> bool {
        matches!(
            self,
            Self::Chacha20Poly1305 | Self::Aes256Gcm | Self::Aes128Gcm
        )
    }

    /// This method is a hack to solve deduplication of the enum
    /// variants and to store the cipher states inside a dynamically
    /// typed `Box<dyn std::any::Any>`.
    fn state<'s, T: cipher::KeyIvInit + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
    ) -> &'s mut T {
        state
            .get_or_insert_with(|| {
                Box::new(T::new_from_slices(key, iv).expect("Key derivation failed horribly"))
            })
            .downcast_mut()
            .expect("State changed in the meanwhile")
    }

    fn ctr<C: ctr::cipher::StreamCipher>(cipher: &mut C, buffer: &mut [u8]) -> Result<Option<Tag>> {
        cipher
            .try_apply_keystream(buffer)
            .map_err(|_| Error::Cipher)?;

        Ok(None)
    }

    /// Builds the initial GCM counter block `J0 = iv || 0x00000001`, per RFC 5647,
    /// from a 12-byte invocation-counter IV.
    fn gcm_j0(iv: &[u8]) -> [u8; 16] {
        let mut j0 = [0u8; 16];
        j0[..12].copy_from_slice(&iv[..12.min(iv.len())]);
        j0[15] = 1;
        j0
    }

    fn gcm_counter_block(j0: [u8; 16]) -> [u8; 16] {
        let mut counter = j0;
        let mut n = u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]);
        n = n.wrapping_add(1);
        counter[12..].copy_from_slice(&n.to_be_bytes());
        counter
    }

    fn gcm_tag<B: BlockEncrypt + BlockKeyInit>(key: &[u8], j0: [u8; 16], buf: &[u8]) -> Tag {
        let block = B::new_from_slice(key).expect("Key derivation failed horribly");

        let mut h_block = GenericArray::default();
        block.encrypt_block(&mut h_block);
        let mut ghash = GHash::new(&h_block);
        ghash.update_padded(buf);

        let mut lenblock = GenericArray::default();
        lenblock[8..].copy_from_slice(&((buf.len() as u64) * 8).to_be_bytes());
        ghash.update(&[lenblock]);

        let mut mask_block = GenericArray::clone_from_slice(&j0);
        block.encrypt_block(&mut mask_block);

        let ghash_tag = ghash.finalize();
        let mut tag = [0u8; 16];
        for ((t, h), m) in tag.iter_mut().zip(ghash_tag.iter()).zip(mask_block.iter()) {
            *t = h ^ m;
        }

        tag
    }

    pub(crate) fn encrypt(
        &mut self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        buffer: &mut [u8],
    ) -> Result<Option<Tag>> {
        fn cbc<C: cbc::cipher::BlockEncryptMut>(
            cipher: &mut C,
            buffer: &mut [u8],
        ) -> Result<Option<Tag>> {
            use cbc::cipher::inout;

            let data = inout::InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::Cipher)?;

            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::Cipher)?;

            cipher.encrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.encrypt_block_inout_mut(block);
            }

            Ok(None)
        }

        match self {
            Self::Chacha20Poly1305 => {
                use chacha20::cipher::{KeyIvInit as _, StreamCipher, StreamCipherSeek};

                let mut keystream =
                    chacha20::ChaCha20::new_from_slices(&key[..32], &[0u8; 12]).map_err(|_| Error::Cipher)?;
                keystream.seek(64u32);
                keystream
                    .try_apply_keystream(buffer)
                    .map_err(|_| Error::Cipher)?;
                Ok(None)
            }
            Self::Aes256Gcm => {
                use ctr::cipher::StreamCipher;

                let j0 = Self::gcm_j0(iv);
                let ctr_block = Self::gcm_counter_block(j0);
                let mut cipher = ctr::Ctr32BE::<aes::Aes256>::new_from_slices(key, &ctr_block)
                    .map_err(|_| Error::Cipher)?;
                cipher.try_apply_keystream(buffer).map_err(|_| Error::Cipher)?;
                Ok(None)
            }
            Self::Aes128Gcm => {
                use ctr::cipher::StreamCipher;

                let j0 = Self::gcm_j0(iv);
                let ctr_block = Self::gcm_counter_block(j0);
                let mut cipher = ctr::Ctr32BE::<aes::Aes128>::new_from_slices(key, &ctr_block)
                    .map_err(|_| Error::Cipher)?;
                cipher.try_apply_keystream(buffer).map_err(|_| Error::Cipher)?;
                Ok(None)
            }
            Self::Aes256Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::Aes256Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::TDesCbc => cbc(
                Self::state::<cbc::Encryptor<des::TdesEde3>>(state, key, iv),
                buffer,
            ),
            Self::None => Ok(None),
        }
    }

    pub(crate) fn decrypt(
        &mut self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        buffer: &mut [u8],
    ) -> Result<Option<Tag>> {
        fn cbc<C: cbc::cipher::BlockDecryptMut>(
            cipher: &mut C,
            buffer: &mut [u8],
        ) -> Result<Option<Tag>> {
            use cbc::cipher::inout;

            let data = inout::InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::Cipher)?;

            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::Cipher)?;

            cipher.decrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.decrypt_block_inout_mut(block);
            }

            Ok(None)
        }

        match self {
            // The GCTR/ChaCha20 keystreams are their own inverse.
            Self::Chacha20Poly1305 | Self::Aes256Gcm | Self::Aes128Gcm => {
                self.encrypt(state, key, iv, buffer)
            }
            // In CTR mode, encryption and decryption are the same.
            Self::Aes256Ctr | Self::Aes192Ctr | Self::Aes128Ctr => {
                self.encrypt(state, key, iv, buffer)
            }
            Self::Aes256Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::TDesCbc => cbc(
                Self::state::<cbc::Decryptor<des::TdesEde3>>(state, key, iv),
                buffer,
            ),
            Self::None => Ok(None),
        }
    }

    /// Compute the integrity tag for an AEAD cipher over the already-encrypted
    /// `buf`, used in place of an `Hmac` when [`Cipher::is_aead`].
    pub(crate) fn seal_aead(&self, key: &[u8], iv: &[u8], buf: &[u8]) -> Vec<u8> {
        match self {
            Self::Chacha20Poly1305 => {
                use chacha20::cipher::{KeyIvInit as _, StreamCipher};

                let mut block0 = [0u8; 64];
                let mut keystream = chacha20::ChaCha20::new_from_slices(&key[..32], &[0u8; 12])
                    .expect("Key derivation failed horribly");
                keystream.apply_keystream(&mut block0);

                Poly1305::new(GenericArray::from_slice(&block0[..32]))
                    .compute_unpadded(buf)
                    .as_slice()
                    .to_vec()
            }
            Self::Aes256Gcm => Self::gcm_tag::<aes::Aes256>(key, Self::gcm_j0(iv), buf).to_vec(),
            Self::Aes128Gcm => Self::gcm_tag::<aes::Aes128>(key, Self::gcm_j0(iv), buf).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Verify the integrity tag for an AEAD cipher over `buf`, used in place
    /// of an `Hmac` when [`Cipher::is_aead`].
    pub(crate) fn open_aead(&self, key: &[u8], iv: &[u8], buf: &[u8], tag: &[u8]) -> Result<()> {
        let expected = self.seal_aead(key, iv, buf);

        if expected.as_slice() == tag {
            Ok(())
        } else {
            Err(Error::Cipher)
        }
    }

    pub(crate) fn block_size(&self) -> usize {
        match self {
            Self::None | Self::TDesCbc { .. } => 8,
            Self::Chacha20Poly1305 { .. } => 8,
            Self::Aes128Cbc { .. }
            | Self::Aes192Cbc { .. }
            | Self::Aes256Cbc { .. }
            | Self::Aes128Ctr { .. }
            | Self::Aes192Ctr { .. }
            | Self::Aes256Ctr { .. }
            | Self::Aes256Gcm { .. }
            | Self::Aes128Gcm { .. } => 16,
        }
    }

    pub(crate) fn key_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes128Cbc { .. } | Self::Aes128Ctr { .. } | Self::Aes128Gcm { .. } => 16,
            Self::TDesCbc { .. } | Self::Aes192Cbc { .. } | Self::Aes192Ctr { .. } => 24,
            Self::Aes256Cbc { .. } | Self::Aes256Ctr { .. } | Self::Aes256Gcm { .. } => 32,
            // Two independent 256-bit ChaCha20 keys: payload + one-time MAC derivation.
            Self::Chacha20Poly1305 => 64,
        }
    }

    pub(crate) fn iv_size(&self) -> usize {
        match self {
            Self::None | Self::Chacha20Poly1305 => 0,
            Self::TDesCbc { .. } => 8,
            Self::Aes128Cbc { .. }
            | Self::Aes192Cbc { .. }
            | Self::Aes256Cbc { .. }
            | Self::Aes128Ctr { .. }
            | Self::Aes192Ctr { .. }
            | Self::Aes256Ctr { .. } => 16,
            // Fixed (4 bytes) + invocation-counter (8 bytes) per RFC 5647.
            Self::Aes256Gcm { .. } | Self::Aes128Gcm { .. } => 12,
        }
    }
}
