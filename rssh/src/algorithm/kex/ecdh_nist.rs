use digest::{Digest, FixedOutputReset};
use ring::{agreement, rand::SystemRandom};
use secrecy::{ExposeSecret, SecretBox};
use signature::{SignatureEncoding, Signer, Verifier};
use ssh_key::{PrivateKey, Signature};
use ssh_packet::{
    arch::MpInt,
    crypto::exchange,
    trans::{KexEcdhInit, KexEcdhReply, KexInit},
    Id,
};

use crate::{
    algorithm::{Cipher, Hmac},
    side::client::{verify, HostKeyVerifier},
    stream::{Keys, Stream},
    Error, Pipe, Result,
};

/// ECDH key-exchange over a NIST prime curve (RFC 5656), parameterized by
/// the hash used for the exchange hash (and for the shared-secret digest).
#[allow(clippy::too_many_arguments)]
pub async fn as_client<H: Digest + FixedOutputReset>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
    client_cipher: &Cipher,
    server_cipher: &Cipher,
    client_hmac: &Hmac,
    server_hmac: &Hmac,
    verifier: &HostKeyVerifier,
    curve: &'static agreement::Algorithm,
) -> Result<(Keys, Keys)> {
    let rng = SystemRandom::new();
    let e_c = agreement::EphemeralPrivateKey::generate(curve, &rng).map_err(|_| Error::KexError)?;
    let q_c = e_c.compute_public_key().map_err(|_| Error::KexError)?;

    stream
        .send(&KexEcdhInit {
            q_c: q_c.as_ref().into(),
        })
        .await?;

    let ecdh: KexEcdhReply = stream.recv().await?.to()?;
    let q_s = agreement::UnparsedPublicKey::new(curve, ecdh.q_s.as_ref().to_vec());

    let secret = agreement::agree_ephemeral(e_c, &q_s, Error::KexError, |material| {
        Ok(SecretBox::new(MpInt::positive(material).into()))
    })?;

    let k_s = ssh_key::PublicKey::from_bytes(&ecdh.k_s)?;

    verify(verifier, &k_s).await?;

    let hash = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: i_c.into(),
        i_s: i_s.into(),
        k_s: ecdh.k_s,
        q_c: q_c.as_ref().into(),
        q_s: ecdh.q_s,
        k: secret.expose_secret().as_borrow(),
    }
    .hash::<H>();

    Verifier::verify(&k_s, &hash, &Signature::try_from(ecdh.signature.as_ref())?)?;

    let session_id = stream.with_session(&hash);

    Ok((
        Keys::as_client::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            client_cipher,
            client_hmac,
        ),
        Keys::as_server::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            server_cipher,
            server_hmac,
        ),
    ))
}

#[allow(clippy::too_many_arguments)]
pub async fn as_server<H: Digest + FixedOutputReset>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
    client_cipher: &Cipher,
    server_cipher: &Cipher,
    client_hmac: &Hmac,
    server_hmac: &Hmac,
    key: &PrivateKey,
    curve: &'static agreement::Algorithm,
) -> Result<(Keys, Keys)> {
    let ecdh: KexEcdhInit = stream.recv().await?.to()?;

    let rng = SystemRandom::new();
    let e_s = agreement::EphemeralPrivateKey::generate(curve, &rng).map_err(|_| Error::KexError)?;
    let q_s = e_s.compute_public_key().map_err(|_| Error::KexError)?;

    let q_c = agreement::UnparsedPublicKey::new(curve, ecdh.q_c.as_ref().to_vec());

    let secret = agreement::agree_ephemeral(e_s, &q_c, Error::KexError, |material| {
        Ok(SecretBox::new(MpInt::positive(material).into()))
    })?;

    let k_s = key.public_key().to_bytes()?;

    let hash = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: i_c.into(),
        i_s: i_s.into(),
        k_s: k_s.as_slice().into(),
        q_c: ecdh.q_c,
        q_s: q_s.as_ref().into(),
        k: secret.expose_secret().as_borrow(),
    }
    .hash::<H>();

    let signature = Signer::sign(key, &hash);

    stream
        .send(&KexEcdhReply {
            k_s: k_s.into(),
            q_s: q_s.as_ref().into(),
            signature: signature.to_vec().into(),
        })
        .await?;

    let session_id = stream.with_session(&hash);

    Ok((
        Keys::as_client::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            client_cipher,
            client_hmac,
        ),
        Keys::as_server::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            server_cipher,
            server_hmac,
        ),
    ))
}
