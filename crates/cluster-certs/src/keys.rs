//! RSA keys used to sign the cluster CA and bound to leaf certificates.
//!
//! It should be noted, that the `rsa` crate is currently vulnerable to the
//! Marvin attack. See:
//!
//! - <https://people.redhat.com/~hkario/marvin/>
//! - <https://rustsec.org/advisories/RUSTSEC-2023-0071.html>
use rand_core::{CryptoRngCore, OsRng};
use rsa::{
    RsaPrivateKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    pkcs8::{DecodePrivateKey, EncodePublicKey},
};
use signature::Keypair;
use snafu::{ResultExt, Snafu};
use tracing::instrument;
use x509_cert::{der::DecodePem, spki::SubjectPublicKeyInfoOwned};
use zeroize::Zeroizing;

use crate::PEM_LINE_ENDING;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create {key_size} bit RSA key"))]
    CreateKey { source: rsa::Error, key_size: usize },

    #[snafu(display("failed to deserialize the private key from PEM-encoded PKCS1 or PKCS8"))]
    DeserializePrivateKey { source: rsa::pkcs8::Error },

    #[snafu(display("failed to serialize the private key as PEM-encoded PKCS1"))]
    SerializePrivateKey { source: rsa::pkcs1::Error },

    #[snafu(display("failed to serialize public key as PEM"))]
    SerializePublicKey { source: x509_cert::spki::Error },

    #[snafu(display("failed to decode SPKI from PEM"))]
    DecodeSpkiFromPem { source: x509_cert::der::Error },
}

/// An RSA key signing with PKCS#1 v1.5 and SHA-256.
#[derive(Debug)]
pub struct SigningKey {
    private_key: RsaPrivateKey,
    signing_key: rsa::pkcs1v15::SigningKey<sha2::Sha256>,
}

impl SigningKey {
    /// Generates a new RSA key of `key_size` bits with the default
    /// random-number generator [`OsRng`].
    ///
    /// Generating a `4096` bit key can take multiple seconds.
    #[instrument(name = "create_rsa_signing_key")]
    pub fn new(key_size: usize) -> Result<Self> {
        let mut csprng = OsRng;
        Self::new_with_rng(&mut csprng, key_size)
    }

    #[instrument(name = "create_rsa_signing_key_custom_rng", skip(rng))]
    pub fn new_with_rng<Rng>(rng: &mut Rng, key_size: usize) -> Result<Self>
    where
        Rng: CryptoRngCore + ?Sized,
    {
        let private_key = RsaPrivateKey::new(rng, key_size).context(CreateKeySnafu { key_size })?;
        Ok(Self::from_private_key(private_key))
    }

    /// Reads a PEM encoded private key, in either the PKCS#1
    /// (`RSA PRIVATE KEY`) or the PKCS#8 (`PRIVATE KEY`) format.
    #[instrument(name = "create_rsa_signing_key_from_pem", skip_all)]
    pub fn from_pem(input: &str) -> Result<Self> {
        let private_key = match RsaPrivateKey::from_pkcs1_pem(input) {
            Ok(private_key) => private_key,
            Err(_) => RsaPrivateKey::from_pkcs8_pem(input).context(DeserializePrivateKeySnafu)?,
        };
        Ok(Self::from_private_key(private_key))
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let signing_key = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(private_key.clone());
        Self {
            private_key,
            signing_key,
        }
    }

    /// Encodes the private key as PKCS#1 PEM.
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        self.private_key
            .to_pkcs1_pem(PEM_LINE_ENDING)
            .context(SerializePrivateKeySnafu)
    }

    pub fn signing_key(&self) -> &rsa::pkcs1v15::SigningKey<sha2::Sha256> {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> rsa::pkcs1v15::VerifyingKey<sha2::Sha256> {
        self.signing_key.verifying_key()
    }

    /// The public half of the key, ready to be embedded into a certificate.
    pub fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki_pem = self
            .verifying_key()
            .to_public_key_pem(PEM_LINE_ENDING)
            .context(SerializePublicKeySnafu)?;

        SubjectPublicKeyInfoOwned::from_pem(spki_pem.as_bytes()).context(DecodeSpkiFromPemSnafu)
    }
}
