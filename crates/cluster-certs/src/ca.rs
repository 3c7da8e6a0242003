//! The self-signed CA all cluster certificates chain up to.
use rand::random;
use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};
use x509_cert::{
    Certificate,
    builder::{Builder, CertificateBuilder, Profile},
    der::{DecodePem, EncodePem, referenced::OwnedToRef},
    ext::pkix::AuthorityKeyIdentifier,
    name::Name,
    serial_number::SerialNumber,
    time::Validity,
};

use crate::{DEFAULT_CERTIFICATE_VALIDITY, PEM_LINE_ENDING, keys};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse validity"))]
    ParseValidity { source: x509_cert::der::Error },

    #[snafu(display("failed to parse {subject:?} as subject"))]
    ParseSubject {
        source: x509_cert::der::Error,
        subject: String,
    },

    #[snafu(display("failed to create signing key pair"))]
    CreateSigningKeyPair { source: keys::Error },

    #[snafu(display("failed to read the public key of the signing key pair"))]
    ReadPublicKey { source: keys::Error },

    #[snafu(display("failed to parse AuthorityKeyIdentifier"))]
    ParseAuthorityKeyIdentifier { source: x509_cert::der::Error },

    #[snafu(display("failed to create certificate builder"))]
    CreateCertificateBuilder { source: x509_cert::builder::Error },

    #[snafu(display("failed to add certificate extension"))]
    AddCertificateExtension { source: x509_cert::builder::Error },

    #[snafu(display("failed to build certificate"))]
    BuildCertificate { source: x509_cert::builder::Error },

    #[snafu(display("failed to decode CA certificate from PEM"))]
    DecodeCertificate { source: x509_cert::der::Error },

    #[snafu(display("failed to read CA private key"))]
    ReadPrivateKey { source: keys::Error },

    #[snafu(display("failed to encode CA certificate as PEM"))]
    EncodeCertificate { source: x509_cert::der::Error },

    #[snafu(display("failed to encode CA private key as PEM"))]
    EncodePrivateKey { source: keys::Error },
}

/// A CA certificate together with the key it signs with.
#[derive(Debug)]
pub struct CertificateAuthority {
    certificate: Certificate,
    signing_key: keys::SigningKey,
}

impl CertificateAuthority {
    /// Mints a self-signed CA named `CN={common_name}` with a fresh key of
    /// `key_size` bits.
    #[instrument(name = "create_certificate_authority")]
    pub fn new(common_name: &str, key_size: usize) -> Result<Self> {
        let signing_key = keys::SigningKey::new(key_size).context(CreateSigningKeyPairSnafu)?;
        Self::new_with_signing_key(common_name, signing_key)
    }

    /// Mints a self-signed CA named `CN={common_name}` signing with
    /// `signing_key`.
    pub fn new_with_signing_key(common_name: &str, signing_key: keys::SigningKey) -> Result<Self> {
        let validity = Validity::from_now(DEFAULT_CERTIFICATE_VALIDITY).context(ParseValiditySnafu)?;
        let subject = format!("CN={common_name}");
        let subject: Name = subject.parse().context(ParseSubjectSnafu { subject })?;

        // Random serials are unique for all practical purposes
        let serial_number = SerialNumber::from(random::<u64>());

        let spki = signing_key
            .subject_public_key_info()
            .context(ReadPublicKeySnafu)?;

        // The root profile adds BasicConstraints (CA = true), the
        // SubjectKeyIdentifier and KeyUsage with KeyCertSign and CRLSign, but
        // no AuthorityKeyIdentifier.
        let aki = AuthorityKeyIdentifier::try_from(spki.owned_to_ref())
            .context(ParseAuthorityKeyIdentifierSnafu)?;

        debug!(
            ca.subject = %subject,
            ca.not_after = %validity.not_after,
            ca.not_before = %validity.not_before,
            ca.serial = ?serial_number,
            "creating certificate authority"
        );
        let mut builder = CertificateBuilder::new(
            Profile::Root,
            serial_number,
            validity,
            subject,
            spki,
            signing_key.signing_key(),
        )
        .context(CreateCertificateBuilderSnafu)?;

        builder
            .add_extension(&aki)
            .context(AddCertificateExtensionSnafu)?;

        let certificate = builder.build().context(BuildCertificateSnafu)?;

        Ok(Self {
            certificate,
            signing_key,
        })
    }

    /// Loads an existing CA from its PEM encoded certificate and private key.
    #[instrument(name = "load_certificate_authority", skip_all)]
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self> {
        let certificate =
            Certificate::from_pem(certificate_pem.as_bytes()).context(DecodeCertificateSnafu)?;
        let signing_key = keys::SigningKey::from_pem(private_key_pem).context(ReadPrivateKeySnafu)?;

        Ok(Self {
            certificate,
            signing_key,
        })
    }

    /// Encodes the CA as PEM certificate and PEM private key.
    pub fn to_pem(&self) -> Result<(String, String)> {
        let certificate = self
            .certificate
            .to_pem(PEM_LINE_ENDING)
            .context(EncodeCertificateSnafu)?;
        let private_key = self.signing_key.to_pem().context(EncodePrivateKeySnafu)?;

        Ok((certificate, private_key.to_string()))
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn signing_key(&self) -> &keys::SigningKey {
        &self.signing_key
    }

    /// Name of the CA, used as the issuer of every certificate it signs.
    pub fn issuer_name(&self) -> &Name {
        &self.certificate.tbs_certificate.subject
    }

    pub fn validity(&self) -> &Validity {
        &self.certificate.tbs_certificate.validity
    }
}
