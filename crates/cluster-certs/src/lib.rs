//! RSA and X.509 implementation of the cluster PKI.
//!
//! [`RsaPkiHelper`] plugs into the certificate bootstrap of the defaulting
//! pipeline. It mints the cluster CA (see [`ca`]) and issues the API server,
//! client, kubeconfig and etcd certificates signed by it (see [`leaf`]).
//!
//! ## References
//!
//! - <https://datatracker.ietf.org/doc/html/rfc5280>
//! - <https://kubernetes.io/docs/setup/best-practices/certificates/>
use std::time::Duration;

use rsa::pkcs8::LineEnding;

pub mod ca;
pub mod keys;
pub mod leaf;
mod pki;

pub use pki::{Error, RsaPkiHelper};

/// Line ending of every PEM document produced by this crate.
pub const PEM_LINE_ENDING: LineEnding = LineEnding::LF;

/// Lifetime of the CA and of every certificate it issues, 30 years.
pub const DEFAULT_CERTIFICATE_VALIDITY: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);
