use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// PEM encoded certificates and private keys of the cluster PKI.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_private_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_server_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_server_private_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_private_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_config_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_config_private_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub etcd_server_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub etcd_server_private_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub etcd_client_certificate: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub etcd_client_private_key: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub etcd_peer_certificates: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub etcd_peer_private_keys: Vec<String>,
}

/// Groups of certificates that are generated together.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[strum(serialize_all = "lowercase")]
pub enum CertificateCategory {
    Ca,
    ApiServer,
    Client,
    KubeConfig,
    Etcd,
}

impl CertificateProfile {
    /// A category is complete once every PEM field it consists of is set.
    /// The etcd category also needs one peer certificate and key per master.
    pub fn is_complete(&self, category: CertificateCategory, master_count: usize) -> bool {
        match category {
            CertificateCategory::Ca => both_set(&self.ca_certificate, &self.ca_private_key),
            CertificateCategory::ApiServer => {
                both_set(&self.api_server_certificate, &self.api_server_private_key)
            }
            CertificateCategory::Client => {
                both_set(&self.client_certificate, &self.client_private_key)
            }
            CertificateCategory::KubeConfig => {
                both_set(&self.kube_config_certificate, &self.kube_config_private_key)
            }
            CertificateCategory::Etcd => {
                both_set(&self.etcd_server_certificate, &self.etcd_server_private_key)
                    && both_set(&self.etcd_client_certificate, &self.etcd_client_private_key)
                    && self.etcd_peer_certificates.len() == master_count
                    && self.etcd_peer_private_keys.len() == master_count
                    && self.etcd_peer_certificates.iter().all(|pem| !pem.is_empty())
                    && self.etcd_peer_private_keys.iter().all(|pem| !pem.is_empty())
            }
        }
    }
}

fn both_set(certificate: &str, private_key: &str) -> bool {
    !certificate.is_empty() && !private_key.is_empty()
}
