use cluster_defaults::certs::{PemPair, PkiBundle, PkiError, PkiHelper, PkiRequest};
use snafu::{ResultExt, Snafu};
use tracing::{info, instrument};

use crate::{
    ca::{self, CertificateAuthority},
    leaf::{self, IssuedCertificate, LeafRequest, Usage},
};

const APISERVER_COMMON_NAME: &str = "apiserver";
const CLIENT_COMMON_NAME: &str = "client";
const CLIENT_ORGANIZATION: &str = "system:masters";
const ETCD_SERVER_COMMON_NAME: &str = "etcdserver";
const ETCD_CLIENT_COMMON_NAME: &str = "etcdclient";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create the cluster CA"))]
    CreateCa { source: ca::Error },

    #[snafu(display("failed to load the cluster CA"))]
    LoadCa { source: ca::Error },

    #[snafu(display("failed to encode the cluster CA"))]
    EncodeCa { source: ca::Error },

    #[snafu(display("failed to issue the {common_name:?} certificate"))]
    IssueCertificate {
        source: leaf::Error,
        common_name: String,
    },
}

/// Issues the cluster certificates with RSA keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct RsaPkiHelper;

impl RsaPkiHelper {
    pub fn new() -> Self {
        Self
    }

    #[instrument(name = "create_cluster_pki", skip_all, fields(masters = request.master_count))]
    fn issue_all(request: &PkiRequest<'_>) -> Result<PkiBundle> {
        let ca = CertificateAuthority::from_pem(&request.ca.certificate, &request.ca.private_key)
            .context(LoadCaSnafu)?;

        let api_server_dns_names = api_server_dns_names(request.cluster_domain, request.extra_fqdns);
        let issue = |common_name: &str, organization, dns_names: &[String], usage| {
            leaf::issue(
                &ca,
                &LeafRequest {
                    common_name,
                    organization,
                    dns_names,
                    ip_addresses: request.extra_ips,
                    usage,
                    key_size: request.key_size,
                },
            )
            .map(pem_pair)
            .context(IssueCertificateSnafu { common_name })
        };

        let api_server = issue(APISERVER_COMMON_NAME, None, &api_server_dns_names, Usage::Server)?;
        let client = issue(CLIENT_COMMON_NAME, Some(CLIENT_ORGANIZATION), &[], Usage::Client)?;
        let kube_config = issue(CLIENT_COMMON_NAME, Some(CLIENT_ORGANIZATION), &[], Usage::Client)?;
        let etcd_server = issue(ETCD_SERVER_COMMON_NAME, None, &[], Usage::ServerAndClient)?;
        let etcd_client = issue(ETCD_CLIENT_COMMON_NAME, None, &[], Usage::ServerAndClient)?;
        let etcd_peers = (0..request.master_count)
            .map(|index| issue(&format!("etcdpeer{index}"), None, &[], Usage::ServerAndClient))
            .collect::<Result<Vec<_>>>()?;

        info!(
            pki.etcd_peers = etcd_peers.len(),
            "issued cluster certificates"
        );
        Ok(PkiBundle {
            api_server,
            client,
            kube_config,
            etcd_server,
            etcd_client,
            etcd_peers,
        })
    }
}

impl PkiHelper for RsaPkiHelper {
    fn create_ca(&self, common_name: &str, key_size: usize) -> Result<PemPair, PkiError> {
        let ca = CertificateAuthority::new(common_name, key_size).context(CreateCaSnafu)?;
        let (certificate, private_key) = ca.to_pem().context(EncodeCaSnafu)?;

        Ok(PemPair {
            certificate,
            private_key,
        })
    }

    fn create_pki(&self, request: &PkiRequest<'_>) -> Result<PkiBundle, PkiError> {
        Ok(Self::issue_all(request)?)
    }
}

/// The API server is reachable under the given FQDNs and the names of the
/// `kubernetes` service in the `default` and `kube-system` namespaces.
fn api_server_dns_names(cluster_domain: &str, extra_fqdns: &[String]) -> Vec<String> {
    let mut dns_names = extra_fqdns.to_vec();
    dns_names.push("kubernetes".to_owned());
    for namespace in ["default", "kube-system"] {
        dns_names.extend([
            format!("kubernetes.{namespace}"),
            format!("kubernetes.{namespace}.svc"),
            format!("kubernetes.{namespace}.svc.{cluster_domain}"),
        ]);
    }
    dns_names
}

fn pem_pair(issued: IssuedCertificate) -> PemPair {
    PemPair {
        certificate: issued.certificate_pem,
        private_key: issued.private_key_pem,
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use const_oid::db::rfc5280::ID_CE_SUBJECT_ALT_NAME;
    use x509_cert::{
        Certificate,
        der::{Decode, DecodePem},
        ext::pkix::{SubjectAltName, name::GeneralName},
        name::Name,
    };

    use super::*;

    const KEY_SIZE: usize = 512;

    fn certificate(pair: &PemPair) -> Certificate {
        Certificate::from_pem(pair.certificate.as_bytes()).expect("valid certificate")
    }

    fn subject_alt_names(certificate: &Certificate) -> SubjectAltName {
        let extension = certificate
            .tbs_certificate
            .extensions
            .as_ref()
            .expect("certificate has extensions")
            .iter()
            .find(|ext| ext.extn_id == ID_CE_SUBJECT_ALT_NAME)
            .expect("certificate has a SAN extension");
        SubjectAltName::from_der(extension.extn_value.as_bytes()).expect("valid SAN extension")
    }

    #[test]
    fn api_server_names() {
        let names = api_server_dns_names("cluster.local", &["mycluster.westus2.cloudapp.azure.com".to_owned()]);

        assert_eq!(
            names,
            [
                "mycluster.westus2.cloudapp.azure.com",
                "kubernetes",
                "kubernetes.default",
                "kubernetes.default.svc",
                "kubernetes.default.svc.cluster.local",
                "kubernetes.kube-system",
                "kubernetes.kube-system.svc",
                "kubernetes.kube-system.svc.cluster.local",
            ]
        );
    }

    #[test]
    fn creates_the_cluster_pki() {
        let helper = RsaPkiHelper::new();
        let ca = helper.create_ca("ca", KEY_SIZE).expect("CA is created");
        let extra_fqdns = vec!["localhost".to_owned()];
        let extra_ips: Vec<IpAddr> = vec![
            "10.240.255.5".parse().expect("valid IP"),
            "127.0.0.1".parse().expect("valid IP"),
        ];

        let bundle = helper
            .create_pki(&PkiRequest {
                ca: &ca,
                cluster_domain: "cluster.local",
                extra_fqdns: &extra_fqdns,
                extra_ips: &extra_ips,
                master_count: 3,
                key_size: KEY_SIZE,
            })
            .expect("certificates are issued");

        let ca_subject = certificate(&ca).tbs_certificate.subject;
        for pair in [&bundle.api_server, &bundle.client, &bundle.etcd_server, &bundle.etcd_peers[2]] {
            assert_eq!(certificate(pair).tbs_certificate.issuer, ca_subject);
        }
        assert_eq!(bundle.etcd_peers.len(), 3);
        assert_eq!(
            certificate(&bundle.etcd_peers[1]).tbs_certificate.subject,
            "CN=etcdpeer1".parse::<Name>().expect("valid name")
        );
        assert_eq!(
            certificate(&bundle.kube_config).tbs_certificate.subject,
            "CN=client,O=system:masters".parse::<Name>().expect("valid name")
        );
        assert_ne!(bundle.client, bundle.kube_config);

        let sans = subject_alt_names(&certificate(&bundle.api_server));
        assert!(sans.0.iter().any(|san| matches!(
            san,
            GeneralName::DnsName(name) if name.as_str() == "kubernetes.default.svc.cluster.local"
        )));
        let etcd_ips = subject_alt_names(&certificate(&bundle.etcd_server))
            .0
            .iter()
            .filter(|san| matches!(san, GeneralName::IpAddress(_)))
            .count();
        assert_eq!(etcd_ips, 2);
    }

    #[test]
    fn broken_ca_is_reported() {
        let broken = PemPair {
            certificate: "garbage".to_owned(),
            private_key: "garbage".to_owned(),
        };

        let error = RsaPkiHelper::new()
            .create_pki(&PkiRequest {
                ca: &broken,
                cluster_domain: "cluster.local",
                extra_fqdns: &[],
                extra_ips: &[],
                master_count: 1,
                key_size: KEY_SIZE,
            })
            .expect_err("CA cannot be loaded");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::LoadCa { .. })
        ));
    }
}
