//! Bootstrap of the cluster PKI.
//!
//! The actual key and certificate generation is left to a [`PkiHelper`]; this
//! module decides which certificates are missing and which names and
//! addresses the API server and etcd certificates have to be valid for.
use std::net::{AddrParseError, IpAddr, Ipv4Addr};

use snafu::{OptionExt, ResultExt, Snafu};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument};

use crate::{
    cloud::{self, EnvironmentRegistry},
    constants::{DEFAULT_INTERNAL_LB_STATIC_IP_OFFSET, DEFAULT_KUBERNETES_CLUSTER_DOMAIN},
    model::{CertificateCategory, CertificateProfile, ClusterModel, MasterProfile},
};

/// Common name of a freshly minted cluster CA.
pub const CA_COMMON_NAME: &str = "ca";

/// Errors of a [`PkiHelper`], which can be any error at all.
pub type PkiError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse first consecutive static IP {ip:?} of the masters"))]
    ParseFirstMasterIp { source: AddrParseError, ip: String },

    #[snafu(display("first consecutive static IP {ip} of the masters is not an IPv4 address"))]
    FirstMasterIpNotIpv4 { ip: IpAddr },

    #[snafu(display("failed to parse service CIDR {cidr:?}"))]
    ParseServiceCidr { cidr: String },

    #[snafu(display("failed to create the cluster CA"))]
    CreateCa { source: PkiError },

    #[snafu(display("failed to create the cluster certificates"))]
    CreatePki { source: PkiError },
}

/// A PEM encoded certificate and its PEM encoded private key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PemPair {
    pub certificate: String,
    pub private_key: String,
}

/// Everything a [`PkiHelper`] needs to issue the cluster certificates.
#[derive(Clone, Copy, Debug)]
pub struct PkiRequest<'a> {
    /// The CA signing every certificate.
    pub ca: &'a PemPair,

    pub cluster_domain: &'a str,

    /// DNS names the API server certificate is valid for, on top of the
    /// in-cluster service names.
    pub extra_fqdns: &'a [String],

    /// Addresses the API server and etcd certificates are valid for.
    pub extra_ips: &'a [IpAddr],

    /// One etcd peer certificate is issued per master.
    pub master_count: usize,

    pub key_size: usize,
}

/// Certificates issued by a [`PkiHelper`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PkiBundle {
    pub api_server: PemPair,
    pub client: PemPair,
    pub kube_config: PemPair,
    pub etcd_server: PemPair,
    pub etcd_client: PemPair,
    pub etcd_peers: Vec<PemPair>,
}

/// Creates the keys and certificates of a cluster.
pub trait PkiHelper {
    /// Mints a self-signed CA.
    fn create_ca(&self, common_name: &str, key_size: usize) -> Result<PemPair, PkiError>;

    /// Issues the certificates of the control plane and etcd, signed by
    /// `request.ca`.
    fn create_pki(&self, request: &PkiRequest<'_>) -> Result<PkiBundle, PkiError>;
}

/// Outcome of [`bootstrap_certificates`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertBootstrap {
    /// Whether any certificate was generated.
    pub generated: bool,

    /// The IP SANs the certificates were issued for.
    pub san_ips: Vec<IpAddr>,
}

/// Generates every certificate category the user left incomplete.
///
/// Categories the user supplied completely are never replaced, not even when
/// the CA had to be minted.
#[instrument(name = "bootstrap_certificates", skip_all, fields(location = %model.location, key_size = key_size))]
pub fn bootstrap_certificates(
    model: &mut ClusterModel,
    registry: &EnvironmentRegistry,
    pki: &dyn PkiHelper,
    key_size: usize,
) -> Result<CertBootstrap> {
    let Some(master) = model.properties.master_profile.as_ref() else {
        return Ok(CertBootstrap::default());
    };
    let master_count = master.count as usize;

    let existing = model.properties.certificate_profile.clone().unwrap_or_default();
    let incomplete: Vec<CertificateCategory> = CertificateCategory::iter()
        .filter(|category| !existing.is_complete(*category, master_count))
        .collect();
    if incomplete.is_empty() {
        return Ok(CertBootstrap::default());
    }

    let fqdns = san_fqdns(model, registry);
    let san_ips = san_ips(
        master,
        &model.properties.kubernetes_config().service_cidr,
        model.properties.is_ipv6_dual_stack(),
    )?;

    let ca = if incomplete.contains(&CertificateCategory::Ca) {
        info!("minting a new cluster CA");
        pki.create_ca(CA_COMMON_NAME, key_size)
            .context(CreateCaSnafu)?
    } else {
        PemPair {
            certificate: existing.ca_certificate.clone(),
            private_key: existing.ca_private_key.clone(),
        }
    };

    let bundle = pki
        .create_pki(&PkiRequest {
            ca: &ca,
            cluster_domain: DEFAULT_KUBERNETES_CLUSTER_DOMAIN,
            extra_fqdns: &fqdns,
            extra_ips: &san_ips,
            master_count,
            key_size,
        })
        .context(CreatePkiSnafu)?;

    let mut profile = existing;
    for category in &incomplete {
        debug!(%category, "storing generated certificates");
        store_category(&mut profile, *category, &ca, &bundle);
    }
    model.properties.certificate_profile = Some(profile);

    Ok(CertBootstrap {
        generated: true,
        san_ips,
    })
}

/// DNS SANs of the API server: its production FQDN in every location the
/// cluster can be reached in, the user's extra names and `localhost`.
pub fn san_fqdns(model: &ClusterModel, registry: &EnvironmentRegistry) -> Vec<String> {
    let properties = &model.properties;
    let dns_prefix = properties.dns_prefix();

    let mut fqdns: Vec<String> = cloud::locations(model)
        .iter()
        .map(|location| registry.prod_fqdn(dns_prefix, location, properties))
        .collect();
    if let Some(master) = &properties.master_profile {
        fqdns.extend(master.subject_alt_names.iter().cloned());
    }
    fqdns.push("localhost".to_owned());
    fqdns
}

/// IP SANs of the API server and etcd: the first master, loopback, the
/// internal load balancer, the remaining masters and the first address of the
/// service CIDR.
///
/// Only dual stack clusters may list several comma separated service CIDRs.
pub fn san_ips(master: &MasterProfile, service_cidr: &str, dual_stack: bool) -> Result<Vec<IpAddr>> {
    let first_master_ip = parse_first_master_ip(&master.first_consecutive_static_ip)?;
    let [a, b, c, d] = first_master_ip.octets();

    // The two topologies follow different conventions for the ILB address
    let internal_lb_ip = if master.is_virtual_machine_scale_sets() {
        Ipv4Addr::new(a, b, 255, DEFAULT_INTERNAL_LB_STATIC_IP_OFFSET)
    } else {
        Ipv4Addr::new(a, b, c, d.wrapping_add(DEFAULT_INTERNAL_LB_STATIC_IP_OFFSET))
    };

    let mut ips = vec![
        IpAddr::V4(first_master_ip),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V4(internal_lb_ip),
    ];

    let multiplier = if master.is_virtual_machine_scale_sets() {
        master.ip_address_count
    } else {
        1
    };
    let base = u32::from(first_master_ip);
    ips.extend(
        (1..master.count)
            .map(|index| Ipv4Addr::from(base.wrapping_add(index.wrapping_mul(multiplier))))
            .map(IpAddr::V4),
    );

    ips.push(first_service_ip(service_cidr, dual_stack)?);
    Ok(ips)
}

fn parse_first_master_ip(ip: &str) -> Result<Ipv4Addr> {
    match ip.trim().parse::<IpAddr>().context(ParseFirstMasterIpSnafu { ip })? {
        IpAddr::V4(ip) => Ok(ip),
        ip @ IpAddr::V6(_) => FirstMasterIpNotIpv4Snafu { ip }.fail(),
    }
}

/// The first usable address of the service CIDR. Dual stack clusters list
/// several CIDRs, of which the first one is used.
fn first_service_ip(service_cidr: &str, dual_stack: bool) -> Result<IpAddr> {
    let context = || ParseServiceCidrSnafu { cidr: service_cidr };

    let cidr = if dual_stack {
        service_cidr.split(',').next().unwrap_or_default()
    } else {
        service_cidr
    }
    .trim();
    let (address, prefix) = cidr.split_once('/').with_context(context)?;
    let address: IpAddr = address.parse().ok().with_context(context)?;
    let prefix: u32 = prefix.parse().ok().with_context(context)?;

    match address {
        IpAddr::V4(address) => {
            let mask = u32::MAX.checked_shl(32 - prefix.min(32)).unwrap_or(0);
            let network = u32::from(address) & mask;
            Ok(IpAddr::V4(Ipv4Addr::from(network.wrapping_add(1))))
        }
        IpAddr::V6(address) => {
            let mask = u128::MAX.checked_shl(128 - prefix.min(128)).unwrap_or(0);
            let network = u128::from(address) & mask;
            Ok(IpAddr::V6(network.wrapping_add(1).into()))
        }
    }
}

fn store_category(
    profile: &mut CertificateProfile,
    category: CertificateCategory,
    ca: &PemPair,
    bundle: &PkiBundle,
) {
    match category {
        CertificateCategory::Ca => {
            store_pair(&mut profile.ca_certificate, &mut profile.ca_private_key, ca);
        }
        CertificateCategory::ApiServer => store_pair(
            &mut profile.api_server_certificate,
            &mut profile.api_server_private_key,
            &bundle.api_server,
        ),
        CertificateCategory::Client => store_pair(
            &mut profile.client_certificate,
            &mut profile.client_private_key,
            &bundle.client,
        ),
        CertificateCategory::KubeConfig => store_pair(
            &mut profile.kube_config_certificate,
            &mut profile.kube_config_private_key,
            &bundle.kube_config,
        ),
        CertificateCategory::Etcd => {
            store_pair(
                &mut profile.etcd_server_certificate,
                &mut profile.etcd_server_private_key,
                &bundle.etcd_server,
            );
            store_pair(
                &mut profile.etcd_client_certificate,
                &mut profile.etcd_client_private_key,
                &bundle.etcd_client,
            );
            profile.etcd_peer_certificates =
                bundle.etcd_peers.iter().map(|peer| peer.certificate.clone()).collect();
            profile.etcd_peer_private_keys =
                bundle.etcd_peers.iter().map(|peer| peer.private_key.clone()).collect();
        }
    }
}

fn store_pair(certificate: &mut String, private_key: &mut String, pair: &PemPair) {
    pair.certificate.clone_into(certificate);
    pair.private_key.clone_into(private_key);
}
