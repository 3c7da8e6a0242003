use super::merge;
use crate::{
    cloud::target_env,
    constants::*,
    feature_gates,
    flag_map::{FlagMap, drop_empty, flag_map, without_keys},
    model::Properties,
    version::{is_version_ge, parse_version},
};

const AUDIT_POLICY_FILE_FLAG: &str = "--audit-policy-file";
const ADMISSION_PLUGINS: &str = "NamespaceLifecycle,LimitRanger,ServiceAccount,DefaultStorageClass,DefaultTolerationSeconds,ValidatingAdmissionWebhook,ResourceQuota,ExtendedResourceToleration";

/// Resolves the `kube-apiserver` flags. `location` decides the OIDC issuer of
/// clusters using Azure Active Directory.
pub fn apiserver_flags(properties: &Properties, location: &str) -> FlagMap {
    let config = properties.kubernetes_config();
    let version = properties.orchestrator_version();

    let mut user = config.apiserver_config.clone();
    if user.get(AUDIT_POLICY_FILE_FLAG).map(String::as_str) == Some(LEGACY_AUDIT_POLICY_FILE) {
        user.remove(AUDIT_POLICY_FILE_FLAG);
    }

    let mut flags = merge(
        &user,
        &default_flags(properties, location),
        &static_flags(properties),
    );

    let mut unsupported = Vec::new();
    if !config.is_secure_kubelet_enabled() {
        unsupported.extend(["--kubelet-client-certificate", "--kubelet-client-key"]);
    }
    if is_version_ge(version, "1.10.0") {
        unsupported.push("--admission-control");
    }
    if is_version_ge(version, "1.14.0-alpha.1") {
        unsupported.push("--repair-malformed-updates");
    }
    flags = without_keys(&flags, &unsupported);

    drop_empty(&flags)
}

fn static_flags(properties: &Properties) -> FlagMap {
    let config = properties.kubernetes_config();
    let storage_backend = parse_version(&config.etcd_version)
        .map(|etcd| format!("etcd{}", etcd.major))
        .unwrap_or_default();

    let mut flags = flag_map([
        ("--bind-address", "0.0.0.0"),
        ("--advertise-address", "<advertiseAddr>"),
        ("--allow-privileged", "true"),
        ("--anonymous-auth", "false"),
        ("--audit-log-path", "/var/log/kubeaudit/audit.log"),
        ("--insecure-port", "8080"),
        ("--secure-port", "443"),
        ("--service-account-lookup", "true"),
        ("--etcd-certfile", ETCD_CLIENT_CERT_FILE),
        ("--etcd-keyfile", ETCD_CLIENT_KEY_FILE),
        ("--tls-cert-file", APISERVER_CERT_FILE),
        ("--tls-private-key-file", APISERVER_KEY_FILE),
        ("--client-ca-file", CA_CERT_FILE),
        ("--repair-malformed-updates", "false"),
        ("--service-account-key-file", APISERVER_KEY_FILE),
        ("--kubelet-client-certificate", CLIENT_CERT_FILE),
        ("--kubelet-client-key", CLIENT_KEY_FILE),
        ("--service-cluster-ip-range", config.service_cidr.as_str()),
        ("--storage-backend", storage_backend.as_str()),
        ("--enable-bootstrap-token-auth", "true"),
        ("--v", "4"),
    ]);

    if properties.master_profile.is_some() {
        flags.insert("--etcd-cafile".to_owned(), CA_CERT_FILE.to_owned());
        flags.insert(
            "--etcd-servers".to_owned(),
            format!("https://127.0.0.1:{DEFAULT_ETCD_CLIENT_PORT}"),
        );
    }
    if config.is_data_encryption_at_rest_enabled() {
        flags.insert(
            "--encryption-provider-config".to_owned(),
            ENCRYPTION_CONFIG_FILE.to_owned(),
        );
    }
    if !config.uses_cloud_controller_manager() {
        flags.insert("--cloud-provider".to_owned(), "azure".to_owned());
        flags.insert("--cloud-config".to_owned(), AZURE_JSON_FILE.to_owned());
    }

    flags
}

fn default_flags(properties: &Properties, location: &str) -> FlagMap {
    let config = properties.kubernetes_config();
    let version = properties.orchestrator_version();

    let mut flags = flag_map([
        ("--audit-log-maxage", "30"),
        ("--audit-log-maxbackup", "10"),
        ("--audit-log-maxsize", "100"),
        ("--profiling", "false"),
        ("--tls-cipher-suites", TLS_STRONG_CIPHER_SUITES_APISERVER),
        (AUDIT_POLICY_FILE_FLAG, AUDIT_POLICY_FILE),
    ]);

    if config.is_aggregated_apis_enabled() {
        flags.extend(flag_map([
            ("--requestheader-client-ca-file", PROXY_CA_CERT_FILE),
            ("--proxy-client-cert-file", PROXY_CERT_FILE),
            ("--proxy-client-key-file", PROXY_KEY_FILE),
            ("--requestheader-allowed-names", ""),
            ("--requestheader-extra-headers-prefix", "X-Remote-Extra-"),
            ("--requestheader-group-headers", "X-Remote-Group"),
            ("--requestheader-username-headers", "X-Remote-User"),
        ]));
    }

    if let Some(aad) = &properties.aad_profile {
        let issuer_host = if target_env(location, properties) == AZURE_CHINA_CLOUD_NAME {
            "sts.chinacloudapi.cn"
        } else {
            "sts.windows.net"
        };
        flags.extend([
            ("--oidc-username-claim".to_owned(), "oid".to_owned()),
            ("--oidc-groups-claim".to_owned(), "groups".to_owned()),
            ("--oidc-client-id".to_owned(), format!("spn:{}", aad.server_app_id)),
            (
                "--oidc-issuer-url".to_owned(),
                format!("https://{issuer_host}/{}/", aad.tenant_id),
            ),
        ]);
    }

    if config.is_rbac_enabled() {
        let mode = if is_version_ge(version, "1.7.0") {
            "Node,RBAC"
        } else {
            "RBAC"
        };
        flags.insert("--authorization-mode".to_owned(), mode.to_owned());
    }

    let mut admission_plugins = ADMISSION_PLUGINS.to_owned();
    if config.is_addon_enabled(POD_SECURITY_POLICY_ADDON_NAME, false) {
        admission_plugins.push_str(",PodSecurityPolicy");
    }
    flags.insert("--enable-admission-plugins".to_owned(), admission_plugins);

    if is_version_ge(version, "1.17.0") {
        flags
    } else {
        feature_gates::add_conditional(&flags, version, "1.13.0", "VolumeSnapshotDataSource=true")
    }
}
