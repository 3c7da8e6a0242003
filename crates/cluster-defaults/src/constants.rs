//! Names, paths and default values shared across the defaulting pipeline.
use const_format::concatcp;

// Addon names
pub const HEAPSTER_ADDON_NAME: &str = "heapster";
pub const TILLER_ADDON_NAME: &str = "tiller";
pub const ACI_CONNECTOR_ADDON_NAME: &str = "aci-connector";
pub const CLUSTER_AUTOSCALER_ADDON_NAME: &str = "cluster-autoscaler";
pub const BLOBFUSE_FLEXVOLUME_ADDON_NAME: &str = "blobfuse-flexvolume";
pub const SMB_FLEXVOLUME_ADDON_NAME: &str = "smb-flexvolume";
pub const KEYVAULT_FLEXVOLUME_ADDON_NAME: &str = "keyvault-flexvolume";
pub const DASHBOARD_ADDON_NAME: &str = "kubernetes-dashboard";
pub const RESCHEDULER_ADDON_NAME: &str = "rescheduler";
pub const METRICS_SERVER_ADDON_NAME: &str = "metrics-server";
pub const NVIDIA_DEVICE_PLUGIN_ADDON_NAME: &str = "nvidia-device-plugin";
pub const CONTAINER_MONITORING_ADDON_NAME: &str = "container-monitoring";
pub const AZURE_CNI_NETWORK_MONITOR_ADDON_NAME: &str = "azure-cni-networkmonitor";
pub const AZURE_NETWORK_POLICY_ADDON_NAME: &str = "azure-npm-daemonset";
pub const AZURE_VNET_TELEMETRY_CONTAINER_NAME: &str = "azure-vnet-telemetry-daemonset";
pub const CLOUD_NODE_MANAGER_ADDON_NAME: &str = "cloud-node-manager";
pub const IP_MASQ_AGENT_ADDON_NAME: &str = "ip-masq-agent";
pub const DNS_AUTOSCALER_ADDON_NAME: &str = "kube-dns-autoscaler";
pub const CALICO_ADDON_NAME: &str = "calico-daemonset";
pub const AAD_POD_IDENTITY_ADDON_NAME: &str = "aad-pod-identity";
pub const APP_GATEWAY_INGRESS_ADDON_NAME: &str = "appgw-ingress";
pub const AZURE_DISK_CSI_DRIVER_ADDON_NAME: &str = "azuredisk-csi-driver";
pub const AZURE_FILE_CSI_DRIVER_ADDON_NAME: &str = "azurefile-csi-driver";
pub const AZURE_POLICY_ADDON_NAME: &str = "azure-policy";
pub const POD_SECURITY_POLICY_ADDON_NAME: &str = "pod-security-policy";
pub const FLANNEL_ADDON_NAME: &str = "flannel";
pub const KUBE_PROXY_ADDON_NAME: &str = "kube-proxy";
pub const COREDNS_ADDON_NAME: &str = "coredns";

// Container names of multi-container addons
pub const NMI_CONTAINER_NAME: &str = "nmi";
pub const MIC_CONTAINER_NAME: &str = "mic";
pub const GATEKEEPER_CONTAINER_NAME: &str = "gatekeeper";

// Component names
pub const SCHEDULER_COMPONENT_NAME: &str = "kube-scheduler";
pub const CONTROLLER_MANAGER_COMPONENT_NAME: &str = "kube-controller-manager";
pub const CLOUD_CONTROLLER_MANAGER_COMPONENT_NAME: &str = "cloud-controller-manager";
pub const APISERVER_COMPONENT_NAME: &str = "kube-apiserver";
pub const ADDON_MANAGER_COMPONENT_NAME: &str = "kube-addon-manager";

// Addon modes
pub const ADDON_MODE_RECONCILE: &str = "Reconcile";
pub const ADDON_MODE_ENSURE_EXISTS: &str = "EnsureExists";

// Network plugins and policies
pub const NETWORK_PLUGIN_AZURE: &str = "azure";
pub const NETWORK_PLUGIN_KUBENET: &str = "kubenet";
pub const NETWORK_PLUGIN_FLANNEL: &str = "flannel";
pub const NETWORK_PLUGIN_CILIUM: &str = "cilium";
pub const NETWORK_PLUGIN_ANTREA: &str = "antrea";
pub const NETWORK_POLICY_AZURE: &str = "azure";
pub const NETWORK_POLICY_CALICO: &str = "calico";
pub const NETWORK_POLICY_CILIUM: &str = "cilium";
pub const NETWORK_POLICY_ANTREA: &str = "antrea";
pub const NETWORK_POLICY_NONE: &str = "none";

// Orchestrator
pub const KUBERNETES: &str = "Kubernetes";
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.16.15";

// Container runtimes
pub const DOCKER: &str = "docker";
pub const CONTAINERD: &str = "containerd";
pub const DEFAULT_MOBY_VERSION: &str = "3.0.11";
pub const DEFAULT_CONTAINERD_VERSION: &str = "1.3.2";

// Cluster addressing
pub const DEFAULT_KUBERNETES_CLUSTER_SUBNET: &str = "10.244.0.0/16";
pub const DEFAULT_KUBERNETES_CLUSTER_SUBNET_AZURE_CNI: &str = "10.240.0.0/12";
pub const DEFAULT_KUBERNETES_CLUSTER_SUBNET_IPV6: &str = "fc00::/48";
/// Clusters below 1.17 allocate /24 blocks per node, which needs a wider range.
pub const LEGACY_KUBERNETES_CLUSTER_SUBNET_IPV6: &str = "fc00::/8";
pub const DEFAULT_KUBERNETES_SERVICE_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_KUBERNETES_DNS_SERVICE_IP: &str = "10.0.0.10";
pub const DEFAULT_DOCKER_BRIDGE_SUBNET: &str = "172.17.0.1/16";
pub const DEFAULT_VNET_CIDR: &str = "10.0.0.0/8";
pub const DEFAULT_NON_MASQUERADE_CIDR: &str = "0.0.0.0/0";
pub const DEFAULT_NON_MASQUERADE_CNI_CIDR: &str = "168.63.129.16/32";
pub const DEFAULT_MASTER_SUBNET: &str = "10.240.0.0/16";
pub const DEFAULT_AGENT_SUBNET_AZURE_CNI_VMSS: &str = "10.248.0.0/13";
pub const DEFAULT_FIRST_CONSECUTIVE_STATIC_IP: &str = "10.240.255.5";
pub const DEFAULT_FIRST_CONSECUTIVE_STATIC_IP_VMSS: &str = "10.240.0.4";

/// Offset added to the last octet of the first master IP to get the internal
/// load balancer IP on availability set masters.
pub const DEFAULT_INTERNAL_LB_STATIC_IP_OFFSET: u8 = 10;

/// Pods per node with Azure CNI. Each scale set master reserves this many IPs
/// plus one for itself.
pub const DEFAULT_KUBERNETES_MAX_PODS_VNET_INTEGRATED: u32 = 30;
pub const DEFAULT_KUBERNETES_MAX_PODS: u32 = 110;

// Control plane and node tuning
pub const DEFAULT_ETCD_VERSION: &str = "3.3.19";
pub const DEFAULT_ETCD_DISK_SIZE: &str = "256";
pub const DEFAULT_ETCD_DISK_SIZE_GT_3_NODES: &str = "512";
pub const DEFAULT_ETCD_DISK_SIZE_GT_10_NODES: &str = "1024";
pub const DEFAULT_ETCD_DISK_SIZE_GT_20_NODES: &str = "2048";
pub const MAX_AZURE_STACK_MANAGED_DISK_SIZE: &str = "1023";
pub const DEFAULT_GC_HIGH_THRESHOLD: u32 = 85;
pub const DEFAULT_GC_LOW_THRESHOLD: u32 = 80;
pub const DEFAULT_LOAD_BALANCER_SKU: &str = "Standard";
pub const BASIC_LOAD_BALANCER_SKU: &str = "Basic";
pub const DEFAULT_MAXIMUM_LOAD_BALANCER_RULE_COUNT: u32 = 250;
pub const DEFAULT_OUTBOUND_RULE_IDLE_TIMEOUT_IN_MINUTES: u32 = 30;
pub const DEFAULT_KUBE_PROXY_MODE: &str = "iptables";
pub const CLOUD_PROVIDER_BACKOFF_MODE_V1: &str = "v1";
pub const CLOUD_PROVIDER_BACKOFF_MODE_V2: &str = "v2";

pub const DEFAULT_KUBERNETES_HARD_EVICTION_THRESHOLD: &str =
    "memory.available<750Mi,nodefs.available<10%,nodefs.inodesFree<5%";
pub const DEFAULT_KUBELET_EVENT_QPS: &str = "0";
pub const DEFAULT_KUBELET_CADVISOR_PORT: &str = "0";
pub const DEFAULT_KUBELET_POD_MAX_PIDS: i64 = -1;
pub const DEFAULT_KUBERNETES_NODE_STATUS_UPDATE_FREQUENCY: &str = "10s";
pub const DEFAULT_KUBERNETES_CTRL_MGR_NODE_MONITOR_GRACE_PERIOD: &str = "40s";
pub const DEFAULT_KUBERNETES_CTRL_MGR_POD_EVICTION_TIMEOUT: &str = "5m0s";
pub const DEFAULT_KUBERNETES_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD: &str = "10s";
pub const DEFAULT_KUBERNETES_CTRL_MGR_TERMINATED_POD_GC_THRESHOLD: &str = "5000";
pub const AZURE_STACK_NODE_STATUS_UPDATE_FREQUENCY: &str = "1m";
pub const AZURE_STACK_CTRL_MGR_NODE_MONITOR_GRACE_PERIOD: &str = "5m";
pub const AZURE_STACK_CTRL_MGR_POD_EVICTION_TIMEOUT: &str = "5m";
pub const AZURE_STACK_CTRL_MGR_ROUTE_RECONCILIATION_PERIOD: &str = "1m";
pub const AZURE_STACK_SUFFIX: &str = "-azs";

// Cloud provider tuning published through the catalog
pub const DEFAULT_CLOUD_PROVIDER_BACKOFF_RETRIES: u32 = 6;
pub const DEFAULT_CLOUD_PROVIDER_BACKOFF_JITTER: f64 = 1.0;
pub const DEFAULT_CLOUD_PROVIDER_BACKOFF_DURATION: u32 = 5;
pub const DEFAULT_CLOUD_PROVIDER_BACKOFF_EXPONENT: f64 = 1.5;
pub const DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_QPS: f64 = 3.0;
pub const DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_QPS_WRITE: f64 = 1.0;
pub const DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_BUCKET: u32 = 10;
pub const DEFAULT_CLOUD_PROVIDER_RATE_LIMIT_BUCKET_WRITE: u32 = 10;

// Distros
pub const DISTRO_UBUNTU: &str = "ubuntu";
pub const DISTRO_UBUNTU_1804: &str = "ubuntu-18.04";
pub const DISTRO_UBUNTU_1804_GEN2: &str = "ubuntu-18.04-gen2";
pub const DISTRO_COREOS: &str = "coreos";
pub const DISTRO_AKS_UBUNTU_1604: &str = "aks-ubuntu-16.04";
pub const DISTRO_AKS_UBUNTU_1804: &str = "aks-ubuntu-18.04";
pub const DISTRO_AKS_1604_DEPRECATED: &str = "aks";
pub const DISTRO_AKS_DOCKER_ENGINE_DEPRECATED: &str = "aks-docker-engine";
pub const DISTRO_AKS_1804_DEPRECATED: &str = "aks-1804";

// Taints
pub const MASTER_NODE_TAINT: &str = "node-role.kubernetes.io/master=true:NoSchedule";
pub const AAD_POD_IDENTITY_TAINT_KEY: &str = "kubernetes.azure.com/aad-pod-identity";

// Well known files on the nodes
pub const KUBERNETES_CERTS_DIR: &str = "/etc/kubernetes/certs/";
pub const CA_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "ca.crt");
pub const CA_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "ca.key");
pub const APISERVER_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "apiserver.crt");
pub const APISERVER_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "apiserver.key");
pub const CLIENT_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "client.crt");
pub const CLIENT_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "client.key");
pub const ETCD_CLIENT_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "etcdclient.crt");
pub const ETCD_CLIENT_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "etcdclient.key");
pub const KUBELET_SERVER_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "kubeletserver.crt");
pub const KUBELET_SERVER_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "kubeletserver.key");
pub const PROXY_CA_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "proxy-ca.crt");
pub const PROXY_CERT_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "proxy.crt");
pub const PROXY_KEY_FILE: &str = concatcp!(KUBERNETES_CERTS_DIR, "proxy.key");
pub const AZURE_JSON_FILE: &str = "/etc/kubernetes/azure.json";
pub const KUBELET_KUBECONFIG_FILE: &str = "/var/lib/kubelet/kubeconfig";
pub const ENCRYPTION_CONFIG_FILE: &str = "/etc/kubernetes/encryption-config.yaml";
pub const AUDIT_POLICY_FILE: &str = "/etc/kubernetes/addons/audit-policy.yaml";
pub const LEGACY_AUDIT_POLICY_FILE: &str = "/etc/kubernetes/manifests/audit-policy.yaml";

/// Port etcd listens on for client connections.
pub const DEFAULT_ETCD_CLIENT_PORT: u16 = 2379;

pub const DEFAULT_KUBERNETES_CLUSTER_DOMAIN: &str = "cluster.local";

pub const TLS_STRONG_CIPHER_SUITES_APISERVER: &str = "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA";
pub const TLS_STRONG_CIPHER_SUITES_KUBELET: &str = "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,TLS_RSA_WITH_AES_256_GCM_SHA384,TLS_RSA_WITH_AES_128_GCM_SHA256";

/// Key size used by the PKI helper when the caller doesn't choose one.
pub const DEFAULT_PKI_KEY_SIZE: usize = 4096;

// Cloud environments
pub const AZURE_PUBLIC_CLOUD_NAME: &str = "AzurePublicCloud";
pub const AZURE_CHINA_CLOUD_NAME: &str = "AzureChinaCloud";
pub const AZURE_GERMAN_CLOUD_NAME: &str = "AzureGermanCloud";
pub const AZURE_US_GOVERNMENT_CLOUD_NAME: &str = "AzureUSGovernmentCloud";
pub const AZURE_STACK_CLOUD_NAME: &str = "AzureStackCloud";
pub const CLIENT_SECRET_AUTH_METHOD: &str = "client_secret";
pub const AZURE_AD_IDENTITY_SYSTEM: &str = "azure_ad";
pub const AD_FS_IDENTITY_SYSTEM: &str = "adfs";
