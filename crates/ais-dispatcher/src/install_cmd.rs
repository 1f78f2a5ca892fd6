use ais_domain::{Cluster, ClusterKind, Disk, HaMode, Host, HostRole, InfraEnv, MustGatherImages};

/// Images and endpoints that the dispatcher bakes into every install command.
/// Analogous to the original service's per-process `InstructionConfig`.
#[derive(Debug, Clone, Default)]
pub struct InstallerImages {
    pub installer_image: String,
    pub controller_image: String,
    pub agent_image: String,
    pub mco_image: String,
    pub release_image_url: String,
    pub must_gather_images: MustGatherImages,
    pub service_base_url: String,
    pub skip_cert_verification: bool,
    pub check_cluster_version: bool,
    pub service_ca_cert_path: Option<String>,
}

const PODMAN_BASE_ARGS: &[&str] = &[
    "podman", "run", "--privileged", "--pid=host", "--net=host", "--name=assisted-installer",
    "--volume", "/dev:/dev:rw",
    "--volume", "/opt:/opt:rw",
    "--volume", "/var/log:/var/log:rw",
    "--volume", "/run/systemd/journal/socket:/run/systemd/journal/socket",
    "--volume", "/etc/pki:/etc/pki",
    "--env=PULL_SECRET_TOKEN",
];

/// Builds the single shell line the agent runs to launch the installer
/// container (§4.4). Each half of the command — the podman invocation and
/// the installer's own argv — is shell-quoted independently, then the two
/// are joined around the installer image reference.
pub fn build_install_command(
    cluster: &Cluster,
    host: &Host,
    infra_env: &InfraEnv,
    bootdevice: &str,
    disks_to_format: &[String],
    images: &InstallerImages,
) -> Result<String, serde_json::Error> {
    let mut podman_args: Vec<String> = PODMAN_BASE_ARGS.iter().map(|s| s.to_string()).collect();

    let role = effective_role(cluster, host);
    let mut installer_args: Vec<String> = vec![
        "--role".into(), role.to_string(),
        "--infra-env-id".into(), host.infra_env_id.to_string(),
        "--cluster-id".into(), cluster.id.to_string(),
        "--host-id".into(), host.id.to_string(),
        "--boot-device".into(), bootdevice.to_string(),
        "--url".into(), images.service_base_url.clone(),
        "--high-availability-mode".into(), cluster.ha_mode.to_string(),
        "--controller-image".into(), images.controller_image.clone(),
        "--agent-image".into(), images.agent_image.clone(),
    ];

    if cluster.kind != ClusterKind::Day2Import {
        let must_gather_arg = images.must_gather_images.to_installer_arg()?;
        installer_args.push("--must-gather-image".into());
        installer_args.push(must_gather_arg);
        installer_args.push("--openshift-version".into());
        installer_args.push(cluster.openshift_version.clone());
        installer_args.push("--mco-image".into());
        installer_args.push(images.mco_image.clone());
    }

    for disk_id in disks_to_format {
        installer_args.push("--format-disk".into());
        installer_args.push(disk_id.clone());
    }

    if images.skip_cert_verification {
        installer_args.push("--insecure".into());
    }
    if images.check_cluster_version {
        installer_args.push("--check-cluster-version".into());
    }
    if let Some(ca_path) = &images.service_ca_cert_path {
        podman_args.push("--volume".into());
        podman_args.push(format!("{ca_path}:{ca_path}:rw"));
        installer_args.push("--cacert".into());
        installer_args.push(ca_path.clone());
    }

    let host_installer_args = construct_host_installer_args(cluster, host, infra_env)?;
    if !host_installer_args.is_empty() {
        installer_args.push("--installer-args".into());
        installer_args.push(host_installer_args);
    }

    installer_args.extend(proxy_arguments(cluster));

    let podman_quoted = quote_command(&podman_args);
    let installer_quoted = quote_command(&installer_args);
    Ok(format!("{podman_quoted} {} {installer_quoted}", images.installer_image))
}

fn effective_role(cluster: &Cluster, host: &Host) -> HostRole {
    if host.role == HostRole::Bootstrap {
        return HostRole::Bootstrap;
    }
    match host.role {
        HostRole::Auto => {
            if cluster.ha_mode == HaMode::None {
                HostRole::Master
            } else {
                HostRole::Worker
            }
        }
        other => other,
    }
}

/// `getProxyArguments`: emitted only when a proxy is configured.
fn proxy_arguments(cluster: &Cluster) -> Vec<String> {
    if !cluster.proxy.is_set() {
        return vec![];
    }
    let mut cmd = Vec::new();
    if let Some(http) = &cluster.proxy.http_proxy {
        if !http.is_empty() {
            cmd.push("--http-proxy".to_string());
            cmd.push(http.clone());
        }
    }
    if let Some(https) = &cluster.proxy.https_proxy {
        if !https.is_empty() {
            cmd.push("--https-proxy".to_string());
            cmd.push(https.clone());
        }
    }

    let no_proxy_trim = cluster.proxy.no_proxy.as_deref().unwrap_or("").trim().to_string();
    if no_proxy_trim == "*" {
        cmd.push("--no-proxy".to_string());
        cmd.push(no_proxy_trim);
    } else {
        let mut parts = Vec::new();
        if !no_proxy_trim.is_empty() {
            parts.push(no_proxy_trim);
        }
        parts.push("127.0.0.1".to_string());
        parts.push("localhost".to_string());
        parts.push(".svc".to_string());
        parts.push(".cluster.local".to_string());
        parts.push(format!("api-int.{}.{}", cluster.name, cluster.base_dns_domain));
        cmd.push("--no-proxy".to_string());
        cmd.push(parts.join(","));
    }
    cmd
}

/// `getDisksToFormat`: any bootable, fixed, non-removable, non-media disk.
pub fn disks_to_format(disks: &[Disk]) -> Vec<String> {
    disks
        .iter()
        .filter(|d| d.is_format_candidate())
        .map(|d| d.by_path.clone())
        .collect()
}

/// `constructHostInstallerArgs`: merges user-supplied installer args with
/// DHCP kernel args and, for statically-configured infra-envs, `--copy-network`.
fn construct_host_installer_args(
    cluster: &Cluster,
    host: &Host,
    infra_env: &InfraEnv,
) -> Result<String, serde_json::Error> {
    let mut args = host.installer_args.clone();
    args = append_dhcp_args(cluster, host, args);

    let has_static_network = infra_env.static_network_config.is_some();
    if has_static_network && !args.iter().any(|a| a == "--copy-network") {
        args.push("--copy-network".to_string());
    }

    if args.is_empty() {
        Ok(String::new())
    } else {
        serde_json::to_string(&args)
    }
}

fn has_user_configured_ip(args: &[String]) -> bool {
    args.iter().any(|a| a.starts_with("ip="))
}

/// `appendDHCPArgs`/`getDHCPArgPerNIC`: for every NIC address inside the
/// cluster's primary machine network, append an `ip=<nic>:dhcp[6]` karg.
fn append_dhcp_args(cluster: &Cluster, host: &Host, mut args: Vec<String>) -> Vec<String> {
    if has_user_configured_ip(&args) {
        return args;
    }
    let Some(machine_net) = cluster.machine_networks.first() else {
        return args;
    };
    let Some(inventory) = &host.inventory else {
        return args;
    };
    let dhcp_kw = if machine_net.is_ipv6() { "dhcp6" } else { "dhcp" };
    for nic in &inventory.interfaces {
        let addrs = if machine_net.is_ipv6() { &nic.ipv6_addresses } else { &nic.ipv4_addresses };
        let found = addrs.iter().any(|addr| {
            let ip = addr.split('/').next().unwrap_or(addr);
            ip.parse::<std::net::IpAddr>().map(|parsed| machine_net.contains(parsed)).unwrap_or(false)
        });
        if found {
            args.push("--append-karg".to_string());
            args.push(format!("ip={}:{}", nic.name, dhcp_kw));
        }
    }
    args
}

fn quote_command(args: &[String]) -> String {
    args.iter().map(|a| shlex::try_quote(a).unwrap_or_else(|_| a.into()).into_owned()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::*;

    fn cluster_with_proxy(http: Option<&str>, no_proxy: Option<&str>) -> Cluster {
        Cluster {
            id: ClusterId::new(),
            name: "mycluster".into(),
            base_dns_domain: "example.com".into(),
            openshift_version: "4.16.0".into(),
            cpu_architecture: "x86_64".into(),
            ha_mode: HaMode::Full,
            worker_count: 0,
            network_type: NetworkType::Ovn,
            cluster_networks: vec![],
            service_networks: vec![],
            machine_networks: vec![Cidr::new("192.168.122.0/24").unwrap()],
            api_vip: None,
            ingress_vip: None,
            pull_secret: "{}".into(),
            ssh_public_key: None,
            proxy: ProxyConfig {
                http_proxy: http.map(String::from),
                https_proxy: None,
                no_proxy: no_proxy.map(String::from),
            },
            disk_encryption: DiskEncryptionPolicy::default(),
            install_config_overrides: None,
            kind: ClusterKind::Day1,
            monitored_operators: vec![],
            validations: serde_json::json!({}),
            status: ClusterStatus::Ready,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            install_started_at: None,
            install_completed_at: None,
            controller_logs_collected_at: None,
            hold_installation: false,
            revision: 0,
        }
    }

    #[test]
    fn no_proxy_args_when_unset() {
        let cluster = cluster_with_proxy(None, None);
        assert!(proxy_arguments(&cluster).is_empty());
    }

    #[test]
    fn proxy_args_append_fixed_suffix() {
        let cluster = cluster_with_proxy(Some("http://proxy:3128"), Some("10.0.0.0/8"));
        let args = proxy_arguments(&cluster);
        assert_eq!(args[0], "--http-proxy");
        assert_eq!(args[1], "http://proxy:3128");
        let no_proxy_idx = args.iter().position(|a| a == "--no-proxy").unwrap();
        let value = &args[no_proxy_idx + 1];
        assert!(value.starts_with("10.0.0.0/8,"));
        assert!(value.contains("api-int.mycluster.example.com"));
    }

    #[test]
    fn wildcard_no_proxy_passes_through_verbatim() {
        let cluster = cluster_with_proxy(Some("http://proxy:3128"), Some(" * "));
        let args = proxy_arguments(&cluster);
        let no_proxy_idx = args.iter().position(|a| a == "--no-proxy").unwrap();
        assert_eq!(args[no_proxy_idx + 1], "*");
    }

    #[test]
    fn existing_ip_arg_suppresses_dhcp_kargs() {
        let cluster = cluster_with_proxy(None, None);
        let mut host = test_host();
        host.installer_args = vec!["ip=eth0:dhcp".to_string()];
        let result = append_dhcp_args(&cluster, &host, host.installer_args.clone());
        assert_eq!(result, vec!["ip=eth0:dhcp".to_string()]);
    }

    #[test]
    fn dhcp_karg_added_for_nic_in_machine_network() {
        let cluster = cluster_with_proxy(None, None);
        let mut host = test_host();
        host.inventory = Some(Inventory {
            hostname: "h".into(),
            cpu_cores: 4,
            memory_bytes: 0,
            disks: vec![],
            interfaces: vec![Nic {
                name: "eth0".into(),
                mac_address: "aa".into(),
                ipv4_addresses: vec!["192.168.122.50/24".into()],
                ipv6_addresses: vec![],
            }],
            boot_device: None,
        });
        let result = append_dhcp_args(&cluster, &host, vec![]);
        assert_eq!(result, vec!["--append-karg".to_string(), "ip=eth0:dhcp".to_string()]);
    }

    #[test]
    fn disk_format_candidates_exclude_removable_and_media() {
        let disks = vec![
            Disk { name: "sda".into(), by_path: "/pci/sda".into(), size_bytes: 1, bootable: true, removable: false, is_installation_media: false },
            Disk { name: "sdb".into(), by_path: "/pci/sdb".into(), size_bytes: 1, bootable: true, removable: true, is_installation_media: false },
            Disk { name: "sdc".into(), by_path: "/pci/sdc".into(), size_bytes: 1, bootable: true, removable: false, is_installation_media: true },
        ];
        let formatted = disks_to_format(&disks);
        assert_eq!(formatted, vec!["/pci/sda".to_string()]);
    }

    fn test_host() -> Host {
        Host {
            id: HostId::new(),
            cluster_id: None,
            infra_env_id: InfraEnvId::new(),
            role: HostRole::Auto,
            inventory: None,
            connectivity: None,
            installation_progress: InstallationProgress::default(),
            installer_args: vec![],
            logs_collected_at: None,
            approved: true,
            validations: serde_json::json!({}),
            status: HostStatus::Known,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }
}
