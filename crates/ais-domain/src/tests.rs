#[cfg(test)]
mod tests {
    use crate::types::*;

    #[test]
    fn ha_mode_display_matches_wire_form() {
        assert_eq!(HaMode::Full.to_string(), "full");
        assert_eq!(HaMode::None.to_string(), "none");
    }

    #[test]
    fn cluster_status_terminal_set() {
        assert!(ClusterStatus::Installed.is_terminal());
        assert!(ClusterStatus::Error.is_terminal());
        assert!(ClusterStatus::Cancelled.is_terminal());
        assert!(!ClusterStatus::Ready.is_terminal());
        assert!(!ClusterStatus::Installing.is_terminal());
    }

    #[test]
    fn host_status_terminal_and_installing_family() {
        assert!(HostStatus::Installed.is_terminal());
        assert!(HostStatus::AddedToExistingCluster.is_terminal());
        assert!(!HostStatus::Known.is_terminal());

        assert!(HostStatus::InstallingInProgress.is_in_installing_family());
        assert!(HostStatus::PreparingForInstallation.is_in_installing_family());
        assert!(!HostStatus::Known.is_in_installing_family());
        assert!(!HostStatus::Installed.is_in_installing_family());
    }

    #[test]
    fn control_plane_count_by_ha_mode() {
        let base = test_cluster(HaMode::None);
        assert_eq!(base.control_plane_count(), 1);
        let ha = test_cluster(HaMode::Full);
        assert_eq!(ha.control_plane_count(), 3);
    }

    #[test]
    fn required_host_count_adds_workers_to_control_plane() {
        let ha = test_cluster(HaMode::Full);
        assert_eq!(ha.required_host_count(), 5);
    }

    #[test]
    fn save_partindex_suppresses_format_flag_lookup() {
        let mut host = test_host();
        assert!(!host.save_partindex_set());
        host.installer_args.push("--save-partindex".to_string());
        assert!(host.save_partindex_set());
    }

    #[test]
    fn id_roundtrips_through_display_and_parse() {
        let id = ClusterId::new();
        let text = id.to_string();
        let parsed: ClusterId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    fn test_cluster(ha_mode: HaMode) -> Cluster {
        Cluster {
            id: ClusterId::new(),
            name: "test".into(),
            base_dns_domain: "example.com".into(),
            openshift_version: "4.16.0".into(),
            cpu_architecture: "x86_64".into(),
            ha_mode,
            worker_count: 2,
            network_type: NetworkType::Ovn,
            cluster_networks: vec![],
            service_networks: vec![],
            machine_networks: vec![],
            api_vip: None,
            ingress_vip: None,
            pull_secret: "{}".into(),
            ssh_public_key: None,
            proxy: ProxyConfig::default(),
            disk_encryption: DiskEncryptionPolicy::default(),
            install_config_overrides: None,
            kind: ClusterKind::Day1,
            monitored_operators: vec![],
            validations: serde_json::json!({}),
            status: ClusterStatus::PendingForInput,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            install_started_at: None,
            install_completed_at: None,
            controller_logs_collected_at: None,
            hold_installation: false,
            revision: 0,
        }
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
            approved: false,
            validations: serde_json::json!({}),
            status: HostStatus::Discovering,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }
}
