use ais_reconciler::Change;

/// Renders a list of reconciler changes as human-readable text, one line
/// per change, in the order they were applied.
pub fn render_changes(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "no changes".to_string();
    }
    changes.iter().map(render_change).collect::<Vec<_>>().join("\n")
}

fn render_change(change: &Change) -> String {
    match change {
        Change::ClusterRegistered { key, cluster_id } => {
            format!("+ cluster {key} registered as {cluster_id}")
        }
        Change::ClusterImported { key, cluster_id } => {
            format!("+ cluster {key} imported (day2) as {cluster_id}")
        }
        Change::ClusterUpdated { key, cluster_id } => {
            format!("~ cluster {key} ({cluster_id}) updated")
        }
        Change::InstallationStarted { key, cluster_id } => {
            format!("> cluster {key} ({cluster_id}) installation started")
        }
        Change::ClusterCancelled { key, cluster_id } => {
            format!("x cluster {key} ({cluster_id}) cancelled")
        }
        Change::ClusterDeregistered { key, cluster_id } => {
            format!("- cluster {key} ({cluster_id}) deregistered")
        }
        Change::CredentialsPersisted { key, cluster_id } => {
            format!("* cluster {key} ({cluster_id}) credentials persisted")
        }
    }
}
