//! Provider family capabilities
//!
//! Labels, icons and titles that differ between infrastructure providers are
//! looked up once per request from the manager's [`ProviderFamily`] instead of
//! being decided by scattered type checks in the formatting code.

use serde::{Deserialize, Serialize};

/// Family of an infrastructure manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    Vmware,
    Redhat,
    Microsoft,
    Openstack,
    Telefonica,
    Kubevirt,
}

/// UI strings that depend on the provider family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLabels {
    pub clusters: &'static str,
    pub hosts: &'static str,
    pub heatmap_title: &'static str,
    pub recent_hosts_title: &'static str,
}

/// Labels for classic hypervisor managers, also used when no manager is in scope
pub const DEFAULT_LABELS: ProviderLabels = ProviderLabels {
    clusters: "Clusters",
    hosts: "Hosts",
    heatmap_title: "Cluster Utilization",
    recent_hosts_title: "Recent Hosts",
};

/// Labels for deployment-role based managers (OpenStack style)
pub const DEPLOYMENT_ROLE_LABELS: ProviderLabels = ProviderLabels {
    clusters: "Deployment Roles",
    hosts: "Nodes",
    heatmap_title: "Deployment Roles Utilization",
    recent_hosts_title: "Recent Nodes",
};

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::Vmware => "vmware",
            ProviderFamily::Redhat => "redhat",
            ProviderFamily::Microsoft => "microsoft",
            ProviderFamily::Openstack => "openstack",
            ProviderFamily::Telefonica => "telefonica",
            ProviderFamily::Kubevirt => "kubevirt",
        }
    }

    /// Whether clusters are presented as deployment roles and hosts as nodes
    pub fn uses_deployment_roles(&self) -> bool {
        matches!(self, ProviderFamily::Openstack | ProviderFamily::Telefonica)
    }

    pub fn labels(&self) -> &'static ProviderLabels {
        if self.uses_deployment_roles() {
            &DEPLOYMENT_ROLE_LABELS
        } else {
            &DEFAULT_LABELS
        }
    }

    /// Vendor icon shown on the aggregate status card
    pub fn icon_image(&self) -> String {
        format!("svg/vendor-{}.svg", self.as_str())
    }
}

/// Resolve labels for an optional scope
pub fn labels_for(family: Option<ProviderFamily>) -> &'static ProviderLabels {
    family.map(|f| f.labels()).unwrap_or(&DEFAULT_LABELS)
}

/// Link to an inventory listing on the manager's page
pub fn inventory_url(ems_id: u64, display: &str) -> String {
    format!("/ems_infra/{}?display={}", ems_id, display)
}
