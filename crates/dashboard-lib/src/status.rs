//! Aggregate status card: provider icon and inventory tiles

use crate::models::Manager;
use crate::provider::inventory_url;
use serde::{Deserialize, Serialize};

const ERROR_ICON: &str = "pficon pficon-error-circle-o";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusIcon {
    pub icon_image: String,
    pub large_icon: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub icon_class: String,
    pub count: u64,
}

/// One inventory tile linking to the manager's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeTile {
    pub id: String,
    pub icon_class: String,
    pub title: String,
    pub count: u64,
    pub href: String,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatus {
    pub status: StatusIcon,
    pub attr_data: Vec<AttributeTile>,
}

/// Response body of the aggregate status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatusData {
    pub agg_status: AggregateStatus,
}

impl AggregateStatus {
    pub fn for_manager(manager: &Manager) -> Self {
        let labels = manager.family.labels();
        let counts = &manager.counts;

        let tiles = [
            ("ems_clusters", "pficon pficon-cluster", labels.clusters, counts.ems_clusters),
            ("hosts", "pficon pficon-container-node", labels.hosts, counts.hosts),
            ("storages", "fa fa-database", "Datastores", counts.storages),
            ("vms", "pficon pficon-virtual-machine", "VMs", counts.vms),
            (
                "miq_templates",
                "pficon pficon-virtual-machine",
                "Templates",
                counts.miq_templates,
            ),
        ];

        let attr_data = tiles
            .into_iter()
            .map(|(display, icon_class, title, count)| AttributeTile {
                id: format!("{}_{}", title, manager.id),
                icon_class: icon_class.to_string(),
                title: title.to_string(),
                count,
                href: inventory_url(manager.id, display),
                notification: Notification {
                    icon_class: ERROR_ICON.to_string(),
                    count: 0,
                },
            })
            .collect();

        Self {
            status: StatusIcon {
                icon_image: manager.family.icon_image(),
                large_icon: true,
            },
            attr_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InventoryCounts;
    use crate::provider::ProviderFamily;

    fn manager(family: ProviderFamily) -> Manager {
        Manager {
            id: 4,
            name: "provider".to_string(),
            family,
            counts: InventoryCounts {
                ems_clusters: 2,
                hosts: 6,
                storages: 3,
                vms: 40,
                miq_templates: 5,
            },
        }
    }

    #[test]
    fn test_tiles_in_order_with_counts() {
        let status = AggregateStatus::for_manager(&manager(ProviderFamily::Vmware));

        let titles: Vec<&str> = status.attr_data.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Clusters", "Hosts", "Datastores", "VMs", "Templates"]);

        let hosts = &status.attr_data[1];
        assert_eq!(hosts.id, "Hosts_4");
        assert_eq!(hosts.count, 6);
        assert_eq!(hosts.href, "/ems_infra/4?display=hosts");
        assert_eq!(hosts.notification.count, 0);
        assert_eq!(status.status.icon_image, "svg/vendor-vmware.svg");
    }

    #[test]
    fn test_openstack_titles() {
        let status = AggregateStatus::for_manager(&manager(ProviderFamily::Openstack));

        assert_eq!(status.attr_data[0].title, "Deployment Roles");
        assert_eq!(status.attr_data[0].id, "Deployment Roles_4");
        assert_eq!(status.attr_data[1].title, "Nodes");
    }

    #[test]
    fn test_json_shape() {
        let data = AggregateStatusData {
            agg_status: AggregateStatus::for_manager(&manager(ProviderFamily::Redhat)),
        };
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["aggStatus"]["status"]["largeIcon"], true);
        assert_eq!(
            json["aggStatus"]["attrData"][2]["iconClass"],
            "fa fa-database"
        );
        assert_eq!(
            json["aggStatus"]["attrData"][0]["notification"]["iconClass"],
            "pficon pficon-error-circle-o"
        );
    }
}
