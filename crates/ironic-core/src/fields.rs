//! Field and label registry for Bare Metal API resources.
//!
//! A [`Resource`] is an ordered, labelled view over the fields of one API
//! object type. It is used to build output tables and to validate the
//! `fields` and `sort_key` parameters of list requests.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Default display label for a field identifier.
#[must_use]
pub fn default_label(field: &str) -> Option<&'static str> {
    let label = match field {
        "address" => "Address",
        "async" => "Async",
        "attach" => "Response is attachment",
        "boot_index" => "Boot Index",
        "chassis_uuid" => "Chassis UUID",
        "clean_step" => "Clean Step",
        "console_enabled" => "Console Enabled",
        "created_at" => "Created At",
        "default_boot_interface" => "Default Boot Interface",
        "default_console_interface" => "Default Console Interface",
        "default_deploy_interface" => "Default Deploy Interface",
        "default_inspect_interface" => "Default Inspect Interface",
        "default_management_interface" => "Default Management Interface",
        "default_network_interface" => "Default Network Interface",
        "default_power_interface" => "Default Power Interface",
        "default_raid_interface" => "Default RAID Interface",
        "default_storage_interface" => "Default Storage Interface",
        "default_vendor_interface" => "Default Vendor Interface",
        "description" => "Description",
        "driver" => "Driver",
        "driver_info" => "Driver Info",
        "driver_internal_info" => "Driver Internal Info",
        "enabled_boot_interfaces" => "Enabled Boot Interfaces",
        "enabled_console_interfaces" => "Enabled Console Interfaces",
        "enabled_deploy_interfaces" => "Enabled Deploy Interfaces",
        "enabled_inspect_interfaces" => "Enabled Inspect Interfaces",
        "enabled_management_interfaces" => "Enabled Management Interfaces",
        "enabled_network_interfaces" => "Enabled Network Interfaces",
        "enabled_power_interfaces" => "Enabled Power Interfaces",
        "enabled_raid_interfaces" => "Enabled RAID Interfaces",
        "enabled_storage_interfaces" => "Enabled Storage Interfaces",
        "enabled_vendor_interfaces" => "Enabled Vendor Interfaces",
        "extra" => "Extra",
        "hosts" => "Active host(s)",
        "http_methods" => "Supported HTTP methods",
        "inspection_finished_at" => "Inspection Finished At",
        "inspection_started_at" => "Inspection Started At",
        "instance_info" => "Instance Info",
        "instance_uuid" => "Instance UUID",
        "internal_info" => "Internal Info",
        "last_error" => "Last Error",
        "maintenance" => "Maintenance",
        "maintenance_reason" => "Maintenance Reason",
        "mode" => "Mode",
        "name" => "Name",
        "node_uuid" => "Node UUID",
        "power_state" => "Power State",
        "properties" => "Properties",
        "provision_state" => "Provisioning State",
        "provision_updated_at" => "Provision Updated At",
        "raid_config" => "Current RAID configuration",
        "reservation" => "Reservation",
        "resource_class" => "Resource Class",
        "target_power_state" => "Target Power State",
        "target_provision_state" => "Target Provision State",
        "target_raid_config" => "Target RAID configuration",
        "type" => "Type",
        "updated_at" => "Updated At",
        "uuid" => "UUID",
        "volume_id" => "Volume ID",
        "volume_type" => "Driver Volume Type",
        "local_link_connection" => "Local Link Connection",
        "pxe_enabled" => "PXE boot enabled",
        "portgroup_uuid" => "Portgroup UUID",
        "boot_interface" => "Boot Interface",
        "console_interface" => "Console Interface",
        "deploy_interface" => "Deploy Interface",
        "inspect_interface" => "Inspect Interface",
        "management_interface" => "Management Interface",
        "network_interface" => "Network Interface",
        "power_interface" => "Power Interface",
        "raid_interface" => "RAID Interface",
        "storage_interface" => "Storage Interface",
        "vendor_interface" => "Vendor Interface",
        "standalone_ports_supported" => "Standalone Ports Supported",
        "physical_network" => "Physical Network",
        "id" => "ID",
        "connector_id" => "Connector ID",
        _ => return None,
    };
    Some(label)
}

/// Fields of one resource type with their labels.
///
/// Field order is the order given at construction. The sort views hold the
/// same fields minus the sort exclusions, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    fields: Vec<String>,
    labels: Vec<String>,
    sort_fields: Vec<String>,
    sort_labels: Vec<String>,
}

impl Resource {
    /// Start building a resource over `field_ids`.
    pub fn builder<I, S>(field_ids: I) -> ResourceBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResourceBuilder {
            field_ids: field_ids.into_iter().map(Into::into).collect(),
            sort_excluded: Vec::new(),
            override_labels: HashMap::new(),
        }
    }

    /// Resource over `field_ids` with default labels and every field sortable.
    ///
    /// # Errors
    ///
    /// Fails if a field has no registered label.
    pub fn new<I, S>(field_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(field_ids).build()
    }

    /// All field identifiers.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Labels matching [`Resource::fields`].
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fields the service accepts as a sort key.
    #[must_use]
    pub fn sort_fields(&self) -> &[String] {
        &self.sort_fields
    }

    /// Labels matching [`Resource::sort_fields`].
    #[must_use]
    pub fn sort_labels(&self) -> &[String] {
        &self.sort_labels
    }

    /// Whether `field` is part of this resource.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Whether `field` may be used as a sort key.
    #[must_use]
    pub fn is_sort_field(&self, field: &str) -> bool {
        self.sort_fields.iter().any(|f| f == field)
    }

    /// Label of `field`, if it belongs to this resource.
    #[must_use]
    pub fn label(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|idx| self.labels[idx].as_str())
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    field_ids: Vec<String>,
    sort_excluded: Vec<String>,
    override_labels: HashMap<String, String>,
}

impl ResourceBuilder {
    /// Exclude fields from the sort views.
    #[must_use]
    pub fn sort_excluded<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_excluded.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Use `label` instead of the registry label for `field`.
    #[must_use]
    pub fn override_label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.override_labels.insert(field.into(), label.into());
        self
    }

    /// Validate the definition and build the resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when an override or sort exclusion names
    /// a field missing from `field_ids`, or when a field has no label.
    pub fn build(self) -> Result<Resource> {
        let Self {
            field_ids,
            sort_excluded,
            override_labels,
        } = self;

        check_param_fields(
            "override_labels",
            &field_ids,
            sorted(override_labels.keys()),
        )?;
        check_param_fields("sort_excluded", &field_ids, sort_excluded.iter())?;

        let label_for = |field: &String| -> Option<String> {
            match override_labels.get(field).filter(|l| !l.is_empty()) {
                Some(label) => Some(label.clone()),
                None => default_label(field).map(str::to_string),
            }
        };

        let mut labels = Vec::with_capacity(field_ids.len());
        let mut unlabelled = Vec::new();
        for field in &field_ids {
            match label_for(field) {
                Some(label) => labels.push(label),
                None => unlabelled.push(field.clone()),
            }
        }
        if !unlabelled.is_empty() {
            return Err(Error::InvalidField {
                param: "field_ids",
                unknown: unlabelled,
            });
        }

        let (sort_fields, sort_labels): (Vec<String>, Vec<String>) = field_ids
            .iter()
            .zip(&labels)
            .filter(|&(field, _)| !sort_excluded.contains(field))
            .map(|(field, label)| (field.clone(), label.clone()))
            .unzip();

        Ok(Resource {
            fields: field_ids,
            labels,
            sort_fields,
            sort_labels,
        })
    }
}

fn sorted<'a>(keys: impl Iterator<Item = &'a String>) -> std::vec::IntoIter<&'a String> {
    let mut keys: Vec<_> = keys.collect();
    keys.sort();
    keys.into_iter()
}

fn check_param_fields<'a>(
    param: &'static str,
    field_ids: &[String],
    param_fields: impl Iterator<Item = &'a String>,
) -> Result<()> {
    let mut unknown: Vec<String> = Vec::new();
    for field in param_fields {
        if !field_ids.contains(field) && !unknown.contains(field) {
            unknown.push(field.clone());
        }
    }

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidField { param, unknown })
    }
}

/// Built-in resource definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Chassis, detailed listing
    ChassisDetailed,
    /// Chassis
    Chassis,
    /// Nodes, detailed listing
    NodeDetailed,
    /// Nodes
    Node,
    /// Vendor passthru methods
    VendorPassthruMethod,
    /// Ports, detailed listing
    PortDetailed,
    /// Ports
    Port,
    /// Portgroups, detailed listing
    PortgroupDetailed,
    /// Portgroups
    Portgroup,
    /// Virtual interfaces attached to a node
    Vif,
    /// Drivers, detailed listing
    DriverDetailed,
    /// Drivers
    Driver,
    /// Volume connectors, detailed listing
    VolumeConnectorDetailed,
    /// Volume connectors
    VolumeConnector,
    /// Volume targets, detailed listing
    VolumeTargetDetailed,
    /// Volume targets
    VolumeTarget,
}

struct Definition {
    fields: &'static [&'static str],
    sort_excluded: &'static [&'static str],
    override_labels: &'static [(&'static str, &'static str)],
}

const DRIVER_NAME_LABEL: &[(&str, &str)] = &[("name", "Supported driver(s)")];

impl ResourceKind {
    /// Every built-in kind.
    pub const ALL: [Self; 16] = [
        Self::ChassisDetailed,
        Self::Chassis,
        Self::NodeDetailed,
        Self::Node,
        Self::VendorPassthruMethod,
        Self::PortDetailed,
        Self::Port,
        Self::PortgroupDetailed,
        Self::Portgroup,
        Self::Vif,
        Self::DriverDetailed,
        Self::Driver,
        Self::VolumeConnectorDetailed,
        Self::VolumeConnector,
        Self::VolumeTargetDetailed,
        Self::VolumeTarget,
    ];

    /// The shared resource for this kind.
    #[must_use]
    pub fn resource(self) -> &'static Resource {
        static TABLE: LazyLock<Vec<(ResourceKind, Resource)>> = LazyLock::new(|| {
            ResourceKind::ALL
                .iter()
                .map(|&kind| {
                    let resource = kind.build().unwrap_or_else(|err| {
                        panic!("built-in resource {kind:?} is inconsistent: {err}")
                    });
                    (kind, resource)
                })
                .collect()
        });

        TABLE
            .iter()
            .find_map(|(kind, resource)| (*kind == self).then_some(resource))
            .unwrap_or_else(|| panic!("{self:?} is missing from ResourceKind::ALL"))
    }

    fn build(self) -> Result<Resource> {
        let def = self.definition();
        def.override_labels
            .iter()
            .fold(
                Resource::builder(def.fields.iter().copied())
                    .sort_excluded(def.sort_excluded.iter().copied()),
                |builder, (field, label)| builder.override_label(*field, *label),
            )
            .build()
    }

    const fn definition(self) -> Definition {
        match self {
            Self::ChassisDetailed => Definition {
                fields: &["uuid", "description", "created_at", "updated_at", "extra"],
                sort_excluded: &["extra"],
                override_labels: &[],
            },
            Self::Chassis => Definition {
                fields: &["uuid", "description"],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::NodeDetailed => Definition {
                fields: &[
                    "chassis_uuid",
                    "created_at",
                    "clean_step",
                    "console_enabled",
                    "driver",
                    "driver_info",
                    "driver_internal_info",
                    "extra",
                    "instance_info",
                    "instance_uuid",
                    "last_error",
                    "maintenance",
                    "maintenance_reason",
                    "power_state",
                    "properties",
                    "provision_state",
                    "provision_updated_at",
                    "raid_config",
                    "reservation",
                    "resource_class",
                    "target_power_state",
                    "target_provision_state",
                    "target_raid_config",
                    "updated_at",
                    "inspection_finished_at",
                    "inspection_started_at",
                    "uuid",
                    "name",
                    "boot_interface",
                    "console_interface",
                    "deploy_interface",
                    "inspect_interface",
                    "management_interface",
                    "network_interface",
                    "power_interface",
                    "raid_interface",
                    "storage_interface",
                    "vendor_interface",
                ],
                // chassis_uuid is not a column of the nodes table, only
                // the internal chassis_id is.
                sort_excluded: &[
                    "chassis_uuid",
                    "clean_step",
                    "driver_info",
                    "driver_internal_info",
                    "extra",
                    "instance_info",
                    "properties",
                    "raid_config",
                    "target_raid_config",
                ],
                override_labels: &[],
            },
            Self::Node => Definition {
                fields: &[
                    "uuid",
                    "name",
                    "instance_uuid",
                    "power_state",
                    "provision_state",
                    "maintenance",
                ],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::VendorPassthruMethod => Definition {
                fields: &["name", "http_methods", "async", "description", "attach"],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::PortDetailed => Definition {
                fields: &[
                    "uuid",
                    "address",
                    "created_at",
                    "extra",
                    "node_uuid",
                    "local_link_connection",
                    "portgroup_uuid",
                    "pxe_enabled",
                    "physical_network",
                    "updated_at",
                    "internal_info",
                ],
                sort_excluded: &["extra", "node_uuid", "portgroup_uuid", "internal_info"],
                override_labels: &[],
            },
            Self::Port => Definition {
                fields: &["uuid", "address"],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::PortgroupDetailed => Definition {
                fields: &[
                    "uuid",
                    "address",
                    "created_at",
                    "extra",
                    "standalone_ports_supported",
                    "node_uuid",
                    "name",
                    "updated_at",
                    "internal_info",
                    "mode",
                    "properties",
                ],
                sort_excluded: &["extra", "node_uuid", "internal_info", "properties"],
                override_labels: &[],
            },
            Self::Portgroup => Definition {
                fields: &["uuid", "address", "name"],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::Vif => Definition {
                fields: &["id"],
                sort_excluded: &[],
                override_labels: &[],
            },
            Self::DriverDetailed => Definition {
                fields: &[
                    "name",
                    "type",
                    "hosts",
                    "default_boot_interface",
                    "default_console_interface",
                    "default_deploy_interface",
                    "default_inspect_interface",
                    "default_management_interface",
                    "default_network_interface",
                    "default_power_interface",
                    "default_raid_interface",
                    "default_storage_interface",
                    "default_vendor_interface",
                    "enabled_boot_interfaces",
                    "enabled_console_interfaces",
                    "enabled_deploy_interfaces",
                    "enabled_inspect_interfaces",
                    "enabled_management_interfaces",
                    "enabled_network_interfaces",
                    "enabled_power_interfaces",
                    "enabled_raid_interfaces",
                    "enabled_storage_interfaces",
                    "enabled_vendor_interfaces",
                ],
                sort_excluded: &[],
                override_labels: DRIVER_NAME_LABEL,
            },
            Self::Driver => Definition {
                fields: &["name", "hosts"],
                sort_excluded: &[],
                override_labels: DRIVER_NAME_LABEL,
            },
            Self::VolumeConnectorDetailed => Definition {
                fields: &[
                    "uuid",
                    "node_uuid",
                    "type",
                    "connector_id",
                    "extra",
                    "created_at",
                    "updated_at",
                ],
                sort_excluded: &["node_uuid", "extra"],
                override_labels: &[],
            },
            Self::VolumeConnector => Definition {
                fields: &["uuid", "node_uuid", "type", "connector_id"],
                sort_excluded: &["node_uuid"],
                override_labels: &[],
            },
            Self::VolumeTargetDetailed => Definition {
                fields: &[
                    "uuid",
                    "node_uuid",
                    "volume_type",
                    "properties",
                    "boot_index",
                    "extra",
                    "volume_id",
                    "created_at",
                    "updated_at",
                ],
                sort_excluded: &["node_uuid", "extra", "properties"],
                override_labels: &[],
            },
            Self::VolumeTarget => Definition {
                fields: &["uuid", "node_uuid", "volume_type", "boot_index", "volume_id"],
                sort_excluded: &["node_uuid"],
                override_labels: &[],
            },
        }
    }
}
