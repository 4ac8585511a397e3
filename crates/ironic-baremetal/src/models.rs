//! Bare Metal API data models and list parameters.

use chrono::{DateTime, Utc};
use ironic_core::query::QueryParams;
use ironic_core::uuid::{ChassisUuid, InstanceUuid, NodeUuid, PortUuid, PortgroupUuid};
use ironic_core::{Error, Resource, ResourceKind, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form JSON object used for `extra`, `driver_info` and similar fields.
pub type JsonObject = Map<String, Value>;

/// Characters escaped in a path segment: everything except RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Sort direction for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Options shared by every list endpoint.
#[derive(Debug, Default, Clone)]
pub struct ListOptions {
    /// Request the detailed representation.
    pub detail: bool,
    /// Return only these fields. Cannot be combined with `detail`.
    pub fields: Option<Vec<String>>,
    /// Field to sort by.
    pub sort_key: Option<String>,
    /// Sort direction.
    pub sort_dir: Option<SortDir>,
    /// Maximum number of results in the page.
    pub limit: Option<u32>,
    /// UUID of the last item of the previous page.
    pub marker: Option<String>,
}

impl ListOptions {
    /// Collection path for `collection`, e.g. `v1/nodes/detail`.
    #[must_use]
    pub fn path(&self, collection: &str) -> String {
        if self.detail {
            format!("v1/{collection}/detail")
        } else {
            format!("v1/{collection}")
        }
    }

    /// Validate against `resource` (the detailed definition) and append the
    /// query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when `fields` is combined with
    /// `detail`, names an unknown field, or when `sort_key` is not sortable.
    pub fn apply(&self, resource: &Resource, query: &mut QueryParams) -> Result<()> {
        if let Some(fields) = &self.fields {
            if self.detail {
                return Err(Error::InvalidRequest(
                    "cannot fetch a subset of fields with 'detail' set".to_string(),
                ));
            }
            let unknown: Vec<&str> = fields
                .iter()
                .map(String::as_str)
                .filter(|f| !resource.contains(f))
                .collect();
            if !unknown.is_empty() {
                return Err(Error::InvalidRequest(format!(
                    "unknown field(s): {}. Valid fields: {}",
                    unknown.join(", "),
                    resource.fields().join(", ")
                )));
            }
        }

        if let Some(key) = &self.sort_key {
            if !resource.is_sort_field(key) {
                return Err(Error::InvalidRequest(format!(
                    "{key} is an invalid field for sorting, valid values for sort_key are: {}",
                    resource.sort_fields().join(", ")
                )));
            }
        }

        query.push_list("fields", self.fields.as_deref());
        query.push_opt("sort_key", self.sort_key.as_deref());
        query.push_opt("sort_dir", self.sort_dir);
        query.push_opt("limit", self.limit);
        query.push_opt("marker", self.marker.as_deref());
        Ok(())
    }
}

/// Node identifier: the API accepts either the UUID or the logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdent {
    /// Node UUID
    Uuid(NodeUuid),
    /// Node name
    Name(String),
}

impl NodeIdent {
    /// The identifier as a single percent-encoded URL path segment.
    #[must_use]
    pub fn path_segment(&self) -> String {
        match self {
            Self::Uuid(uuid) => uuid.to_string(),
            Self::Name(name) => utf8_percent_encode(name, PATH_SEGMENT).to_string(),
        }
    }
}

impl From<NodeUuid> for NodeIdent {
    fn from(uuid: NodeUuid) -> Self {
        Self::Uuid(uuid)
    }
}

impl From<&str> for NodeIdent {
    fn from(value: &str) -> Self {
        NodeUuid::parse_str(value).map_or_else(|_| Self::Name(value.to_string()), Self::Uuid)
    }
}

impl fmt::Display for NodeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Filters for `GET /v1/nodes`.
#[derive(Debug, Default, Clone)]
pub struct NodeListParams {
    /// Only nodes with (or without) an instance.
    pub associated: Option<bool>,
    /// Only nodes in (or out of) maintenance.
    pub maintenance: Option<bool>,
    /// Only nodes in this provision state.
    pub provision_state: Option<String>,
    /// Only nodes using this driver.
    pub driver: Option<String>,
    /// Only nodes of this resource class.
    pub resource_class: Option<String>,
    /// Only nodes in this chassis.
    pub chassis_uuid: Option<ChassisUuid>,
    /// Common list options.
    pub list: ListOptions,
}

impl NodeListParams {
    /// Request path.
    #[must_use]
    pub fn path(&self) -> String {
        self.list.path("nodes")
    }

    /// Convert the parameters into URL query pairs.
    ///
    /// # Errors
    ///
    /// See [`ListOptions::apply`].
    pub fn to_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        let mut query = QueryParams::new();
        query.push_opt("associated", self.associated);
        query.push_opt("maintenance", self.maintenance);
        query.push_opt("provision_state", self.provision_state.as_deref());
        query.push_opt("driver", self.driver.as_deref());
        query.push_opt("resource_class", self.resource_class.as_deref());
        query.push_opt("chassis_uuid", self.chassis_uuid);
        self.list
            .apply(ResourceKind::NodeDetailed.resource(), &mut query)?;
        Ok(query.into_pairs())
    }
}

/// Filters for `GET /v1/ports`.
#[derive(Debug, Default, Clone)]
pub struct PortListParams {
    /// Only ports with this MAC address.
    pub address: Option<String>,
    /// Only ports of this node.
    pub node: Option<NodeIdent>,
    /// Only ports in this portgroup.
    pub portgroup: Option<PortgroupUuid>,
    /// Common list options.
    pub list: ListOptions,
}

impl PortListParams {
    /// Request path.
    #[must_use]
    pub fn path(&self) -> String {
        self.list.path("ports")
    }

    /// Convert the parameters into URL query pairs.
    ///
    /// # Errors
    ///
    /// See [`ListOptions::apply`].
    pub fn to_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        let mut query = QueryParams::new();
        query.push_opt("address", self.address.as_deref());
        query.push_opt("node", self.node.as_ref());
        query.push_opt("portgroup", self.portgroup);
        self.list
            .apply(ResourceKind::PortDetailed.resource(), &mut query)?;
        Ok(query.into_pairs())
    }
}

/// A bare metal node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node UUID.
    pub uuid: NodeUuid,
    /// Logical name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Chassis the node belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis_uuid: Option<ChassisUuid>,
    /// Hardware type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Driver-specific settings (BMC address, credentials...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_info: Option<JsonObject>,
    /// Instance deployed on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_uuid: Option<InstanceUuid>,
    /// Deployment settings for the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_info: Option<JsonObject>,
    /// Current power state (`power on`, `power off`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,
    /// Power state being transitioned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_power_state: Option<String>,
    /// Current provision state (`available`, `active`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_state: Option<String>,
    /// Provision state being transitioned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_provision_state: Option<String>,
    /// When the provision state last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_updated_at: Option<DateTime<Utc>>,
    /// Whether the node is in maintenance mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<bool>,
    /// Why the node is in maintenance mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_reason: Option<String>,
    /// Last error reported by the conductor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Conductor currently holding the node lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<String>,
    /// Scheduling resource class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_class: Option<String>,
    /// Whether the serial console is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_enabled: Option<bool>,
    /// Hardware properties (CPUs, memory, disk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
    /// Operator metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonObject>,
    /// Boot interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_interface: Option<String>,
    /// Deploy interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_interface: Option<String>,
    /// Management interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_interface: Option<String>,
    /// Power interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_interface: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A network port of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    /// Port UUID.
    pub uuid: PortUuid,
    /// MAC address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Owning node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_uuid: Option<NodeUuid>,
    /// Portgroup the port is a member of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portgroup_uuid: Option<PortgroupUuid>,
    /// Whether PXE boot is enabled on this port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pxe_enabled: Option<bool>,
    /// Physical network the port is connected to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_network: Option<String>,
    /// Switch port information (`switch_id`, `port_id`, `switch_info`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_link_connection: Option<JsonObject>,
    /// Internal information maintained by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_info: Option<JsonObject>,
    /// Operator metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonObject>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A chassis grouping nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chassis {
    /// Chassis UUID.
    pub uuid: ChassisUuid,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operator metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonObject>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A driver (hardware type) and the conductors serving it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    /// Driver name.
    pub name: String,
    /// Conductor hosts that have the driver enabled.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// `classic` or `dynamic`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub driver_type: Option<String>,
}

/// Body of `POST /v1/ports`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatePortRequest {
    /// MAC address.
    pub address: String,
    /// Node the port belongs to.
    pub node_uuid: NodeUuid,
    /// Portgroup to join.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portgroup_uuid: Option<PortgroupUuid>,
    /// Whether PXE boot is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pxe_enabled: Option<bool>,
    /// Physical network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_network: Option<String>,
    /// Switch port information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_link_connection: Option<JsonObject>,
    /// Operator metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonObject>,
}

impl CreatePortRequest {
    /// Minimal request for a port with `address` on `node_uuid`.
    pub fn new(address: impl Into<String>, node_uuid: NodeUuid) -> Self {
        Self {
            address: address.into(),
            node_uuid,
            portgroup_uuid: None,
            pxe_enabled: None,
            physical_network: None,
            local_link_connection: None,
            extra: None,
        }
    }
}

/// JSON patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add a value
    Add,
    /// Replace a value
    Replace,
    /// Remove a value
    Remove,
}

/// One RFC 6902 operation of a `PATCH` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    /// Operation kind.
    pub op: PatchOp,
    /// JSON pointer of the attribute, e.g. `/extra/foo`.
    pub path: String,
    /// New value; absent for removals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Add `value` at `path`.
    pub fn add(path: impl AsRef<str>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            path: pointer(path.as_ref()),
            value: Some(value.into()),
        }
    }

    /// Replace the value at `path`.
    pub fn replace(path: impl AsRef<str>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: pointer(path.as_ref()),
            value: Some(value.into()),
        }
    }

    /// Remove the attribute at `path`.
    pub fn remove(path: impl AsRef<str>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: pointer(path.as_ref()),
            value: None,
        }
    }

    /// Parse a `PATH=VALUE` argument (or a bare `PATH` for removals).
    ///
    /// The value is decoded as JSON when possible and kept as a string
    /// otherwise, so `pxe_enabled=false` patches a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when an add or replace argument has
    /// no `=`.
    pub fn parse(op: PatchOp, arg: &str) -> Result<Self> {
        if op == PatchOp::Remove {
            return Ok(Self::remove(arg));
        }

        let (path, raw) = arg.split_once('=').ok_or_else(|| {
            Error::InvalidRequest(format!(
                "attributes must be a list of PATH=VALUE not \"{arg}\""
            ))
        })?;
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

        Ok(Self {
            op,
            path: pointer(path),
            value: Some(value),
        })
    }
}

fn pointer(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeCollection {
    pub(crate) nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortCollection {
    pub(crate) ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChassisCollection {
    pub(crate) chassis: Vec<Chassis>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverCollection {
    pub(crate) drivers: Vec<Driver>,
}
