//! Asynchronous Bare Metal API client implementation.

use crate::models::{
    Chassis, ChassisCollection, CreatePortRequest, Driver, DriverCollection, ListOptions, Node,
    NodeCollection, NodeIdent, NodeListParams, PatchOperation, Port, PortCollection,
    PortListParams,
};
use crate::Result;
use ironic_core::client::{ClientConfig, RetryPolicy, DEFAULT_CONNECT_TIMEOUT};
use ironic_core::config::{IronicClientConfig, DEFAULT_API_VERSION};
use ironic_core::query::QueryParams;
use ironic_core::uuid::{ChassisUuid, PortUuid};
use ironic_core::{ApiError, Endpoint, Error, ResourceKind};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use validator::Validate;
use url::Url;

const USER_AGENT: &str = concat!("ironic-baremetal/", env!("CARGO_PKG_VERSION"));

/// Header carrying the requested API microversion.
pub const API_VERSION_HEADER: &str = "X-OpenStack-Ironic-API-Version";

/// Builder for [`IronicClient`].
#[derive(Debug, Clone)]
pub struct IronicClientBuilder {
    endpoint: Endpoint,
    http_config: ClientConfig,
    api_version: Option<String>,
}

impl IronicClientBuilder {
    /// Create a new builder for the given endpoint.
    ///
    /// The URL may carry a path prefix (e.g. `https://cloud.example.com/baremetal`);
    /// API paths are appended below it.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        let endpoint = Endpoint::parse(endpoint.as_ref()).map_err(|err| {
            Error::ConfigError(format!("Invalid Bare Metal API endpoint: {err}"))
        })?;

        Ok(Self {
            endpoint,
            http_config: ClientConfig::new(),
            api_version: Some(DEFAULT_API_VERSION.to_string()),
        })
    }

    /// Create a builder from a configuration, validating it first.
    ///
    /// Deserialized configurations have not been through
    /// [`IronicClientConfig::new`], so the ranges are checked here.
    pub fn from_config(config: &IronicClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            endpoint: config.endpoint()?,
            http_config: config.client_config(),
            api_version: config.api_version.clone(),
        })
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.http_config.retry_policy = retry_policy;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Request a specific API microversion, or none at all.
    #[must_use]
    pub fn with_api_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.api_version = version.map(Into::into);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<IronicClient> {
        let mut builder = ClientBuilder::new()
            .timeout(self.http_config.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT))
            .danger_accept_invalid_certs(!self.http_config.tls_verify);

        if !self.http_config.enable_compression {
            builder = builder.no_gzip();
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(IronicClient {
            http,
            endpoint: self.endpoint,
            retry_policy: self.http_config.retry_policy,
            api_version: self.api_version,
        })
    }
}

/// Asynchronous Bare Metal API client.
#[derive(Debug, Clone)]
pub struct IronicClient {
    http: Client,
    endpoint: Endpoint,
    retry_policy: RetryPolicy,
    api_version: Option<String>,
}

impl IronicClient {
    /// Create a new client for the given endpoint with default settings.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        IronicClientBuilder::new(endpoint)?.build()
    }

    /// Access the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Requested API microversion, if any.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// List nodes.
    pub async fn list_nodes(&self, params: &NodeListParams) -> Result<Vec<Node>> {
        let query = params.to_pairs()?;
        let collection: NodeCollection = self.get_json(&params.path(), &query).await?;
        Ok(collection.nodes)
    }

    /// Fetch a node by UUID or name.
    pub async fn get_node(&self, node: impl Into<NodeIdent>) -> Result<Node> {
        let path = format!("v1/nodes/{}", node.into().path_segment());
        self.get_json(&path, &[]).await
    }

    /// List ports.
    pub async fn list_ports(&self, params: &PortListParams) -> Result<Vec<Port>> {
        let query = params.to_pairs()?;
        let collection: PortCollection = self.get_json(&params.path(), &query).await?;
        Ok(collection.ports)
    }

    /// Fetch a port by UUID.
    pub async fn get_port(&self, uuid: PortUuid) -> Result<Port> {
        let path = format!("v1/ports/{uuid}");
        self.get_json(&path, &[]).await
    }

    /// Create a port.
    pub async fn create_port(&self, request: &CreatePortRequest) -> Result<Port> {
        self.json_request(Method::POST, "v1/ports", Some(request), &[])
            .await
    }

    /// Apply a JSON patch to a port.
    pub async fn update_port(&self, uuid: PortUuid, patch: &[PatchOperation]) -> Result<Port> {
        let path = format!("v1/ports/{uuid}");
        self.json_request(Method::PATCH, &path, Some(patch), &[])
            .await
    }

    /// Delete a port.
    pub async fn delete_port(&self, uuid: PortUuid) -> Result<()> {
        let path = format!("v1/ports/{uuid}");
        self.send(Method::DELETE, &path, Option::<&()>::None, &[])
            .await
            .map(drop)
    }

    /// List chassis.
    pub async fn list_chassis(&self, options: &ListOptions) -> Result<Vec<Chassis>> {
        let mut query = QueryParams::new();
        options.apply(ResourceKind::ChassisDetailed.resource(), &mut query)?;
        let collection: ChassisCollection = self
            .get_json(&options.path("chassis"), &query.into_pairs())
            .await?;
        Ok(collection.chassis)
    }

    /// Fetch a chassis by UUID.
    pub async fn get_chassis(&self, uuid: ChassisUuid) -> Result<Chassis> {
        let path = format!("v1/chassis/{uuid}");
        self.get_json(&path, &[]).await
    }

    /// List enabled drivers.
    pub async fn list_drivers(&self) -> Result<Vec<Driver>> {
        let collection: DriverCollection = self.get_json("v1/drivers", &[]).await?;
        Ok(collection.drivers)
    }

    /// Send a request and decode its JSON response.
    ///
    /// `path` is relative to the endpoint; leading slashes are ignored. Error
    /// responses are mapped to [`Error::Api`]; conflicts, unavailable
    /// responses and refused connections are retried per the retry policy.
    /// Timed-out requests are never re-sent.
    pub async fn json_request<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(method, path, body, params).await?;
        response.json::<R>().await.map_err(|err| {
            Error::ParseError(format!("Failed to parse response for `{path}`: {err}"))
        })
    }

    fn build_url(&self, path: &str) -> Url {
        self.endpoint.request_url(path)
    }

    async fn get_json<T>(&self, path: &str, params: &[(&'static str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.json_request(Method::GET, path, Option::<&()>::None, params)
            .await
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let mut attempt = 0;

        loop {
            match self.send_once(method.clone(), path, body, params, attempt).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry_policy.max_retries => {
                    attempt += 1;
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    debug!(%err, attempt, "Retrying request after {:?}", delay);
                    if delay > Duration::from_millis(0) {
                        sleep(delay).await;
                    }
                }
                Err(err) => {
                    if err.should_log() {
                        error!(
                            code = err.error_code(),
                            %method,
                            path,
                            attempt,
                            "Request failed: {err}"
                        );
                    } else if err.is_retryable() && attempt > 0 {
                        warn!(%method, path, attempt, "Request failed after retries: {err}");
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
        attempt: u32,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.build_url(path);
        let mut request = self
            .http
            .request(method.clone(), url)
            .query(params)
            .header("Accept", "application/json");

        if let Some(version) = &self.api_version {
            request = request.header(API_VERSION_HEADER, version);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        info!(%method, path, attempt, "Bare Metal API request");

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.ok();

        Err(ApiError::from_response(status.as_u16(), body.as_deref(), content_type.as_deref()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironic_core::uuid::NodeUuid;
    use ironic_core::HttpErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NODE: &str = "1be26c0b-03f2-4d2e-ae87-c02d7f33c123";
    const PORT: &str = "27e3153e-d5bf-4b7e-b517-fb518e17f34c";

    fn test_client(server: &MockServer) -> IronicClient {
        IronicClientBuilder::new(server.uri())
            .unwrap()
            .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1)))
            .build()
            .unwrap()
    }

    fn fault(faultstring: &str) -> serde_json::Value {
        json!({
            "error_message": json!({ "faultstring": faultstring, "debuginfo": null }).to_string()
        })
    }

    #[tokio::test]
    async fn list_ports_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ports"))
            .and(query_param("node", NODE))
            .and(header("Accept", "application/json"))
            .and(header(API_VERSION_HEADER, DEFAULT_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ports": [
                    { "uuid": PORT, "address": "52:54:00:12:34:56" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = PortListParams {
            node: Some(NODE.into()),
            ..PortListParams::default()
        };

        let ports = client.list_ports(&params).await.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].uuid.to_string(), PORT);
        assert_eq!(ports[0].address.as_deref(), Some("52:54:00:12:34:56"));
    }

    #[tokio::test]
    async fn endpoint_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/baremetal/v1/drivers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "drivers": [{ "name": "ipmi", "hosts": ["conductor-1"], "type": "dynamic" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = IronicClient::new(format!("{}/baremetal/", server.uri())).unwrap();
        let drivers = client.list_drivers().await.unwrap();
        assert_eq!(drivers[0].name, "ipmi");
        assert_eq!(drivers[0].driver_type.as_deref(), Some("dynamic"));
    }

    #[tokio::test]
    async fn get_node_not_found_maps_fault() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/nodes/compute-01"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(fault("Node compute-01 could not be found.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get_node("compute-01").await.unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.kind(), HttpErrorKind::NotFound);
                assert_eq!(api.to_string(), "Node compute-01 could not be found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_with_empty_fault_uses_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/drivers"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error_message": json!({ "faultstring": null, "debuginfo": null }).to_string()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.list_drivers().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "HTTPInternalServerError (HTTP 500)");
    }

    #[tokio::test]
    async fn service_unavailable_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/ports/{PORT}").as_str()))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/ports/{PORT}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uuid": PORT })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let port = client
            .get_port(PortUuid::parse_str(PORT).unwrap())
            .await
            .unwrap();
        assert_eq!(port.uuid.to_string(), PORT);
    }

    #[tokio::test]
    async fn conflict_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/ports/{PORT}").as_str()))
            .respond_with(ResponseTemplate::new(409).set_body_json(fault("Node is locked")))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .delete_port(PortUuid::parse_str(PORT).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Node is locked");
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ports"))
            .respond_with(ResponseTemplate::new(400).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let request = CreatePortRequest::new("bogus", NodeUuid::parse_str(NODE).unwrap());
        let err = client.create_port(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTPBadRequest (HTTP 400)");
    }

    #[tokio::test]
    async fn create_and_update_port() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ports"))
            .and(body_json(json!({ "address": "52:54:00:12:34:56", "node_uuid": NODE })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "uuid": PORT, "address": "52:54:00:12:34:56", "node_uuid": NODE
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(format!("/v1/ports/{PORT}").as_str()))
            .and(body_json(json!([
                { "op": "replace", "path": "/pxe_enabled", "value": false }
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": PORT, "pxe_enabled": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let node = NodeUuid::parse_str(NODE).unwrap();
        let port = client
            .create_port(&CreatePortRequest::new("52:54:00:12:34:56", node))
            .await
            .unwrap();
        assert_eq!(port.node_uuid, Some(node));

        let patch = [PatchOperation::replace("pxe_enabled", false)];
        let port = client.update_port(port.uuid, &patch).await.unwrap();
        assert_eq!(port.pxe_enabled, Some(false));
    }

    #[tokio::test]
    async fn invalid_sort_key_is_rejected_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = NodeListParams {
            list: ListOptions {
                sort_key: Some("driver_info".to_string()),
                ..ListOptions::default()
            },
            ..NodeListParams::default()
        };
        let err = client.list_nodes(&params).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn list_nodes_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/nodes/detail"))
            .and(query_param("maintenance", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nodes": [{
                    "uuid": NODE,
                    "name": "compute-01",
                    "maintenance": true,
                    "maintenance_reason": "disk replacement",
                    "provision_state": "manageable",
                    "driver_info": { "ipmi_address": "10.0.0.5" }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = NodeListParams {
            maintenance: Some(true),
            list: ListOptions {
                detail: true,
                ..ListOptions::default()
            },
            ..NodeListParams::default()
        };
        let nodes = client.list_nodes(&params).await.unwrap();
        assert_eq!(nodes[0].name.as_deref(), Some("compute-01"));
        assert_eq!(
            nodes[0].driver_info.as_ref().and_then(|d| d.get("ipmi_address")),
            Some(&json!("10.0.0.5"))
        );
    }

    #[tokio::test]
    async fn api_version_header_can_be_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/chassis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chassis": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = IronicClientBuilder::new(server.uri())
            .unwrap()
            .with_api_version(None::<String>)
            .build()
            .unwrap();
        assert!(client.api_version().is_none());

        let chassis = client.list_chassis(&ListOptions::default()).await.unwrap();
        assert!(chassis.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get(API_VERSION_HEADER).is_none());
    }

    #[tokio::test]
    async fn get_node_escapes_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/nodes/rack%201%3Fspare"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": NODE, "name": "rack 1?spare"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let node = client.get_node("rack 1?spare").await.unwrap();
        assert_eq!(node.name.as_deref(), Some("rack 1?spare"));
    }

    #[tokio::test]
    async fn timed_out_requests_are_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ports"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "uuid": PORT }))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/drivers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "drivers": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = IronicClientBuilder::new(server.uri())
            .unwrap()
            .with_http_config(
                ClientConfig::new()
                    .with_timeout(Duration::from_millis(100))
                    .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1))),
            )
            .build()
            .unwrap();

        let node = NodeUuid::parse_str(NODE).unwrap();
        let request = CreatePortRequest::new("52:54:00:12:34:56", node);
        let err = client.create_port(&request).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");
        assert!(!err.is_retryable());

        let err = client.list_drivers().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_retryable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = IronicClientBuilder::new(format!("http://127.0.0.1:{port}"))
            .unwrap()
            .with_retry_policy(RetryPolicy::fixed(1, Duration::from_millis(1)))
            .build()
            .unwrap();

        let err = client.list_drivers().await.unwrap_err();
        assert!(
            matches!(err, Error::ServiceUnavailable(_)),
            "unexpected error: {err:?}"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn builder_from_config_validates() {
        let mut config = IronicClientConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(
            IronicClientBuilder::from_config(&config),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        assert!(matches!(
            IronicClient::new("not a url"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn builder_from_config() {
        let config = IronicClientConfig::new("http://ironic.local:6385")
            .unwrap()
            .with_api_version(Some("1.31"));
        let client = IronicClientBuilder::from_config(&config)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(client.api_version(), Some("1.31"));
        assert_eq!(client.endpoint().url().as_str(), "http://ironic.local:6385/");
    }
}
