// Dispatch of engine requests to a hosted provider.
//
// Inputs are unmarshaled and results marshaled here, so every marshal failure
// surfaces as an error for the request that caused it and nothing else.

use provwire_core::{
    MarshalOptions, Marshaler, PropertyKey, PropertyMap, RpcError, Urn, WireStruct,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::messages::{
    CallRequest, CallResponse, ConfigureRequest, ConfigureResponse, ConstructRequest,
    ConstructResponse, GetSchemaRequest, GetSchemaResponse, PluginInfo, PropertyDependencies,
};
use crate::provider::{
    CallInputs, ConstructInputs, Provider, ResourceOptions, RuntimeSettings,
};

/// State keys the engine tracks itself.
const RESERVED_STATE_KEYS: [&str; 2] = ["id", "urn"];

pub struct ProviderServer<P> {
    provider: P,
    engine_address: String,
    opts: MarshalOptions,
    // Construct and Call run one at a time.
    lock: Mutex<()>,
}

impl<P> fmt::Debug for ProviderServer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderServer")
            .field("engine_address", &self.engine_address)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl<P: Provider> ProviderServer<P> {
    /// Resource references in results are sent as their URN unless other
    /// options are set with [`ProviderServer::with_options`].
    pub fn new(provider: P, engine_address: impl Into<String>) -> Self {
        ProviderServer {
            provider,
            engine_address: engine_address.into(),
            opts: MarshalOptions::default().with_raw_resources(true),
            lock: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, opts: MarshalOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn engine_address(&self) -> &str {
        &self.engine_address
    }

    pub async fn construct(&self, req: ConstructRequest) -> Result<ConstructResponse, RpcError> {
        let _guard = self.lock.lock().await;
        debug!(
            "Construct {} ({}) with {} inputs",
            req.name,
            req.resource_type,
            req.inputs.len()
        );

        let marshaler = Marshaler::new(self.opts);
        let inputs = marshaler.unmarshal_properties(Some(&req.inputs))?;

        let settings = self.settings(
            &req.project,
            &req.stack,
            req.parallel,
            &req.monitor_endpoint,
            req.dry_run,
            req.config,
            req.config_secret_keys,
        );
        let options = ResourceOptions {
            aliases: req.aliases.into_iter().map(Urn::from).collect(),
            depends_on: req.dependencies.into_iter().map(Urn::from).collect(),
            protect: req.protect,
            providers: req.providers,
            parent: empty_as_none(&req.parent).map(Urn::from),
        };

        let result = self
            .provider
            .construct(ConstructInputs {
                name: req.name,
                resource_type: req.resource_type,
                inputs,
                input_dependencies: dependency_sets(req.input_dependencies),
                options,
                settings,
            })
            .await?;

        let state: PropertyMap = result
            .state
            .into_iter()
            .filter(|(key, _)| !RESERVED_STATE_KEYS.iter().any(|k| *k == key.as_str()))
            .collect();
        let state = marshal_result(&marshaler, "Construct", &state)?;

        info!("Constructed {}", result.urn);
        Ok(ConstructResponse {
            urn: result.urn.to_string(),
            state,
            state_dependencies: dependency_lists(result.state_dependencies),
        })
    }

    pub async fn call(&self, req: CallRequest) -> Result<CallResponse, RpcError> {
        let _guard = self.lock.lock().await;
        debug!("Call {} with {} args", req.tok, req.args.len());

        let marshaler = Marshaler::new(self.opts);
        let args = marshaler.unmarshal_properties(Some(&req.args))?;

        let settings = self.settings(
            &req.project,
            &req.stack,
            req.parallel,
            &req.monitor_endpoint,
            req.dry_run,
            req.config,
            req.config_secret_keys,
        );

        let result = self
            .provider
            .call(CallInputs {
                token: req.tok,
                args,
                arg_dependencies: dependency_sets(req.arg_dependencies),
                settings,
            })
            .await?;

        if !result.failures.is_empty() {
            warn!("Call reported {} check failures", result.failures.len());
        }
        let return_value = marshal_result(&marshaler, "Call", &result.outputs)?;

        Ok(CallResponse {
            return_value,
            return_dependencies: dependency_lists(result.return_dependencies),
            failures: result.failures,
        })
    }

    pub async fn configure(&self, req: ConfigureRequest) -> Result<ConfigureResponse, RpcError> {
        debug!("Configure with {} variables", req.variables.len());
        Ok(ConfigureResponse {
            accept_secrets: true,
            accept_resources: true,
        })
    }

    pub async fn plugin_info(&self) -> Result<PluginInfo, RpcError> {
        Ok(PluginInfo {
            version: self.provider.version(),
        })
    }

    pub async fn get_schema(&self, req: GetSchemaRequest) -> Result<GetSchemaResponse, RpcError> {
        if req.version != 0 {
            return Err(RpcError::bad_request(format!(
                "unsupported schema version {}",
                req.version
            )));
        }
        let schema = self
            .provider
            .schema()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "{}".to_string());
        Ok(GetSchemaResponse { schema })
    }

    #[allow(clippy::too_many_arguments)]
    fn settings(
        &self,
        project: &str,
        stack: &str,
        parallel: i32,
        monitor_endpoint: &str,
        preview: bool,
        config: BTreeMap<String, String>,
        config_secret_keys: Vec<String>,
    ) -> RuntimeSettings {
        RuntimeSettings {
            project: empty_as_none(project),
            stack: empty_as_none(stack),
            parallel: zero_as_none(parallel),
            engine_address: self.engine_address.clone(),
            monitor_address: empty_as_none(monitor_endpoint),
            preview,
            config,
            config_secret_keys,
        }
    }
}

// Unknowns are allowed in results; the engine reads them as placeholders.
fn marshal_result(
    marshaler: &Marshaler<'_>,
    operation: &str,
    props: &PropertyMap,
) -> Result<WireStruct, RpcError> {
    let (fields, unknowns) = marshaler.marshal_properties_with_unknowns(props)?;
    if !unknowns.is_empty() {
        let keys: Vec<&str> = unknowns.iter().map(PropertyKey::as_str).collect();
        warn!("{} result has unknown properties: {}", operation, keys.join(", "));
    }
    Ok(fields)
}

fn dependency_sets(
    deps: BTreeMap<String, PropertyDependencies>,
) -> BTreeMap<String, BTreeSet<Urn>> {
    deps.into_iter()
        .map(|(key, deps)| (key, deps.urns.into_iter().map(Urn::from).collect()))
        .collect()
}

fn dependency_lists(deps: BTreeMap<String, Vec<Urn>>) -> BTreeMap<String, PropertyDependencies> {
    deps.into_iter()
        .map(|(key, urns)| {
            let urns = urns.iter().map(Urn::to_string);
            (key, PropertyDependencies::new(urns))
        })
        .collect()
}

fn empty_as_none(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn zero_as_none(value: i32) -> Option<i32> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provwire_core::{ErrorCode, PropertyValue, WireValue};
    use std::sync::Mutex as StdMutex;

    /// Records what it was given and hands back a canned result.
    #[derive(Default)]
    struct Recording {
        seen: StdMutex<Vec<ConstructInputs>>,
        state: PropertyMap,
        schema: Option<String>,
    }

    #[async_trait]
    impl Provider for Recording {
        fn version(&self) -> String {
            "1.2.3".to_string()
        }

        fn schema(&self) -> Option<String> {
            self.schema.clone()
        }

        async fn construct(
            &self,
            inputs: ConstructInputs,
        ) -> Result<crate::provider::ConstructResult, RpcError> {
            self.seen.lock().unwrap().push(inputs);
            Ok(crate::provider::ConstructResult::new(
                "urn:pulumi:dev::web::web:index:Site::site",
                self.state.clone(),
            ))
        }
    }

    fn request() -> ConstructRequest {
        let mut inputs = WireStruct::new();
        inputs.insert("domain".to_string(), WireValue::String("example.com".to_string()));
        ConstructRequest {
            name: "site".to_string(),
            resource_type: "web:index:Site".to_string(),
            inputs,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_construct_maps_empty_fields_to_none() {
        let server = ProviderServer::new(Recording::default(), "127.0.0.1:5000");
        server.construct(request()).await.unwrap();

        let seen = server.provider().seen.lock().unwrap();
        let inputs = &seen[0];
        assert_eq!(inputs.settings.project, None);
        assert_eq!(inputs.settings.parallel, None);
        assert_eq!(inputs.settings.monitor_address, None);
        assert_eq!(inputs.settings.engine_address, "127.0.0.1:5000");
        assert_eq!(inputs.options.parent, None);
        assert_eq!(inputs.inputs.get("domain"), Some(&PropertyValue::from("example.com")));
    }

    #[tokio::test]
    async fn test_construct_passes_set_fields() {
        let server = ProviderServer::new(Recording::default(), "engine");
        let mut req = request();
        req.project = "web".to_string();
        req.parallel = 4;
        req.parent = "urn:pulumi:dev::web::pulumi:pulumi:Stack::web-dev".to_string();
        req.input_dependencies.insert(
            "domain".to_string(),
            PropertyDependencies::new(["urn:pulumi:dev::web::t::zone"]),
        );
        server.construct(req).await.unwrap();

        let seen = server.provider().seen.lock().unwrap();
        let inputs = &seen[0];
        assert_eq!(inputs.settings.project.as_deref(), Some("web"));
        assert_eq!(inputs.settings.parallel, Some(4));
        assert!(inputs.options.parent.is_some());
        assert_eq!(inputs.input_dependencies["domain"].len(), 1);
    }

    #[tokio::test]
    async fn test_construct_state_drops_reserved_keys() {
        let state: PropertyMap = [
            ("id", PropertyValue::from("abc")),
            ("urn", PropertyValue::from("urn:pulumi:dev::web::t::n")),
            ("url", PropertyValue::from("https://example.com")),
        ]
        .into_iter()
        .collect();
        let provider = Recording {
            state,
            ..Default::default()
        };
        let resp = ProviderServer::new(provider, "engine")
            .construct(request())
            .await
            .unwrap();

        assert_eq!(resp.urn, "urn:pulumi:dev::web::web:index:Site::site");
        let keys: Vec<&str> = resp.state.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["url"]);
    }

    #[tokio::test]
    async fn test_unknown_state_is_sent_as_placeholder() {
        let state: PropertyMap = [("endpoint", PropertyValue::computed(PropertyValue::from("")))]
            .into_iter()
            .collect();
        let provider = Recording {
            state,
            ..Default::default()
        };
        let resp = ProviderServer::new(provider, "engine")
            .construct(request())
            .await
            .unwrap();
        assert_eq!(resp.state["endpoint"], WireValue::String(String::new()));
    }

    #[tokio::test]
    async fn test_invariant_violation_becomes_internal_error() {
        let nested = PropertyValue::computed(PropertyValue::computed(PropertyValue::Null));
        let provider = Recording {
            state: [("bad", nested)].into_iter().collect(),
            ..Default::default()
        };
        let server = ProviderServer::new(provider, "engine");

        let err = server.construct(request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(err.message.starts_with("internal invariant violated"));

        // The server is still usable afterwards.
        assert_eq!(server.plugin_info().await.unwrap().version, "1.2.3");
    }

    #[tokio::test]
    async fn test_default_call_is_unimplemented() {
        let server = ProviderServer::new(Recording::default(), "engine");
        let err = server
            .call(CallRequest {
                tok: "web:index:refresh".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unimplemented);
    }

    #[tokio::test]
    async fn test_schema_version_and_default() {
        let server = ProviderServer::new(Recording::default(), "engine");
        let resp = server.get_schema(GetSchemaRequest { version: 0 }).await.unwrap();
        assert_eq!(resp.schema, "{}");

        let err = server
            .get_schema(GetSchemaRequest { version: 2 })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert!(err.message.contains("unsupported schema version 2"));
    }

    #[tokio::test]
    async fn test_schema_from_provider() {
        let provider = Recording {
            schema: Some(r#"{"name":"web"}"#.to_string()),
            ..Default::default()
        };
        let resp = ProviderServer::new(provider, "engine")
            .get_schema(GetSchemaRequest::default())
            .await
            .unwrap();
        assert_eq!(resp.schema, r#"{"name":"web"}"#);
    }

    #[tokio::test]
    async fn test_configure_accepts_everything() {
        let server = ProviderServer::new(Recording::default(), "engine");
        let resp = server.configure(ConfigureRequest::default()).await.unwrap();
        assert!(resp.accept_secrets);
        assert!(resp.accept_resources);
    }
}
