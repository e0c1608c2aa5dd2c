use async_trait::async_trait;
use provwire_core::{PropertyMap, RpcError, Urn};
use std::collections::{BTreeMap, BTreeSet};

pub use crate::messages::CheckFailure;

/// Per-request settings the engine passes along with Construct and Call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub project: Option<String>,
    pub stack: Option<String>,
    pub parallel: Option<i32>,
    pub engine_address: String,
    pub monitor_address: Option<String>,
    pub preview: bool,
    pub config: BTreeMap<String, String>,
    pub config_secret_keys: Vec<String>,
}

/// Options the engine attached to a component resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    pub aliases: Vec<Urn>,
    pub depends_on: Vec<Urn>,
    pub protect: bool,
    pub providers: BTreeMap<String, String>,
    pub parent: Option<Urn>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructInputs {
    pub name: String,
    pub resource_type: String,
    pub inputs: PropertyMap,
    pub input_dependencies: BTreeMap<String, BTreeSet<Urn>>,
    pub options: ResourceOptions,
    pub settings: RuntimeSettings,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructResult {
    pub urn: Urn,
    /// Resource state. `id` and `urn` entries are never sent back.
    pub state: PropertyMap,
    pub state_dependencies: BTreeMap<String, Vec<Urn>>,
}

impl ConstructResult {
    pub fn new(urn: impl Into<Urn>, state: PropertyMap) -> Self {
        ConstructResult {
            urn: urn.into(),
            state,
            state_dependencies: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallInputs {
    pub token: String,
    pub args: PropertyMap,
    pub arg_dependencies: BTreeMap<String, BTreeSet<Urn>>,
    pub settings: RuntimeSettings,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
    pub outputs: PropertyMap,
    pub return_dependencies: BTreeMap<String, Vec<Urn>>,
    pub failures: Vec<CheckFailure>,
}

impl CallResult {
    pub fn new(outputs: PropertyMap) -> Self {
        CallResult {
            outputs,
            ..Default::default()
        }
    }

    pub fn with_failures(mut self, failures: Vec<CheckFailure>) -> Self {
        self.failures = failures;
        self
    }
}

/// A resource provider implementation hosted by [`crate::ProviderServer`].
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn version(&self) -> String;

    /// Package schema as a JSON document.
    fn schema(&self) -> Option<String> {
        None
    }

    async fn construct(&self, inputs: ConstructInputs) -> Result<ConstructResult, RpcError> {
        Err(RpcError::unimplemented(format!(
            "Construct is not implemented for {}",
            inputs.resource_type
        )))
    }

    async fn call(&self, inputs: CallInputs) -> Result<CallResult, RpcError> {
        Err(RpcError::unimplemented(format!(
            "Call is not implemented for {}",
            inputs.token
        )))
    }
}
