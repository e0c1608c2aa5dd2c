//! Request and response bodies exchanged with the engine.
//!
//! Every field has a default so that engines may omit anything they have no
//! value for; empty strings and zero counts are read as "not set".

use provwire_core::WireStruct;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// URNs a single property depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDependencies {
    pub urns: Vec<String>,
}

impl PropertyDependencies {
    pub fn new(urns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PropertyDependencies {
            urns: urns.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstructRequest {
    pub project: String,
    pub stack: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub parent: String,
    pub inputs: WireStruct,
    pub input_dependencies: BTreeMap<String, PropertyDependencies>,
    pub dependencies: Vec<String>,
    pub providers: BTreeMap<String, String>,
    pub aliases: Vec<String>,
    pub protect: bool,
    pub dry_run: bool,
    pub config: BTreeMap<String, String>,
    pub config_secret_keys: Vec<String>,
    pub parallel: i32,
    pub monitor_endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstructResponse {
    pub urn: String,
    pub state: WireStruct,
    pub state_dependencies: BTreeMap<String, PropertyDependencies>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallRequest {
    pub tok: String,
    pub args: WireStruct,
    pub arg_dependencies: BTreeMap<String, PropertyDependencies>,
    pub project: String,
    pub stack: String,
    pub dry_run: bool,
    pub config: BTreeMap<String, String>,
    pub config_secret_keys: Vec<String>,
    pub parallel: i32,
    pub monitor_endpoint: String,
}

/// A property that failed the provider's checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckFailure {
    pub property: String,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        CheckFailure {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallResponse {
    #[serde(rename = "return")]
    pub return_value: WireStruct,
    pub return_dependencies: BTreeMap<String, PropertyDependencies>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CheckFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigureRequest {
    pub variables: BTreeMap<String, String>,
    pub args: WireStruct,
    pub accept_secrets: bool,
    pub accept_resources: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigureResponse {
    pub accept_secrets: bool,
    pub accept_resources: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInfo {
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSchemaRequest {
    pub version: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSchemaResponse {
    pub schema: String,
}
