//! Hosts a resource [`Provider`] as an engine plugin over HTTP.
//!
//! The engine launches the plugin with its own address, reads the port the
//! plugin printed on stdout and then sends Construct, Call, Configure,
//! plugin-info and schema requests as JSON bodies.

pub mod logging;
pub mod messages;
pub mod plugin;
pub mod provider;
pub mod server;
pub mod servicer;

pub use logging::{init_logging, init_test_logging};
pub use messages::{
    CallRequest, CallResponse, CheckFailure, ConfigureRequest, ConfigureResponse,
    ConstructRequest, ConstructResponse, GetSchemaRequest, GetSchemaResponse, PluginInfo,
    PropertyDependencies,
};
pub use plugin::{serve, serve_with_config, ProviderArgs};
pub use provider::{
    CallInputs, CallResult, ConstructInputs, ConstructResult, Provider, ResourceOptions,
    RuntimeSettings,
};
pub use server::{router, ApiError, ServerConfig, MAX_BODY_BYTES};
pub use servicer::ProviderServer;
