//! Echo Provider Binary
//!
//! A minimal provider plugin. Call returns its arguments unchanged and
//! Construct returns its inputs as the component's state.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use provwire_core::{RpcError, Urn};
use provwire_server::{
    init_logging, serve, CallInputs, CallResult, ConstructInputs, ConstructResult, Provider,
    ProviderArgs,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    async fn construct(&self, inputs: ConstructInputs) -> Result<ConstructResult, RpcError> {
        let stack = inputs.settings.stack.as_deref().unwrap_or("stack");
        let project = inputs.settings.project.as_deref().unwrap_or("project");
        let urn = Urn::new(format!(
            "urn:pulumi:{}::{}::{}::{}",
            stack, project, inputs.resource_type, inputs.name
        ));
        info!("Echoing {} inputs for {}", inputs.inputs.len(), urn);
        Ok(ConstructResult::new(urn, inputs.inputs))
    }

    async fn call(&self, inputs: CallInputs) -> Result<CallResult, RpcError> {
        info!("Echoing {} args for {}", inputs.args.len(), inputs.token);
        Ok(CallResult::new(inputs.args))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ProviderArgs::parse();

    let log_dir = std::env::var_os("PROVWIRE_LOG_DIR").map(PathBuf::from);
    init_logging(log_dir.as_deref(), "echo-provider")?;

    info!("Starting echo provider for engine {}", args.engine);
    serve(EchoProvider, args).await
}
