//! JSON-RPC Server
//!
//! Serves the maintenance schedule methods over HTTP on localhost TCP.

use crate::handler::RpcHandler;
use crate::types::{
    CalendarRequest, ChecklistRequest, CompleteRequest, CreateRequest, GetRequest, ListRequest,
    StatusRequest, UpcomingRequest, UpdateRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use upkeep_core::application::constants::DEFAULT_UPCOMING_HORIZON_DAYS;
use upkeep_core::application::ScheduleService;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9627;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
    /// Horizon for `maintenance.upcoming.v1` when the caller sends none
    pub upcoming_horizon_days: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            upcoming_horizon_days: DEFAULT_UPCOMING_HORIZON_DAYS,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

// Registers `$method` with a params type, or with no params at all.
macro_rules! register {
    ($module:expr, $handler:expr, $method:literal, $call:ident, $req:ty) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($method, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
    ($module:expr, $handler:expr, $method:literal, $call:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($method, move |_, _, _| {
                let handler = handler.clone();
                async move { handler.$call().await }
            })
            .map_err(|e| e.to_string())?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, service: Arc<ScheduleService>) -> Self {
        let handler = Arc::new(RpcHandler::new(service, config.upcoming_horizon_days));
        Self { config, handler }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        register!(module, self.handler, "maintenance.create.v1", create, CreateRequest);
        register!(module, self.handler, "maintenance.get.v1", get, GetRequest);
        register!(module, self.handler, "maintenance.update.v1", update, UpdateRequest);
        register!(module, self.handler, "maintenance.status.v1", set_status, StatusRequest);
        register!(module, self.handler, "maintenance.complete.v1", complete, CompleteRequest);
        register!(
            module,
            self.handler,
            "maintenance.checklist.v1",
            update_checklist_item,
            ChecklistRequest
        );
        register!(module, self.handler, "maintenance.calendar.v1", calendar, CalendarRequest);
        register!(module, self.handler, "maintenance.overdue.v1", overdue);
        register!(module, self.handler, "analytics.completion_rate.v1", completion_rate);

        // Params optional: a missing object means "no filter" / default horizon
        let handler = self.handler.clone();
        module
            .register_async_method("maintenance.list.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: Option<ListRequest> = params.parse()?;
                    handler.list(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("maintenance.upcoming.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: Option<UpcomingRequest> = params.parse()?;
                    handler.upcoming(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| e.to_string())?;

        Ok(module)
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
