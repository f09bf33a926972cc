//! API server assembly.
//!
//! # Responsibilities
//! - Register controllers (route index + container registration)
//! - Collect application middlewares
//! - Freeze everything into an [`App`] and serve it over HTTP
//! - Print the route table at startup
//!
//! # Data Flow
//! ```text
//! startup:
//!     ApiServer::new(config)
//!     → map_controller(factory)  (build instance once, derive routes, register factory)
//!     → use_middleware(..)
//!     → run(addr)
//!
//! per request:
//!     adapter (axum) → App::handle → middlewares → Router::handle
//! ```
//!
//! # Design Decisions
//! - Registration happens before serving; the pipeline is immutable afterwards
//! - The controller instance used for registration is discarded; requests get
//!   their own instance from the request scope
//! - Registration errors abort startup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::controller::Controller;
use crate::http::adapter;
use crate::http::handler::{chain, BoxedHandler, Middleware};
use crate::http::{Request, Response};
use crate::ioc::{Container, ResolveError, Scope};
use crate::routing::{ControllerRegistry, RegistrationError, RouteTableRow, Router};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server under construction.
pub struct ApiServer {
    config: ServerConfig,
    services: Arc<Container>,
    registry: ControllerRegistry,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ApiServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_container(config, Arc::new(Container::new()))
    }

    /// Use an existing container (e.g. one the application already filled).
    pub fn with_container(config: ServerConfig, services: Arc<Container>) -> Self {
        let registry = ControllerRegistry::new().strict(config.routing.strict_base_paths);
        Self {
            config,
            services,
            registry,
            middlewares: Vec::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The container controllers and services are resolved from.
    pub fn services(&self) -> &Arc<Container> {
        &self.services
    }

    /// Register a controller built by `factory`.
    ///
    /// The factory runs once now to read the base path and policies, then
    /// once per request scope.
    pub fn map_controller<C, F>(&mut self, factory: F) -> Result<&mut Self, RegistrationError>
    where
        C: Controller,
        F: Fn(&Scope) -> Result<C, ResolveError> + Send + Sync + 'static,
    {
        let startup = Scope::new(self.services.clone());
        let instance = factory(&startup).map_err(|source| RegistrationError::Instantiate {
            controller: C::type_name().to_string(),
            source,
        })?;

        let entry = self.registry.register(&instance)?;
        let name = entry.name().to_string();
        self.services.register_keyed_scoped(name, factory);
        Ok(self)
    }

    /// Add a middleware. The first one added runs outermost.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn route_table(&self) -> Vec<RouteTableRow> {
        self.registry.route_table()
    }

    /// Freeze registration into a servable [`App`].
    pub fn build(self) -> App {
        let router = Arc::new(Router::new(self.registry));
        let routes = router.route_table();
        let pipeline = chain(router.into_handler(), &self.middlewares);
        App {
            pipeline,
            services: self.services,
            routes,
            config: self.config,
        }
    }

    /// Bind `address` and serve until Ctrl+C.
    pub async fn run(self, address: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;
        self.build().serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound `listener` until `shutdown` completes.
    pub async fn run_with_shutdown<S>(self, listener: TcpListener, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        self.build().serve(listener, shutdown).await
    }

    /// Serve on `listener.bind_address` from the config.
    pub async fn run_configured(self) -> Result<(), ServerError> {
        let address = self.config.listener.bind_address.clone();
        self.run(&address).await
    }
}

/// Frozen request pipeline.
pub struct App {
    pipeline: BoxedHandler,
    services: Arc<Container>,
    routes: Vec<RouteTableRow>,
    config: ServerConfig,
}

impl App {
    /// Run one request through middlewares, router, policies and handler.
    ///
    /// The request is bound to a fresh scope of the application container.
    pub async fn handle(&self, req: Request) -> Response {
        let scope = Arc::new(Scope::new(self.services.clone()));
        let context = req.context().with_scope(scope);
        self.pipeline.call(req.with_context(context)).await
    }

    pub fn routes(&self) -> &[RouteTableRow] {
        &self.routes
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn services(&self) -> &Arc<Container> {
        &self.services
    }

    /// Log the route table, one line per route.
    pub fn log_routes(&self) {
        tracing::info!(routes = self.routes.len(), "Route table");
        for row in &self.routes {
            tracing::info!(
                method = row.method,
                path = %row.path,
                controller = row.controller,
                handler = %row.handler,
                "{row}"
            );
        }
    }

    /// The pipeline as an axum router, with timeout and trace layers.
    pub fn into_router(self) -> axum::Router {
        adapter::router(Arc::new(self))
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.log_routes();
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
