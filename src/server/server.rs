//! HTTP server core implementation

use crate::config::ServerConfig;
use crate::monitoring::MonitoringSystem;
use crate::server::middleware::RequestIdMiddleware;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{ResilienceError, Result};
use actix_web::{
    App, HttpServer as ActixHttpServer,
    middleware::{DefaultHeaders, Logger},
    web,
};
use std::future::Future;
use tracing::info;

/// Admin HTTP server
#[derive(Debug)]
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server around an already built monitoring system
    pub fn new(config: &ServerConfig, monitoring: MonitoringSystem) -> Self {
        Self {
            config: config.clone(),
            state: AppState::new(monitoring),
        }
    }

    /// Create the Actix-web application
    pub fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(state)
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .wrap(DefaultHeaders::new().add(("Server", "CareGrid-Resilience")))
            .configure(routes::configure_routes)
    }

    /// Serve until `shutdown` completes
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.address();
        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);
        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()))
            .disable_signals();
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }
        let server = server
            .bind(&bind_addr)
            .map_err(|e| Self::format_bind_error(e, &bind_addr))?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        let handle = server.handle();
        tokio::spawn(async move {
            shutdown.await;
            info!("Shutdown requested, draining HTTP connections");
            handle.stop(true).await;
        });

        server
            .await
            .map_err(|e| ResilienceError::internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    fn format_bind_error(error: std::io::Error, bind_addr: &str) -> ResilienceError {
        match error.kind() {
            std::io::ErrorKind::AddrInUse => ResilienceError::Config(format!(
                "Address {} is already in use; set server.port or RESILIENCE_PORT",
                bind_addr
            )),
            std::io::ErrorKind::PermissionDenied => ResilienceError::Config(format!(
                "Permission denied binding {}",
                bind_addr
            )),
            _ => ResilienceError::Io(error),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
