//! HTTP server serving a Werval application

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use werval_api::config::keys;
use werval_api::{Application, Config, WervalError};
use werval_runtime::ApplicationInstance;

use crate::body::{ResponseBody, into_response, read_request};
use crate::{HttpServerError, Result};

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 23023)),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    /// Settings read from `werval.http.*`
    pub fn from_config(config: &Config) -> Result<Self> {
        let address = config.string(keys::HTTP_ADDRESS)?;
        let port = config.int(keys::HTTP_PORT)?;
        let port = u16::try_from(port)
            .map_err(|_| WervalError::config(keys::HTTP_PORT, format!("{port} is not a port")))?;
        let max_body_size = config.int(keys::HTTP_MAX_BODY_SIZE)?;
        let max_body_size = usize::try_from(max_body_size).map_err(|_| {
            WervalError::config(keys::HTTP_MAX_BODY_SIZE, "must not be negative")
        })?;

        let bind_address = format!("{address}:{port}");
        let bind_address = match bind_address.parse::<SocketAddr>() {
            Ok(parsed) => parsed,
            // IPv6 literals need brackets
            Err(_) => format!("[{address}]:{port}")
                .parse()
                .map_err(|_| HttpServerError::InvalidAddress(bind_address))?,
        };

        Ok(Self {
            bind_address,
            max_body_size,
        })
    }
}

/// Builder for [`HttpServer`]
pub struct HttpServerBuilder {
    application: Arc<ApplicationInstance>,
    config: Option<ServerConfig>,
    bind_address: Option<SocketAddr>,
    max_body_size: Option<usize>,
}

impl HttpServerBuilder {
    pub fn new(application: Arc<ApplicationInstance>) -> Self {
        Self {
            application,
            config: None,
            bind_address: None,
            max_body_size: None,
        }
    }

    /// Use the given settings instead of the application configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Build the server, reading unset settings from the application
    /// configuration
    pub fn build(self) -> Result<HttpServer> {
        let mut config = match self.config {
            Some(config) => config,
            None => ServerConfig::from_config(self.application.config())?,
        };
        if let Some(addr) = self.bind_address {
            config.bind_address = addr;
        }
        if let Some(size) = self.max_body_size {
            config.max_body_size = size;
        }
        Ok(HttpServer {
            config,
            application: self.application,
        })
    }
}

/// HTTP/1 server dispatching requests to an application
///
/// # Examples
///
/// ```rust,no_run
/// use werval_http_server::HttpServer;
/// use werval_runtime::ApplicationInstance;
///
/// # #[tokio::main]
/// # async fn main() -> werval_http_server::Result<()> {
/// let application = ApplicationInstance::builder().build()?;
/// let server = HttpServer::builder(application)
///     .bind_address("127.0.0.1:8080".parse().unwrap())
///     .build()?;
///
/// server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpServer {
    config: ServerConfig,
    application: Arc<ApplicationInstance>,
}

impl HttpServer {
    pub fn builder(application: Arc<ApplicationInstance>) -> HttpServerBuilder {
        HttpServerBuilder::new(application)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn application(&self) -> &Arc<ApplicationInstance> {
        &self.application
    }

    /// Bind the configured address and serve until the task is cancelled
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Bind the configured address and serve until `shutdown` completes
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections accepted by `listener` until `shutdown` completes
    ///
    /// Connections in flight when `shutdown` completes run to completion in
    /// their own tasks.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        info!("Werval HTTP server listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                () = &mut shutdown => {
                    info!("Werval HTTP server stopped accepting connections");
                    return Ok(());
                }
            };
            debug!("New connection from {}", peer_addr);

            let application = Arc::clone(&self.application);
            let max_body_size = self.config.max_body_size;
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    handle_request(Arc::clone(&application), peer_addr, max_body_size, req)
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

async fn handle_request(
    application: Arc<ApplicationInstance>,
    peer_addr: SocketAddr,
    max_body_size: usize,
    req: hyper::Request<hyper::body::Incoming>,
) -> std::result::Result<hyper::Response<ResponseBody>, Infallible> {
    debug!("Handling {} {}", req.method(), req.uri().path());

    let outcome = match read_request(req, peer_addr.ip(), max_body_size).await {
        Ok(request) => application.handle_request(request).await,
        Err(rejected) => rejected,
    };
    Ok(into_response(outcome))
}
