//! The application: configuration in, HTTP listener out.
//!
//! `App` wires the default collaborators, owns the stage list and runs the
//! pipeline for every request received by its axum listener. Requests can
//! also be dispatched in-process with [`App::handle`].

use crate::config::{AppOptions, ListenOptions};
use crate::context::{RequestContext, ResponseContext};
use crate::errors::SitepipeError;
use crate::events::{EventSink, LoggingEventSink};
use crate::pipeline::{DefaultErrorHandler, ErrorHandler, Pipeline};
use crate::services::SiteServices;
use crate::stages::{default_stages, Stage};
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};


/// A configured site, optionally listening for HTTP requests.
pub struct App {
    services: Arc<SiteServices>,
    stages: Vec<Arc<dyn Stage>>,
    error_handler: Arc<dyn ErrorHandler>,
    event_sink: Arc<dyn EventSink>,
    listen: ListenOptions,
    max_body_bytes: usize,
    server: Option<RunningServer>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

#[derive(Clone)]
struct ServerState {
    pipeline: Arc<Pipeline>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("listen", &self.listen)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Creates an application.
    ///
    /// An explicit stage list in `options` replaces the seven default stages
    /// entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the site roots cannot be resolved.
    pub fn new(options: AppOptions) -> Result<Self, SitepipeError> {
        let AppOptions {
            router,
            request_parser,
            listen,
            stages,
            controllers,
            route_matcher,
            request_parser_impl,
            static_transport,
            error_handler,
            event_sink,
        } = options;

        let max_body_bytes = request_parser.max_body_bytes;
        let mut services = SiteServices::new(router, request_parser, controllers)?;
        if let Some(matcher) = route_matcher {
            services = services.with_route_matcher(matcher);
        }
        if let Some(parser) = request_parser_impl {
            services = services.with_request_parser(parser);
        }
        if let Some(transport) = static_transport {
            services = services.with_static_transport(transport);
        }
        let services = Arc::new(services);

        Ok(Self {
            stages: stages.unwrap_or_else(|| default_stages(&services)),
            error_handler: error_handler.unwrap_or_else(|| {
                Arc::new(DefaultErrorHandler::with_services(Arc::clone(&services)))
            }),
            event_sink: event_sink.unwrap_or_else(|| Arc::new(LoggingEventSink::default())),
            services,
            listen,
            max_body_bytes,
            server: None,
        })
    }

    /// Returns the shared services.
    #[must_use]
    pub fn services(&self) -> &Arc<SiteServices> {
        &self.services
    }

    /// Returns the configured stages in order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Inserts a stage at `index`, or at the end if `index` is past it.
    ///
    /// Takes effect for listeners started afterwards and for in-process calls.
    pub fn insert_stage(&mut self, index: usize, stage: Arc<dyn Stage>) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
    }

    /// Builds the pipeline for the current stage list.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.stages.clone())
            .with_error_handler(Arc::clone(&self.error_handler))
            .with_event_sink(Arc::clone(&self.event_sink))
    }

    /// Runs one request through the pipeline in-process.
    pub async fn handle(&self, req: RequestContext) -> ResponseContext {
        dispatch(&self.pipeline(), req).await
    }

    /// Returns the bound address while the listener is running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.addr)
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// Returns once the socket is bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the app is already listening or the address cannot
    /// be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, SitepipeError> {
        if self.server.is_some() {
            return Err(SitepipeError::Server("already started".to_string()));
        }

        let listener = TcpListener::bind(self.listen.address()).await?;
        let addr = listener.local_addr()?;

        let state = ServerState {
            pipeline: Arc::new(self.pipeline()),
            max_body_bytes: self.max_body_bytes,
        };
        let router = Router::new()
            .fallback(serve_request)
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!(address = %addr, stages = self.stages.len(), "sitepipe listening");
        self.server = Some(RunningServer {
            addr,
            shutdown,
            handle,
        });
        Ok(addr)
    }

    /// Stops the listener and waits for in-flight requests to finish.
    ///
    /// Stopping an app that is not listening does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed.
    pub async fn stop(&mut self) -> Result<(), SitepipeError> {
        let Some(server) = self.server.take() else {
            return Ok(());
        };

        let _ = server.shutdown.send(());
        server
            .handle
            .await
            .map_err(|err| SitepipeError::Server(err.to_string()))??;

        info!(address = %server.addr, "sitepipe stopped");
        Ok(())
    }
}

async fn serve_request(State(state): State<ServerState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(uri = %parts.uri, error = %err, "Could not read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large").into_response();
        }
    };

    let req = RequestContext::new(parts.method, parts.uri, parts.headers, bytes);
    dispatch(&state.pipeline, req).await.into_response()
}

async fn dispatch(pipeline: &Pipeline, mut req: RequestContext) -> ResponseContext {
    let span = info_span!(
        "request",
        request_id = %req.request_id(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let mut res = ResponseContext::new();
        let report = pipeline.run(&mut req, &mut res).await;
        info!(
            status = res.status().as_u16(),
            duration_ms = report.duration_ms,
            "{}request complete",
            req.log_context()
        );
        res
    }
    .instrument(span)
    .await
}
