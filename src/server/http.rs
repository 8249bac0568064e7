//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection.

use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{IdentityResolver, JwtValidator};
use crate::config::Args;
use crate::content::{GalleryService, UploadTracker};
use crate::objects::ObjectStore;
use crate::routes::{
    self, error_response, not_found_response, preflight_response, HttpResponse,
};
use crate::sessions::{self, EditSessions};
use crate::store::DocumentStore;
use crate::types::{Result, SiteError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub identity: IdentityResolver,
    pub sessions: Arc<EditSessions>,
    pub gallery: GalleryService,
    /// Backend name reported by `/health` (`mongodb` or `memory`)
    pub store_kind: &'static str,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn DocumentStore>,
        store_kind: &'static str,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let jwt = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone())?,
            (None, true) => JwtValidator::new_dev(),
            (None, false) => {
                return Err(SiteError::Config("JWT_SECRET is required in production".into()))
            }
        };
        let identity = IdentityResolver::new(jwt, args.admin_allowlist(), args.dev_mode);
        let sessions = Arc::new(EditSessions::new(args.edit_session_idle()));
        let gallery = GalleryService::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            Arc::new(UploadTracker::new()),
        );

        Ok(Self {
            args,
            store,
            objects,
            identity,
            sessions,
            gallery,
            store_kind,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Lantern listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - every caller is treated as an admin");
    }

    sessions::spawn_cleanup_task(Arc::clone(&state.sessions));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move {
                            Ok::<_, std::convert::Infallible>(handle_request(state, req).await)
                        }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route an HTTP request; errors become JSON error responses
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let result = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => Ok(preflight_response()),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            Ok(routes::health_check(&state))
        }
        (&Method::GET, p) if p.starts_with("/api/") => {
            routes::handle_public_request(&state, p).await
        }
        (&Method::GET, p) if p.starts_with("/objects/") => routes::serve_object(&state, p).await,
        (_, p) if p.starts_with("/admin/") => {
            routes::handle_admin_request(Arc::clone(&state), req).await
        }
        _ => Ok(not_found_response(&path)),
    };

    match result {
        Ok(response) => {
            info!(method = %method, path = %path, status = response.status().as_u16(), "Handled request");
            response
        }
        Err(e) => {
            let response = error_response(&e);
            info!(method = %method, path = %path, status = response.status().as_u16(), "Request failed");
            response
        }
    }
}
