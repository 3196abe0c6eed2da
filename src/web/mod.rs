//! HTML front end: routes, form payloads, pages and error mapping.

pub mod forms;
pub mod handlers;
pub mod views;

use crate::core::StoreError;
use crate::deploy::{DeployError, Deployer};
use crate::query::FilterError;
use crate::storage::RecordStore;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// `None` when no webhook secret is configured
    pub deployer: Option<Arc<Deployer>>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            deployer: None,
        }
    }

    pub fn with_deployer(mut self, deployer: Deployer) -> Self {
        self.deployer = Some(Arc::new(deployer));
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::healthcheck))
        .route("/read", get(handlers::list_records).post(handlers::query_records))
        .route("/create", get(handlers::create_form).post(handlers::create_record))
        .route(
            "/edit/:record_id",
            get(handlers::edit_form).post(handlers::edit_record),
        )
        .route("/delete/:record_id", get(handlers::delete_record))
        .route("/webhook", post(handlers::webhook))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum WebError {
    Filter(FilterError),
    Store(StoreError),
    Deploy(DeployError),
    Input(String),
    /// Body could not be read as a form; keeps axum's status (400, 413, 415, 422)
    Form(FormRejection),
    NotFound(String),
}

impl From<FormRejection> for WebError {
    fn from(err: FormRejection) -> Self {
        WebError::Form(err)
    }
}

impl From<FilterError> for WebError {
    fn from(err: FilterError) -> Self {
        WebError::Filter(err)
    }
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        WebError::Store(err)
    }
}

impl From<DeployError> for WebError {
    fn from(err: DeployError) -> Self {
        WebError::Deploy(err)
    }
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Filter(_) | WebError::Input(_) => StatusCode::BAD_REQUEST,
            WebError::Store(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            WebError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Deploy(DeployError::MissingSignature | DeployError::InvalidSignature) => {
                StatusCode::UNAUTHORIZED
            }
            WebError::Deploy(DeployError::Spawn { .. }) => StatusCode::BAD_GATEWAY,
            WebError::Deploy(DeployError::InvalidSecret(_) | DeployError::Task(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebError::Form(rejection) => rejection.status(),
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Text shown to the user. Server-side failures stay generic.
    pub fn message(&self) -> String {
        match self {
            WebError::Filter(err) => err.to_string(),
            WebError::Store(err) if err.is_client_error() => err.to_string(),
            WebError::Store(_) => "storage error".to_string(),
            WebError::Deploy(DeployError::Spawn { .. }) => "deploy command failed".to_string(),
            WebError::Deploy(DeployError::InvalidSecret(_)) => "webhook misconfigured".to_string(),
            WebError::Deploy(DeployError::Task(_)) => "deploy failed".to_string(),
            WebError::Deploy(err) => err.to_string(),
            WebError::Form(rejection) => rejection.body_text(),
            WebError::Input(msg) | WebError::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = ?self, "request rejected");
        }

        (status, Html(views::error(status, &message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
