use std::error::Error as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use label_logic::{Boundary, LabelError, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::preview;

pub struct AppState {
    session: Mutex<Session>,
    max_height: u32,
    quit: Notify,
}

impl AppState {
    pub fn new(session: Session, max_height: u32) -> Self {
        Self {
            session: Mutex::new(session),
            max_height,
            quit: Notify::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Session> {
        // Session methods restore state before returning errors.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves once the user asked to close the session.
    pub async fn quit_requested(&self) {
        self.quit.notified().await
    }

    fn view(&self, session: &Session, message: Option<String>) -> ApiResult<View> {
        let record = session.current().map_err(api_error)?;
        let available = session.is_available();
        let mut message = message;

        let preview = if available {
            match preview::data_url(&record.path, self.max_height) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(path = %record.path.display(), error = %e, "cannot display image");
                    message.get_or_insert_with(|| format!("cannot display image: {e}"));
                    None
                }
            }
        } else {
            message.get_or_insert_with(|| "image file is missing".to_string());
            None
        };

        let progress = session.progress();
        Ok(View {
            position: progress.position,
            count: progress.count,
            labeled: progress.labeled,
            labels: session.labels().to_vec(),
            current: CurrentImage {
                path: record.path.to_string_lossy().to_string(),
                label: record.label.clone(),
                available,
            },
            message,
            preview,
        })
    }
}

type SharedState = Arc<AppState>;
type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Serialize, Deserialize)]
pub struct View {
    pub position: usize,
    pub count: usize,
    pub labeled: usize,
    pub labels: Vec<String>,
    pub current: CurrentImage,
    pub message: Option<String>,
    pub preview: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentImage {
    pub path: String,
    pub label: Option<String>,
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

fn api_error(e: LabelError) -> (StatusCode, Json<ApiError>) {
    let status = match e {
        LabelError::InvalidLabel(_) | LabelError::IndexOutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    warn!(kind = e.kind(), "{message}");

    (
        status,
        Json(ApiError {
            error: e.kind().to_string(),
            message,
        }),
    )
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/state", get(get_state))
        .route("/api/vote", post(vote))
        .route("/api/next", post(next))
        .route("/api/prev", post(prev))
        .route("/api/jump", post(jump_to_unlabeled))
        .route("/api/seek", post(seek))
        .route("/api/quit", post(quit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../index.html"))
}

async fn get_state(State(state): State<SharedState>) -> ApiResult<Json<View>> {
    let session = state.lock();
    state.view(&session, None).map(Json)
}

/// Either a label name or its 1-based keyboard shortcut.
#[derive(Deserialize)]
#[serde(untagged)]
enum VoteReq {
    Label { label: String },
    Key { key: usize },
}

async fn vote(
    State(state): State<SharedState>,
    Json(payload): Json<VoteReq>,
) -> ApiResult<Json<View>> {
    let mut session = state.lock();
    let vote = match payload {
        VoteReq::Label { label } => session.vote(&label),
        VoteReq::Key { key } => session.vote_key(key),
    }
    .map_err(api_error)?;
    let message = vote.boundary.map(|b| b.to_string());
    state.view(&session, message).map(Json)
}

fn moved(
    state: &AppState,
    session: &Session,
    boundary: Option<Boundary>,
) -> ApiResult<Json<View>> {
    state.view(session, boundary.map(|b| b.to_string())).map(Json)
}

async fn next(State(state): State<SharedState>) -> ApiResult<Json<View>> {
    let mut session = state.lock();
    let boundary = session.next();
    moved(&state, &session, boundary)
}

async fn prev(State(state): State<SharedState>) -> ApiResult<Json<View>> {
    let mut session = state.lock();
    let boundary = session.prev();
    moved(&state, &session, boundary)
}

async fn jump_to_unlabeled(State(state): State<SharedState>) -> ApiResult<Json<View>> {
    let mut session = state.lock();
    let boundary = session.jump_to_unlabeled();
    moved(&state, &session, boundary)
}

#[derive(Deserialize)]
struct SeekReq {
    position: usize,
}

async fn seek(
    State(state): State<SharedState>,
    Json(payload): Json<SeekReq>,
) -> ApiResult<Json<View>> {
    let mut session = state.lock();
    session.seek(payload.position).map_err(api_error)?;
    moved(&state, &session, None)
}

async fn quit(State(state): State<SharedState>) -> StatusCode {
    state.quit.notify_one();
    StatusCode::OK
}
