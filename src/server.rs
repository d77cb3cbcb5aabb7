//! HTTP API: text preview, synthesis and result logging.
//!
//! | Route                  | Body                | Response                          |
//! |------------------------|---------------------|-----------------------------------|
//! | `GET /api/health`      | –                   | `{"status","lexicon_entries"}`    |
//! | `POST /api/normalize`  | form `text`         | `{"original","normalized","tokens"}` |
//! | `POST /api/generate`   | form (text, ref_text, tuning, `ref_audio`) | `audio/wav` |
//! | `POST /api/save_result`| multipart + `audio` | `{"status","filename"}`           |
//!
//! Form bodies may be `multipart/form-data` or
//! `application/x-www-form-urlencoded`; files need multipart.
//!
//! Errors are `{"detail": "..."}` with status 400 (bad input) or 500.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    audio::encode_wav,
    config::ServerConfig,
    frontend::FrontEnd,
    normalize::Normalized,
    results::{ResultRecord, ResultStore},
    synth::{EngineCache, SynthesisRequest, Synthesizer},
};

/// Uploads (reference audio, saved results) may exceed axum's 2 MB default.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub synthesizer: Arc<Synthesizer>,
    pub engines: Arc<EngineCache>,
    pub results: Arc<ResultStore>,
}

impl AppState {
    /// Load the front end named by `config`.
    pub fn load(config: ServerConfig, engines: EngineCache) -> crate::Result<Self> {
        let front_end = FrontEnd::load(config.front_end_config())?;
        Ok(Self::from_parts(config, Arc::new(front_end), engines))
    }

    pub fn from_parts(config: ServerConfig, front_end: Arc<FrontEnd>, engines: EngineCache) -> Self {
        let synthesizer = Synthesizer::new(front_end, config.synthesis_config());
        let results = ResultStore::new(&config.results_dir());
        Self {
            config: Arc::new(config),
            synthesizer: Arc::new(synthesizer),
            engines: Arc::new(engines),
            results: Arc::new(results),
        }
    }

    pub fn front_end(&self) -> &Arc<FrontEnd> {
        self.synthesizer.front_end()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/normalize", post(normalize))
        .route("/api/generate", post(generate))
        .route("/api/save_result", post(save_result))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", e))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker task failed: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Request form
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Bytes>,
}

impl<S> FromRequest<S> for Form
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> ApiResult<Self> {
        let urlencoded = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
        if urlencoded {
            let axum::Form(fields) = axum::Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(format!("invalid form body: {}", e.body_text())))?;
            return Ok(Form { fields, files: HashMap::new() });
        }
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e.body_text())))?;
        Self::read(multipart).await
    }
}

impl Form {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Form::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else { continue };
            let is_file = field.file_name().is_some();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("cannot read field {}: {}", name, e)))?;
            if is_file {
                // browsers send an empty part when no file is chosen
                if !data.is_empty() {
                    form.files.insert(name, data);
                }
            } else {
                form.fields.insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
        Ok(form)
    }

    fn required(&self, name: &str) -> ApiResult<String> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::bad_request(format!("missing field: {}", name)))
    }

    fn text_or(&self, name: &str, default: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_else(|| default.to_string())
    }

    fn flag_or(&self, name: &str, default: bool) -> bool {
        match self.fields.get(name) {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    fn parse_or<T: FromStr>(&self, name: &str, default: T) -> ApiResult<T> {
        match self.fields.get(name) {
            Some(v) => parse_field(name, v),
            None => Ok(default),
        }
    }

    fn parse_required<T: FromStr>(&self, name: &str) -> ApiResult<T> {
        parse_field(name, &self.required(name)?)
    }
}

fn parse_field<T: FromStr>(name: &str, value: &str) -> ApiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid value for {}: {:?}", name, value)))
}

/// Uploaded reference audio, removed when dropped.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            warn!("Cannot remove {}: {}", self.0.display(), e);
        }
    }
}

async fn store_upload(dir: &Path, data: &[u8]) -> ApiResult<TempFile> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal(format!("cannot create {}: {}", dir.display(), e)))?;
    let path = dir.join(format!("temp_{}.wav", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ApiError::internal(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(TempFile(path))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "lexicon_entries": state.front_end().lexicon_len(),
    }))
}

#[derive(Debug, Serialize)]
struct NormalizeResponse {
    original: String,
    #[serde(flatten)]
    normalized: Normalized,
}

async fn normalize(State(state): State<AppState>, form: Form) -> ApiResult<Json<NormalizeResponse>> {
    let original = form.required("text")?;
    let normalized = state.front_end().normalize(&original);
    Ok(Json(NormalizeResponse { original, normalized }))
}

/// `text`, `ref_text` (required); `model_version` ("v1"), `use_norm` ("true"),
/// `use_auto_split` ("false"), `speed`, `step`, `cfg` (server defaults 1.0, 32,
/// 2.0) and an optional `ref_audio` file.
async fn generate(State(state): State<AppState>, form: Form) -> ApiResult<Response> {
    let text = form.required("text")?;
    let ref_text = form.required("ref_text")?;
    let model_version = form.text_or("model_version", "v1");
    let use_norm = form.flag_or("use_norm", true);
    let use_auto_split = form.flag_or("use_auto_split", false);
    let speed = form.parse_or("speed", state.config.default_speed)?;
    let step = form.parse_or("step", state.config.default_steps)?;
    let cfg = form.parse_or("cfg", state.config.default_cfg)?;

    let upload = match form.files.get("ref_audio") {
        Some(data) => Some(store_upload(&state.config.temp_dir(), data).await?),
        None => None,
    };
    let ref_audio = match &upload {
        Some(file) => file.0.clone(),
        None => state.config.default_ref_audio_path(),
    };
    if !ref_audio.exists() {
        return Err(ApiError::bad_request("Reference audio file not found."));
    }

    let preview: String = text.chars().take(50).collect();
    info!("Generating ({}): {}... (auto split: {})", model_version, preview, use_auto_split);

    let engine = state.engines.get(&model_version)?;
    let synthesizer = state.synthesizer.clone();
    let request = SynthesisRequest {
        text,
        ref_text,
        ref_audio,
        use_norm,
        use_auto_split,
        step,
        speed,
        cfg,
    };
    let wav = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
        let audio = synthesizer.synthesize(engine.as_ref(), &request)?;
        Ok(encode_wav(&audio)?)
    })
    .await??;
    drop(upload);

    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav).into_response())
}

async fn save_result(State(state): State<AppState>, form: Form) -> ApiResult<Json<Value>> {
    let record = ResultRecord {
        text: form.required("text")?,
        model_version: form.required("model_version")?,
        speed: form.parse_required("speed")?,
        step: form.parse_required("step")?,
        cfg: form.parse_required("cfg")?,
        gen_time: form.parse_required("gen_time")?,
    };
    let audio = form
        .files
        .get("audio")
        .cloned()
        .ok_or_else(|| ApiError::bad_request("missing file: audio"))?;

    let results = state.results.clone();
    let filename = tokio::task::spawn_blocking(move || results.save(&record, &audio)).await??;
    Ok(Json(json!({ "status": "success", "filename": filename })))
}
