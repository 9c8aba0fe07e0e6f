// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use tower_http::cors::CorsLayer;

use crate::extract::outline;
use crate::format::xml::{parse_document, serialize_document};
use crate::llm::{ModelClient, ModelError};
use crate::model::{CellKind, DiagramId, Document, DocumentError, IdError};
use crate::orchestrator::{Orchestrator, OrchestratorConfig, StreamEvent};
use crate::store::{DiagramStore, DiagramUpdate, StoreError};

use super::types::*;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Orchestrator<dyn ModelClient>,
    store: Arc<DiagramStore>,
    model_name: String,
}

impl AppState {
    pub fn new(model: Arc<dyn ModelClient>, config: OrchestratorConfig, model_name: impl Into<String>) -> Self {
        Self {
            orchestrator: Orchestrator::new(model, config),
            store: Arc::new(DiagramStore::new()),
            model_name: model_name.into(),
        }
    }

    pub fn store(&self) -> &Arc<DiagramStore> {
        &self.store
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    NotFound(#[from] StoreError),
    #[error("invalid diagram id: {0}")]
    InvalidId(#[from] IdError),
    #[error("stored diagram is malformed: {0}")]
    Malformed(#[from] DocumentError),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::EmptyMessage => StatusCode::BAD_REQUEST,
            Self::Model(ModelError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Model(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Every route; the API lives under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/generate-diagram", post(generate_diagram))
        .route("/generate-diagram/stream", post(generate_diagram_stream))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/diagrams", post(create_diagram))
        .route("/diagrams/{id}", get(get_diagram).put(update_diagram).delete(delete_diagram))
        .route("/diagrams/{id}/outline", get(diagram_outline));

    Router::new()
        .route("/", get(welcome))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        name: "FlowGen".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        api: "/api/v1".to_owned(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        model: state.model_name.clone(),
        diagrams: state.store.len().await,
    })
}

/// Ids that do not validate are treated as unknown.
fn stored_id(raw: Option<&str>) -> Option<DiagramId> {
    raw.and_then(|raw| DiagramId::new(raw).ok())
}

async fn generate_diagram(
    State(state): State<AppState>,
    Json(body): Json<GenerateDiagramRequest>,
) -> Json<GenerateDiagramResponse> {
    tracing::info!(
        diagram_type = %body.diagram_type,
        incremental = body.current_drawio.is_some() && !body.full_regeneration,
        "generate request"
    );
    let response = state.orchestrator.generate(&body.to_generate_request()).await;

    let diagram = if response.success {
        let id = stored_id(body.diagram_id.as_deref());
        let record = state.store.save(id.as_ref(), &body.diagram_type, &response.content).await;
        Some(DiagramInfo::from(record))
    } else {
        None
    };

    Json(GenerateDiagramResponse {
        analysis: response.analysis,
        content: response.content,
        success: response.success,
        diagram,
    })
}

async fn generate_diagram_stream(
    State(state): State<AppState>,
    Json(body): Json<GenerateDiagramRequest>,
) -> Response {
    tracing::info!(diagram_type = %body.diagram_type, "streamed generate request");
    let events = state.orchestrator.generate_streaming(body.to_generate_request());

    let store = Arc::clone(&state.store);
    let id = stored_id(body.diagram_id.as_deref());
    let diagram_type = body.diagram_type;
    let frames = events.then(move |event| {
        let store = Arc::clone(&store);
        let id = id.clone();
        let diagram_type = diagram_type.clone();
        async move {
            if let StreamEvent::Final { success: true, content, .. } = &event {
                store.save(id.as_ref(), &diagram_type, content).await;
            }
            Ok::<_, Infallible>(event.to_sse_frame())
        }
    });

    event_stream(frames)
}

fn event_stream<S>(frames: S) -> Response
where
    S: futures::Stream<Item = Result<String, Infallible>> + Send + 'static,
{
    (
        [(header::CONTENT_TYPE, "text/event-stream"), (header::CACHE_CONTROL, "no-cache")],
        Body::from_stream(frames),
    )
        .into_response()
}

fn chat_message(body: ChatRequest) -> Result<String, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    Ok(body.message)
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = chat_message(body)?;
    tracing::info!(message_chars = message.chars().count(), "chat request");
    let reply = state.orchestrator.chat(&message).await?;
    Ok(Json(reply.into()))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = chat_message(body)?;
    tracing::info!(message_chars = message.chars().count(), "streamed chat request");
    let frames =
        state.orchestrator.chat_streaming(message).map(|event| Ok::<_, Infallible>(event.to_sse_frame()));
    Ok(event_stream(frames))
}

async fn create_diagram(
    State(state): State<AppState>,
    Json(body): Json<CreateDiagramRequest>,
) -> (StatusCode, Json<DiagramInfo>) {
    let content = body.content.unwrap_or_else(|| serialize_document(&Document::empty()));
    let record = state.store.create(body.diagram_type, content).await;
    (StatusCode::CREATED, Json(record.into()))
}

async fn get_diagram(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DiagramInfo>, ApiError> {
    let id = DiagramId::new(id)?;
    Ok(Json(state.store.get(&id).await?.into()))
}

async fn update_diagram(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDiagramRequest>,
) -> Result<Json<DiagramInfo>, ApiError> {
    let id = DiagramId::new(id)?;
    let update = DiagramUpdate { diagram_type: body.diagram_type, content: body.content };
    Ok(Json(state.store.update(&id, update).await?.into()))
}

async fn delete_diagram(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDiagramResponse>, ApiError> {
    let id = DiagramId::new(id)?;
    let record = state.store.delete(&id).await?;
    Ok(Json(DeleteDiagramResponse { id: record.id.into_string(), deleted: true }))
}

async fn diagram_outline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutlineResponse>, ApiError> {
    let id = DiagramId::new(id)?;
    let record = state.store.get(&id).await?;
    let doc = parse_document(&record.content)?;
    let cells = doc.cells();
    let max_chars = state.orchestrator.config().extract.max_chars;

    Ok(Json(OutlineResponse {
        id: record.id.into_string(),
        outline: outline(&doc, max_chars),
        vertices: cells.iter().filter(|cell| cell.kind == CellKind::Vertex).count(),
        edges: cells.iter().filter(|cell| cell.kind == CellKind::Edge).count(),
    }))
}

#[cfg(test)]
mod tests;
