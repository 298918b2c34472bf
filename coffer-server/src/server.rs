use crate::config::Config;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use coffer_core::{
    CofferError, HashRing, Manager, MetadataStore, NodeStore, ObjectStatusOperation,
    ObjectStatusOutcome, PutObjectOperation, PutObjectOutcome, PutObjectRequest,
    ReadObjectOperation, ReadObjectOutcome, SelfHealer, DEFAULT_CONTENT_TYPE,
};
use serde::Serialize;
use std::sync::Arc;

/// Uploads above this size are rejected at the body-parsing layer; the
/// fan-out buffers the whole object in memory.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub struct ServerState {
    put_object: PutObjectOperation,
    read_object: ReadObjectOperation,
    object_status: ObjectStatusOperation,
    node_count: usize,
    replication: usize,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

pub async fn run_server(config: Config) -> coffer_core::Result<()> {
    let replication = config.replication.replication_factor;

    let metadata = Arc::new(MetadataStore::new(&config.storage.metadata_dir)?);
    let ring = Arc::new(HashRing::new(config.replication.virtual_nodes));
    let manager = Arc::new(Manager::new(ring.clone(), replication));

    for i in 1..=config.storage.node_count {
        let node_id = format!("node{}", i);
        let node_path = config.storage.data_dir.join(&node_id);
        let store = Arc::new(NodeStore::new(node_id.clone(), node_path.clone())?);
        ring.add_node(&node_id);
        manager.add_node(store);
        tracing::info!("registered storage node {} at {}", node_id, node_path.display());
    }

    let healer = Arc::new(SelfHealer::new(
        manager.clone(),
        metadata.clone(),
        replication,
    ));

    let state = Arc::new(ServerState {
        put_object: PutObjectOperation::new(manager.clone(), metadata.clone(), healer.clone()),
        read_object: ReadObjectOperation::new(manager.clone(), metadata.clone()),
        object_status: ObjectStatusOperation::new(manager, metadata, healer),
        node_count: config.storage.node_count,
        replication,
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/object/:id", get(get_object_handler))
        .route("/metadata/:id", get(get_metadata_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", error);
        return;
    }
    tracing::info!("shutting down");
}

fn error_response(error: &CofferError) -> Response {
    let status = match error {
        CofferError::ObjectNotFound(_) | CofferError::MetadataNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CofferError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
    };
    (status, Json(body)).into_response()
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "nodes": state.node_count,
        "replication": state.replication,
    });
    (StatusCode::OK, Json(response))
}

async fn upload_handler(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Response {
    let mut payload: Option<(Bytes, Option<String>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let content_type = field.content_type().map(|ct| ct.to_string());
                match field.bytes().await {
                    Ok(data) => {
                        payload = Some((data, content_type));
                        break;
                    }
                    Err(error) => {
                        return error_response(&CofferError::InvalidRequest(format!(
                            "failed to read upload: {}",
                            error
                        )));
                    }
                }
            }
            Ok(None) => break,
            Err(error) => {
                return error_response(&CofferError::InvalidRequest(format!(
                    "invalid multipart payload: {}",
                    error
                )));
            }
        }
    }
    let Some((data, content_type)) = payload else {
        return error_response(&CofferError::InvalidRequest(
            "missing 'file' field in upload".to_string(),
        ));
    };

    match state
        .put_object
        .run(PutObjectRequest { data, content_type })
        .await
    {
        Ok(PutObjectOutcome::Created(meta)) => (StatusCode::CREATED, Json(meta)).into_response(),
        Ok(PutObjectOutcome::AlreadyExists(meta)) => (StatusCode::OK, Json(meta)).into_response(),
        Err(error) => error_response(&error),
    }
}

async fn get_object_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.read_object.run(&id).await {
        Ok(ReadObjectOutcome::Found(result)) => {
            let content_type = result
                .meta
                .map(|meta| meta.content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            ([(header::CONTENT_TYPE, content_type)], result.body).into_response()
        }
        Ok(ReadObjectOutcome::NotFound) => error_response(&CofferError::ObjectNotFound(id)),
        Err(error) => error_response(&error),
    }
}

async fn get_metadata_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.object_status.run(&id).await {
        Ok(ObjectStatusOutcome::Found(meta)) => (StatusCode::OK, Json(meta)).into_response(),
        Ok(ObjectStatusOutcome::NotFound) => error_response(&CofferError::MetadataNotFound(id)),
        Err(error) => error_response(&error),
    }
}
