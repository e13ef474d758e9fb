//! Unix-socket dispatch loop. Stands in for the QUIC-framed RPC transport
//! (spec §4.E): each request is a length-prefixed JSON [`Envelope`],
//! dispatched into a [`ServiceFacade`] and answered with a length-prefixed
//! JSON [`Response`] on the same connection.

use crate::token::TokenResolver;
use crate::types::{CreateBranchParams, DeleteBranchParams, Envelope, ListBranchesParams, Response};
use anyhow::{Context, Result};
use quic_service::ServiceFacade;
use quic_template::{LogLevel, ProgressSink, TemplateSetupRequest, TemplateSetupResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

pub fn encode_length_prefixed_json<T: serde::Serialize>(data: &T) -> Result<Vec<u8>> {
    let json_bytes = serde_json::to_vec(data)?;
    let len = json_bytes.len() as u32;
    let mut out = Vec::with_capacity(4 + json_bytes.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    Ok(out)
}

async fn read_frame(stream: &mut UnixStream) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.context("reading request payload")?;
    Ok(Some(payload))
}

/// Collects a progress stream into a single response rather than pushing
/// incremental frames; this transport's minimal RPC surface answers
/// `TemplateSetup` once the whole run finishes (spec §6's `Log` stream is
/// the richer shape a real RPC transport would expose instead).
struct CollectingSink {
    lines: Vec<String>,
    result: Option<TemplateSetupResult>,
    failure: Option<(String, String)>,
}

impl CollectingSink {
    fn new() -> Self {
        Self { lines: Vec::new(), result: None, failure: None }
    }
}

#[async_trait::async_trait]
impl ProgressSink for CollectingSink {
    async fn log(&mut self, line: &str, level: LogLevel) {
        let prefix = match level {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        };
        self.lines.push(format!("[{prefix}] {line}"));
    }

    async fn error(&mut self, step: &str, message: &str) {
        self.failure = Some((step.to_string(), message.to_string()));
    }

    async fn result(&mut self, result: TemplateSetupResult) {
        self.result = Some(result);
    }
}

pub struct AgentServer {
    socket_path: PathBuf,
    facade: ServiceFacade,
    tokens: Arc<dyn TokenResolver>,
}

impl AgentServer {
    pub fn bind(socket_path: PathBuf, facade: ServiceFacade, tokens: Arc<dyn TokenResolver>) -> Result<(Self, UnixListener)> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("creating socket directory")?;
        }
        if socket_path.exists() {
            std::fs::remove_file(&socket_path).context("removing stale socket")?;
        }
        let listener = UnixListener::bind(&socket_path).with_context(|| format!("binding {}", socket_path.display()))?;
        info!(socket = %socket_path.display(), "agent listening");
        Ok((Self { socket_path, facade, tokens }, listener))
    }

    pub async fn serve(&self, listener: UnixListener) {
        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let facade = self.facade.clone();
                    let tokens = self.tokens.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, facade, tokens).await {
                            error!(error = %e, "client connection ended with an error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "error accepting connection"),
            }
        }
    }

    pub fn remove_socket(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

async fn handle_connection(mut stream: UnixStream, facade: ServiceFacade, tokens: Arc<dyn TokenResolver>) -> Result<()> {
    while let Some(payload) = read_frame(&mut stream).await? {
        let response = match serde_json::from_slice::<Envelope>(&payload) {
            Ok(envelope) => dispatch(envelope, &facade, tokens.as_ref()).await,
            Err(e) => Response::error("INVALID_ENVELOPE", e.to_string()),
        };
        let encoded = encode_length_prefixed_json(&response)?;
        stream.write_all(&encoded).await.context("writing response frame")?;
        stream.flush().await?;
    }
    debug!("client disconnected");
    Ok(())
}

async fn dispatch(envelope: Envelope, facade: &ServiceFacade, tokens: &dyn TokenResolver) -> Response {
    let caller = match tokens.resolve(&envelope.bearer_token).await {
        Some(caller) => caller,
        None => return Response::error("UNAUTHENTICATED", "unknown or expired bearer token"),
    };

    match envelope.method.as_str() {
        "create_branch" => dispatch_create_branch(envelope.params, facade, &caller).await,
        "delete_branch" => dispatch_delete_branch(envelope.params, facade).await,
        "list_branches" => dispatch_list_branches(envelope.params, facade).await,
        "template_setup" => dispatch_template_setup(envelope.params, facade).await,
        other => Response::error("UNKNOWN_METHOD", format!("no such method: {other}")),
    }
}

async fn dispatch_create_branch(params: serde_json::Value, facade: &ServiceFacade, caller: &str) -> Response {
    let params: CreateBranchParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return Response::error("INVALID_PARAMS", e.to_string()),
    };
    match facade.create_branch(&params.branch_name, &params.template_name, caller).await {
        Ok(info) => match serde_json::to_value(info) {
            Ok(value) => Response::ok(value),
            Err(e) => Response::error("INTERNAL", e.to_string()),
        },
        Err(e) => Response::error(e.kind().as_str(), e.to_string()),
    }
}

async fn dispatch_delete_branch(params: serde_json::Value, facade: &ServiceFacade) -> Response {
    let params: DeleteBranchParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return Response::error("INVALID_PARAMS", e.to_string()),
    };
    match facade.delete_branch(&params.branch_name, &params.template_name).await {
        Ok(deleted) => Response::ok(serde_json::json!({ "deleted": deleted })),
        Err(e) => Response::error(e.kind().as_str(), e.to_string()),
    }
}

async fn dispatch_list_branches(params: serde_json::Value, facade: &ServiceFacade) -> Response {
    let params: ListBranchesParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return Response::error("INVALID_PARAMS", e.to_string()),
    };
    let summaries = facade.list_branches(params.template_name.as_deref()).await;
    match serde_json::to_value(summaries) {
        Ok(value) => Response::ok(value),
        Err(e) => Response::error("INTERNAL", e.to_string()),
    }
}

async fn dispatch_template_setup(params: serde_json::Value, facade: &ServiceFacade) -> Response {
    let request: TemplateSetupRequest = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return Response::error("INVALID_PARAMS", e.to_string()),
    };
    let mut sink = CollectingSink::new();
    match facade.template_setup_stream(request, &mut sink).await {
        Ok(_result) => {
            let result = sink.result.expect("ProgressSink::result is always called on success");
            Response::ok(serde_json::json!({ "result": result, "log": sink.lines }))
        }
        Err(e) => {
            let (step, message) = sink.failure.unwrap_or_else(|| ("unknown".to_string(), e.to_string()));
            Response::error(e.kind().as_str(), format!("{step}: {message}"))
        }
    }
}
