//! Compile, assemble, diff and decompile.
//!
//! Compile, assemble and decompile run as pool jobs. A job that times out or
//! fails inside its worker still answers 200, with the failure text in place
//! of a result.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use cromper_compiler::{AssembleRequest, AssemblyResult, CompilationResult, CompileRequest};
use cromper_core::hash::content_hash;
use cromper_diff::{DiffError, DiffResult};
use cromper_executor::{JobAction, PoolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::decompiler::{self, DecompileRequest, DecompileResult};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: CompilationResult,
}

#[derive(Debug, Serialize)]
pub struct AssembleResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: AssemblyResult,
}

#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub platform_id: String,
    #[serde(with = "cromper_core::serde_b64")]
    pub target_elf: Vec<u8>,
    #[serde(default, with = "cromper_core::serde_b64")]
    pub compiled_elf: Vec<u8>,
    #[serde(default)]
    pub diff_label: Option<String>,
    #[serde(default)]
    pub diff_flags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiffResponse {
    pub success: bool,
    pub result: Option<DiffResult>,
    pub errors: String,
}

#[derive(Debug, Serialize)]
pub struct DecompileResponse {
    pub success: bool,
    pub decompiled_code: String,
}

pub async fn compile(
    State(state): State<AppState>,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> ApiResult<Json<CompileResponse>> {
    let Json(req) = payload?;
    let compiler = state.registry.available_compiler(&req.compiler_id)?;
    state
        .registry
        .library_include_paths(compiler.platform, &req.libraries)?;

    let result = match run_job::<_, CompilationResult>(&state, JobAction::Compile, &req).await? {
        Ok(result) => result,
        Err(message) => CompilationResult::failed(message),
    };
    Ok(Json(CompileResponse {
        success: result.success(),
        result,
    }))
}

pub async fn assemble(
    State(state): State<AppState>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> ApiResult<Json<AssembleResponse>> {
    let Json(req) = payload?;
    let platform = state.registry.platform(&req.platform_id)?;

    let result = match run_job::<_, AssemblyResult>(&state, JobAction::Assemble, &req).await? {
        Ok(result) => result,
        Err(message) => AssemblyResult {
            hash: content_hash(&[req.asm_data.as_bytes()]),
            arch: platform.arch.to_string(),
            elf_object: Vec::new(),
            errors: message,
        },
    };
    Ok(Json(AssembleResponse {
        success: result.success(),
        result,
    }))
}

pub async fn diff(
    State(state): State<AppState>,
    payload: Result<Json<DiffRequest>, JsonRejection>,
) -> ApiResult<Json<DiffResponse>> {
    let Json(req) = payload?;
    let platform = state.registry.platform(&req.platform_id)?;

    let permit = Arc::clone(&state.diff_permits)
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    let differ = Arc::clone(&state.differ);
    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        differ.diff(
            &req.target_elf,
            &req.compiled_elf,
            platform,
            req.diff_label.as_deref(),
            &req.diff_flags,
        )
    })
    .await?;

    match outcome {
        Ok(result) => Ok(Json(DiffResponse {
            success: true,
            result: Some(result),
            errors: String::new(),
        })),
        Err(DiffError::EmptyTarget) => Err(ApiError::BadRequest(DiffError::EmptyTarget.to_string())),
        Err(e) => {
            tracing::warn!("Diff on {} failed: {}", platform.id, e);
            Ok(Json(DiffResponse {
                success: false,
                result: None,
                errors: e.to_string(),
            }))
        }
    }
}

pub async fn decompile(
    State(state): State<AppState>,
    payload: Result<Json<DecompileRequest>, JsonRejection>,
) -> ApiResult<Json<DecompileResponse>> {
    let Json(req) = payload?;
    state.registry.platform(&req.platform_id)?;
    state.registry.compiler(&req.compiler_id)?;

    let decompiled_code = match run_job::<_, DecompileResult>(&state, JobAction::Decompile, &req).await? {
        Ok(result) => result.decompiled_code,
        Err(message) => decompiler::failure_source(&req.default_source_code, &message),
    };
    Ok(Json(DecompileResponse {
        success: true,
        decompiled_code,
    }))
}

/// Submit a job and wait for it off the async runtime.
///
/// The inner `Err` carries text for a degraded result (timeout, lost worker
/// or a failure inside the job); the outer one is an HTTP error.
async fn run_job<P, R>(state: &AppState, action: JobAction, payload: &P) -> ApiResult<Result<R, String>>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let payload = serde_json::to_value(payload).map_err(|e| ApiError::Internal(e.to_string()))?;
    let jobs = Arc::clone(&state.jobs);
    let timeout = state.job_timeout(action);
    let outcome = tokio::task::spawn_blocking(move || jobs.dispatch(action, payload, timeout)).await?;

    match outcome {
        Ok(value) => serde_json::from_value(value)
            .map(Ok)
            .map_err(|e| ApiError::Internal(format!("Malformed {} result: {}", action, e))),
        Err(e) if e.is_timeout() => {
            tracing::warn!("{} job returned default result: {}", action, e);
            Ok(Err(timeout_message(action).to_string()))
        }
        Err(PoolError::Job { message, .. }) => {
            tracing::warn!("{} job failed: {}", action, message);
            Ok(Err(message))
        }
        Err(e) => Err(e.into()),
    }
}

fn timeout_message(action: JobAction) -> &'static str {
    match action {
        JobAction::Compile => "Compilation timeout expired",
        JobAction::Assemble => "Assembly timeout expired",
        JobAction::Decompile => "Decompilation timeout expired",
    }
}
