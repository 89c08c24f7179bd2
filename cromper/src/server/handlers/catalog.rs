//! Read-only catalog introspection.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cromper_core::catalog::{Flag, LibraryVersions};
use cromper_core::{Compiler, Platform};
use serde::{Deserialize, Serialize};

use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlatformView {
    #[serde(flatten)]
    pub platform: &'static Platform,
    /// Ids of the provisioned compilers for this platform
    pub compilers: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CompilerView {
    #[serde(flatten)]
    pub compiler: &'static Compiler,
    pub flags: &'static [Flag],
}

#[derive(Debug, Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<PlatformView>,
}

#[derive(Debug, Serialize)]
pub struct CompilersResponse {
    pub compilers: Vec<CompilerView>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibrariesResponse {
    pub libraries: Vec<LibraryVersions>,
}

fn platform_view(state: &AppState, platform: &'static Platform) -> PlatformView {
    PlatformView {
        platform,
        compilers: state
            .registry
            .compilers_for_platform(platform.id, true)
            .into_iter()
            .map(|c| c.id)
            .collect(),
    }
}

fn compiler_view(compiler: &'static Compiler) -> CompilerView {
    CompilerView {
        compiler,
        flags: compiler.flags(),
    }
}

/// Platforms with at least one provisioned compiler
pub async fn list_platforms(State(state): State<AppState>) -> Json<PlatformsResponse> {
    let platforms = state
        .registry
        .available_platforms()
        .into_iter()
        .map(|p| platform_view(&state, p))
        .collect();
    Json(PlatformsResponse { platforms })
}

pub async fn get_platform(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PlatformView>> {
    let platform = state.registry.platform(&id).map_err(ApiError::not_found)?;
    Ok(Json(platform_view(&state, platform)))
}

pub async fn list_compilers(State(state): State<AppState>) -> Json<CompilersResponse> {
    let compilers = state
        .registry
        .available_compilers()
        .into_iter()
        .map(compiler_view)
        .collect();
    Json(CompilersResponse { compilers })
}

pub async fn platform_compilers(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
) -> ApiResult<Json<CompilersResponse>> {
    let platform = state.registry.platform(&platform_id).map_err(ApiError::not_found)?;
    let compilers = state
        .registry
        .compilers_for_platform(platform.id, true)
        .into_iter()
        .map(compiler_view)
        .collect();
    Ok(Json(CompilersResponse { compilers }))
}

pub async fn get_compiler(
    State(state): State<AppState>,
    Path((platform_id, compiler_id)): Path<(String, String)>,
) -> ApiResult<Json<CompilerView>> {
    let compiler = state
        .registry
        .available_compiler(&compiler_id)
        .map_err(ApiError::not_found)?;
    if compiler.platform != platform_id {
        return Err(ApiError::NotFound(format!(
            "Compiler {} does not target platform {}",
            compiler_id, platform_id
        )));
    }
    Ok(Json(compiler_view(compiler)))
}

pub async fn list_libraries(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> ApiResult<Json<LibrariesResponse>> {
    let platform_id = query
        .platform
        .ok_or_else(|| ApiError::BadRequest("Missing platform query parameter".to_string()))?;
    let platform = state.registry.platform(&platform_id).map_err(ApiError::not_found)?;
    Ok(Json(LibrariesResponse {
        libraries: state.registry.libraries(platform.id),
    }))
}
