use crate::error::ApiError;
use crate::filter::{filter_items, paginate, parse_page, PagedResponse};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use lattice_config::Dependency;
use std::collections::HashMap;

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PagedResponse<Dependency>>, ApiError> {
    let mut items = state.dependencies.get_all().await?;
    items.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    let items = filter_items(&params, items)?;
    let (page_num, page_size) = parse_page(&params);
    Ok(Json(paginate(items, page_num, page_size)))
}

pub(crate) async fn add(
    State(state): State<AppState>,
    Json(dependency): Json<Dependency>,
) -> Result<&'static str, ApiError> {
    state.dependencies.add(&dependency).await?;
    Ok("OK")
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<Dependency>, ApiError> {
    Ok(Json(state.dependencies.get(&service).await?))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(service): Path<String>,
    Json(mut dependency): Json<Dependency>,
) -> Result<&'static str, ApiError> {
    dependency.service_name = service;
    state.dependencies.update(&dependency).await?;
    Ok("OK")
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<&'static str, ApiError> {
    state.dependencies.delete(&service).await?;
    Ok("OK")
}
