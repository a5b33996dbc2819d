use crate::error::ApiError;
use crate::filter::{filter_items, paginate, parse_page, PagedResponse};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use lattice_config::ProxyConfig;
use std::collections::HashMap;

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PagedResponse<ProxyConfig>>, ApiError> {
    let mut items = state.proxy_configs.get_all().await?;
    items.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    let items = filter_items(&params, items)?;
    let (page_num, page_size) = parse_page(&params);
    Ok(Json(paginate(items, page_num, page_size)))
}

pub(crate) async fn add(
    State(state): State<AppState>,
    Json(proxy_config): Json<ProxyConfig>,
) -> Result<&'static str, ApiError> {
    state.proxy_configs.add(&proxy_config).await?;
    Ok("OK")
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<ProxyConfig>, ApiError> {
    Ok(Json(state.proxy_configs.get(&service).await?))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(service): Path<String>,
    Json(mut proxy_config): Json<ProxyConfig>,
) -> Result<&'static str, ApiError> {
    proxy_config.service_name = service;
    state.proxy_configs.update(&proxy_config).await?;
    Ok("OK")
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<&'static str, ApiError> {
    state.proxy_configs.delete(&service).await?;
    Ok("OK")
}
