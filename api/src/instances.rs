use crate::error::ApiError;
use crate::filter::{filter_items, paginate, parse_page, PagedResponse};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use lattice_config::Instance;
use std::collections::HashMap;

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PagedResponse<Instance>>, ApiError> {
    let mut items = state.instances.get_all().await?;
    items.sort_by(|a, b| a.id.cmp(&b.id));
    let items = filter_items(&params, items)?;
    let (page_num, page_size) = parse_page(&params);
    Ok(Json(paginate(items, page_num, page_size)))
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<Json<Instance>, ApiError> {
    Ok(Json(state.instances.get(&instance).await?))
}
