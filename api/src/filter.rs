//! Query-parameter filtering and pagination for the list endpoints.
//!
//! Every query parameter whose name matches a serialized field of the item
//! type acts as a predicate: values starting with `re:` are regular
//! expressions over the stringified field, anything else is an exact match.
//! Parameters naming no field are ignored, as are non-scalar fields.

use lattice_config::ConfigError;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

pub(crate) const DEFAULT_PAGE_NUM: usize = 0;
pub(crate) const DEFAULT_PAGE_SIZE: usize = 10;

pub(crate) const PARAM_PAGE_NUM: &str = "page_num";
pub(crate) const PARAM_PAGE_SIZE: &str = "page_size";

#[derive(Debug, Serialize)]
pub(crate) struct PagedResponse<T> {
    pub(crate) page_num: usize,
    pub(crate) page_size: usize,
    pub(crate) total: usize,
    pub(crate) data: Vec<T>,
}

pub(crate) fn filter_items<T: Serialize>(
    params: &HashMap<String, String>,
    items: Vec<T>,
) -> Result<Vec<T>, ConfigError> {
    let mut filtered = Vec::with_capacity(items.len());
    'items: for item in items {
        let Ok(Value::Object(fields)) = serde_json::to_value(&item) else {
            continue;
        };
        for (param, expected) in params {
            let Some(field) = fields.get(param) else {
                continue;
            };
            let Some(actual) = stringify(field) else {
                continue;
            };
            if !matches(expected, &actual)? {
                continue 'items;
            }
        }
        filtered.push(item);
    }
    Ok(filtered)
}

fn stringify(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches(expected: &str, actual: &str) -> Result<bool, ConfigError> {
    match expected.strip_prefix("re:") {
        Some(pattern) => {
            let re = Regex::new(pattern)
                .map_err(|error| ConfigError::Validation(format!("bad filter regex: {error}")))?;
            Ok(re.is_match(actual))
        }
        None => Ok(expected == actual),
    }
}

/// Parses `page_num`/`page_size`, coercing anything invalid or negative to
/// the defaults.
pub(crate) fn parse_page(params: &HashMap<String, String>) -> (usize, usize) {
    let parse = |name: &str, default: usize| {
        params
            .get(name)
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value >= 0)
            .map(|value| value as usize)
            .unwrap_or(default)
    };
    (
        parse(PARAM_PAGE_NUM, DEFAULT_PAGE_NUM),
        parse(PARAM_PAGE_SIZE, DEFAULT_PAGE_SIZE),
    )
}

pub(crate) fn paginate<T>(items: Vec<T>, page_num: usize, page_size: usize) -> PagedResponse<T> {
    let total = items.len();
    let data = items
        .into_iter()
        .skip(page_num.saturating_mul(page_size))
        .take(page_size)
        .collect();
    PagedResponse {
        page_num,
        page_size,
        total,
        data,
    }
}
