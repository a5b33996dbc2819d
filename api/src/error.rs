use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lattice_config::ConfigError;

/// Maps domain errors onto admin API status codes.
pub(crate) struct ApiError(ConfigError);

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConfigError::NotExist => StatusCode::NOT_FOUND,
            ConfigError::Exist | ConfigError::Validation(_) | ConfigError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            ConfigError::Store(_) | ConfigError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}
