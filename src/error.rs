use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = CoverageError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("bounding box needs min_lat, max_lat, min_lon and max_lon")]
    IncompleteBoundingBox,

    #[error("invalid resolution {0}, expected 0..=15")]
    InvalidResolution(u8),

    #[error("invalid cell id {0}")]
    InvalidCellId(String),

    #[error("measurement store unavailable")]
    DataUnavailable(#[source] sqlx::Error),

    /// A sub-component rejected a value while building the result.
    #[error("aggregation failed: {0}")]
    AggregationFailed(#[source] Box<CoverageError>),
}

impl CoverageError {
    pub(crate) fn aggregation(inner: CoverageError) -> Self {
        match inner {
            CoverageError::InvalidCoordinate { .. } | CoverageError::InvalidCellId(_) => {
                CoverageError::AggregationFailed(Box::new(inner))
            }
            other => other,
        }
    }
}

impl ResponseError for CoverageError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoverageError::InvalidCoordinate { .. }
            | CoverageError::IncompleteBoundingBox
            | CoverageError::InvalidResolution(_)
            | CoverageError::InvalidCellId(_) => StatusCode::BAD_REQUEST,
            CoverageError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoverageError::AggregationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(json!(
            {
                "error": {
                    "code": status.as_u16(),
                    "message": self.to_string(),
                }
            }
        ))
    }
}
