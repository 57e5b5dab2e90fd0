//! Request parameters and response envelopes of the data operations
//!
//! Successful answers look like `{"status": "ok", "body": ...}` and only the
//! `body` is handed on, as raw JSON text. Failures carry
//! `{"error": {"code": N, "message": "..."}}`.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::app::models::Area;
use crate::constants::api;
use crate::errors::{ApiError, ApiResult};

/// Parameters of a `getpublicdata` call
#[derive(Debug, Clone, PartialEq)]
pub struct PublicDataQuery {
    pub area: Area,
    pub filter: bool,
}

impl PublicDataQuery {
    pub fn new(area: Area, filter: bool) -> Self {
        Self { area, filter }
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("lat_ne", self.area.north.to_string()),
            ("lon_ne", self.area.east.to_string()),
            ("lat_sw", self.area.south.to_string()),
            ("lon_sw", self.area.west.to_string()),
            ("filter", self.filter.to_string()),
        ]
    }
}

/// Parameters of a `getmeasure` call
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureQuery {
    pub device_id: String,
    pub module_id: String,
    pub measurement_type: String,
    pub scale: String,
    /// Range start, epoch seconds
    pub date_begin: i64,
    /// Range end, epoch seconds
    pub date_end: i64,
}

impl MeasureQuery {
    /// Query at the `max` scale
    pub fn new(
        device_id: impl Into<String>,
        module_id: impl Into<String>,
        measurement_type: impl Into<String>,
        date_begin: i64,
        date_end: i64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            module_id: module_id.into(),
            measurement_type: measurement_type.into(),
            scale: api::SCALE_MAX.to_string(),
            date_begin,
            date_end,
        }
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device_id", self.device_id.clone()),
            ("module_id", self.module_id.clone()),
            ("type", self.measurement_type.clone()),
            ("scale", self.scale.clone()),
            ("date_begin", self.date_begin.to_string()),
            ("date_end", self.date_end.to_string()),
        ]
    }
}

#[derive(Deserialize)]
struct SuccessEnvelope<'a> {
    #[serde(borrow)]
    body: Option<&'a RawValue>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Extracts the payload from a response, or the error it reports
pub(crate) fn parse_envelope(
    method: &str,
    status: StatusCode,
    body: &str,
) -> ApiResult<Box<RawValue>> {
    if status.is_success() {
        if let Ok(envelope) = serde_json::from_str::<SuccessEnvelope<'_>>(body) {
            if let Some(payload) = envelope.body {
                return Ok(payload.to_owned());
            }
        }
    }

    if let Ok(ErrorEnvelope { error }) = serde_json::from_str::<ErrorEnvelope>(body) {
        if error.code == api::ERROR_USAGE_REACHED {
            return Err(ApiError::RateLimitExceeded {
                method: method.to_string(),
                message: error.message,
            });
        }
        return Err(ApiError::Remote {
            method: method.to_string(),
            code: error.code,
            message: error.message,
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimitExceeded {
            method: method.to_string(),
            message: "HTTP 429".to_string(),
        });
    }

    if !status.is_success() {
        return Err(ApiError::ServerError {
            method: method.to_string(),
            status: status.as_u16(),
        });
    }

    Err(ApiError::MalformedResponse {
        method: method.to_string(),
        reason: "response has no body field".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_data_params() {
        let query = PublicDataQuery::new(Area::new(55, 15, -60, -130), true);
        assert_eq!(
            query.params(),
            vec![
                ("lat_ne", "55".to_string()),
                ("lon_ne", "-60".to_string()),
                ("lat_sw", "15".to_string()),
                ("lon_sw", "-130".to_string()),
                ("filter", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_measure_params_use_max_scale() {
        let query = MeasureQuery::new("dev", "mod", "pressure", 1_642_204_800, 1_642_377_600);
        let params = query.params();
        assert!(params.contains(&("scale", "max".to_string())));
        assert!(params.contains(&("type", "pressure".to_string())));
        assert!(params.contains(&("date_begin", "1642204800".to_string())));
    }

    #[test]
    fn test_body_is_extracted_verbatim() {
        let payload = parse_envelope(
            "getmeasure",
            StatusCode::OK,
            r#"{"body":[{"beg_time":1000,"value":[[1.5]]}],"status":"ok","time_exec":0.01}"#,
        )
        .unwrap();
        assert_eq!(payload.get(), r#"[{"beg_time":1000,"value":[[1.5]]}]"#);
    }

    #[test]
    fn test_usage_reached_is_rate_limit() {
        let result = parse_envelope(
            "getmeasure",
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":26,"message":"User usage reached"}}"#,
        );
        assert!(matches!(result, Err(ApiError::RateLimitExceeded { .. })));
    }

    #[test]
    fn test_remote_error_envelope() {
        let result = parse_envelope(
            "getmeasure",
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":3,"message":"Access token expired"}}"#,
        );
        match result {
            Err(ApiError::Remote { code, message, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "Access token expired");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_429_and_5xx() {
        assert!(matches!(
            parse_envelope("getpublicdata", StatusCode::TOO_MANY_REQUESTS, ""),
            Err(ApiError::RateLimitExceeded { .. })
        ));
        assert!(matches!(
            parse_envelope("getpublicdata", StatusCode::BAD_GATEWAY, "<html/>"),
            Err(ApiError::ServerError { status: 502, .. })
        ));
    }

    #[test]
    fn test_success_without_body() {
        assert!(matches!(
            parse_envelope("getpublicdata", StatusCode::OK, r#"{"status":"ok"}"#),
            Err(ApiError::MalformedResponse { .. })
        ));
    }
}
