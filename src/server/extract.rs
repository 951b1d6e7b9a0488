// src/server/extract.rs
use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::{Form, Json};

use super::error::ApiError;
use crate::observation::ObservationForm;
use crate::prediction::{PredictError, PredictRequest};

/// A prediction request decoded from either a JSON body or form fields.
#[derive(Debug)]
pub struct PredictPayload(pub PredictRequest);

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for PredictPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(request) = Json::<PredictRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::from(PredictError::InvalidRequest(e.body_text())))?;
            Ok(Self(request))
        } else {
            let Form(form) = Form::<ObservationForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::from(PredictError::InvalidRequest(e.body_text())))?;
            Ok(Self(form.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    fn request(content_type: &str, body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/predict")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_json_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, "application/vnd.api+json".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, "application/x-www-form-urlencoded".parse().unwrap());
        assert!(!is_json(&headers));
    }

    #[tokio::test]
    async fn test_both_channels_decode_to_the_same_request() {
        let json = request(
            "application/json",
            r#"{"algo":"ransac","observations":{"X":7,"Y":5,"month":"mar","day":"fri","FFMC":86.2,
                "DMC":26.2,"DC":94.3,"ISI":5.1,"temp":8.2,"RH":51,"wind":6.7,"rain":0.0}}"#,
        );
        let form = request(
            "application/x-www-form-urlencoded",
            "algo=ransac&x=7&y=5&month=mar&day=fri&ffmc=86.2&dmc=26.2&dc=94.3&isi=5.1&temp=8.2&rh=51&wind=6.7&rain=0.0",
        );
        let PredictPayload(from_json) = PredictPayload::from_request(json, &()).await.unwrap();
        let PredictPayload(from_form) = PredictPayload::from_request(form, &()).await.unwrap();
        assert_eq!(from_json, from_form);
        assert_eq!(from_form.algo, "ransac");
    }

    #[tokio::test]
    async fn test_form_grid_coordinates_accept_integral_floats() {
        let form = request(
            "application/x-www-form-urlencoded",
            "algo=lr&x=7.0&y=5&month=mar&day=fri&ffmc=86.2&dmc=26.2&dc=94.3&isi=5.1&temp=8.2&rh=51&wind=6.7&rain=0",
        );
        let PredictPayload(from_form) = PredictPayload::from_request(form, &()).await.unwrap();
        assert_eq!((from_form.observation.x, from_form.observation.y), (7, 5));

        let form = request(
            "application/x-www-form-urlencoded",
            "algo=lr&x=7.5&y=5&month=mar&day=fri&ffmc=86.2&dmc=26.2&dc=94.3&isi=5.1&temp=8.2&rh=51&wind=6.7&rain=0",
        );
        let err = PredictPayload::from_request(form, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_form_field_is_a_bad_request() {
        let form = request(
            "application/x-www-form-urlencoded",
            "algo=lr&x=7&y=5&month=mar&day=fri&ffmc=86.2&dmc=26.2&dc=94.3&isi=5.1&temp=8.2&rh=51&wind=6.7",
        );
        let err = PredictPayload::from_request(form, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("rain"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_bad_request() {
        let json = request("application/json", r#"{"algo":"lr","observations":"#);
        let err = PredictPayload::from_request(json, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
