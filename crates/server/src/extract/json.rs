use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body whose decoding errors name the offending field, e.g.
/// `Invalid value at 'priority': unknown variant ...`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        parse_body(&bytes).map(ValidatedJson)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let parsed: Result<T, serde_path_to_error::Error<serde_json::Error>> =
        serde_path_to_error::deserialize(&mut deserializer);

    parsed.map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            ApiError::BadRequest(format!("Invalid request body: {inner}"))
        } else {
            ApiError::BadRequest(format!("Invalid value at '{path}': {inner}"))
        }
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        #[allow(dead_code)]
        title: String,
        #[allow(dead_code)]
        order: Option<i32>,
    }

    #[test]
    fn field_errors_report_the_json_path() {
        let err = parse_body::<Payload>(br#"{"title":"a","order":"first"}"#).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert!(msg.starts_with("Invalid value at 'order'")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_bodies_are_bad_requests() {
        let err = parse_body::<Payload>(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(parse_body::<Payload>(br#"{"title":"ok"}"#).is_ok());
    }
}
