//! Reading successful responses
//!
//! The dispatcher hands back the raw [`Response`]; these helpers turn it into
//! typed values under the same [`CallContext`] that governed the call.

use certgate_domain::constants::TOTAL_COUNT_HEADER;
use reqwest::header::LOCATION;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::context::CallContext;
use super::errors::ApiError;

async fn read_body(response: Response, ctx: &CallContext) -> Result<Vec<u8>, ApiError> {
    let bytes = ctx
        .guard(response.bytes())
        .await?
        .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;
    Ok(bytes.to_vec())
}

/// Deserialize a JSON body; an empty 204 body decodes as JSON `null`
///
/// # Errors
/// Returns `ApiError::Decode` if the body is not valid JSON for `T`.
pub async fn decode_json<T: DeserializeOwned>(
    response: Response,
    ctx: &CallContext,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = read_body(response, ctx).await?;

    if body.is_empty() && status == StatusCode::NO_CONTENT {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|e| ApiError::Decode(format!("Empty response body: {}", e)));
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Read the body as UTF-8 text
///
/// # Errors
/// Returns `ApiError::Decode` if the body is not UTF-8.
pub async fn read_text(response: Response, ctx: &CallContext) -> Result<String, ApiError> {
    let body = read_body(response, ctx).await?;
    String::from_utf8(body).map_err(|e| ApiError::Decode(format!("Body is not UTF-8: {}", e)))
}

/// Total item count reported by a list endpoint
///
/// # Errors
/// Returns `ApiError::Decode` if the header is missing or not a number.
pub fn total_count(response: &Response) -> Result<u64, ApiError> {
    let value = response
        .headers()
        .get(TOTAL_COUNT_HEADER)
        .ok_or_else(|| ApiError::Decode(format!("Missing {} header", TOTAL_COUNT_HEADER)))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::Decode(format!("Invalid {} header: {:?}", TOTAL_COUNT_HEADER, value)))
}

/// Identifier of a created resource: the last path segment of `Location`
///
/// # Errors
/// Returns `ApiError::Decode` if the header is missing or has no usable
/// path segment.
pub fn resource_id(response: &Response) -> Result<String, ApiError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Decode("Missing Location header".to_string()))?;

    id_from_location(location)
}

fn id_from_location(location: &str) -> Result<String, ApiError> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Decode(format!("No resource id in Location: {}", location)))?;

    urlencoding::decode(segment)
        .map(|id| id.into_owned())
        .map_err(|e| ApiError::Decode(format!("Invalid resource id in Location: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn fetch(template: ResponseTemplate) -> Response {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(template).mount(&server).await;
        reqwest::get(server.uri()).await.unwrap()
    }

    fn ctx() -> CallContext {
        CallContext::with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn location_id_is_last_segment() {
        assert_eq!(id_from_location("/certificates/c-42").unwrap(), "c-42");
        assert_eq!(id_from_location("https://certs.test/api/claims/cl-7/").unwrap(), "cl-7");
        assert_eq!(id_from_location("/claims/a%2Fb?view=full").unwrap(), "a/b");
        assert!(id_from_location("/").is_err());
    }

    #[tokio::test]
    async fn decodes_json_body() {
        #[derive(Deserialize)]
        struct Item {
            id: String,
        }

        let response =
            fetch(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "x" }))).await;
        let item: Item = decode_json(response, &ctx()).await.unwrap();
        assert_eq!(item.id, "x");
    }

    #[tokio::test]
    async fn no_content_decodes_as_unit() {
        let response = fetch(ResponseTemplate::new(204)).await;
        assert!(decode_json::<()>(response, &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let response = fetch(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let result: Result<serde_json::Value, _> = decode_json(response, &ctx()).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn reads_total_count_header() {
        let response =
            fetch(ResponseTemplate::new(200).insert_header(TOTAL_COUNT_HEADER, "17")).await;
        assert_eq!(total_count(&response).unwrap(), 17);

        let response = fetch(ResponseTemplate::new(200)).await;
        assert!(matches!(total_count(&response), Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn reads_location_header() {
        let response =
            fetch(ResponseTemplate::new(201).insert_header("Location", "/certificates/c-9")).await;
        assert_eq!(resource_id(&response).unwrap(), "c-9");
    }
}
