// Runs oauth2 token requests over the shared `HttpTransport`.

use std::sync::Arc;
use std::time::Duration;

use aps_core::{vendor_message, ApsError, ApsResult, HttpRequest, HttpTransport, Method, RequestBody};
use oauth2::basic::BasicErrorResponse;
use oauth2::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use oauth2::http::StatusCode;
use oauth2::url::form_urlencoded;
use oauth2::RequestTokenError;

/// HTTP client handed to `request_async`.
///
/// Anything other than a `200` with a body is turned into
/// [`ApsError::UpstreamAuth`] here, so the vendor status reaches the caller
/// through `RequestTokenError::Request` unchanged.
pub(crate) async fn send_token_request(
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    request: oauth2::HttpRequest,
) -> ApsResult<oauth2::HttpResponse> {
    let method = Method::from_bytes(request.method.as_str().as_bytes()).map_err(ApsError::transport)?;
    let mut outgoing = HttpRequest::new(method, request.url.as_str(), timeout);

    let mut form_encoded = false;
    for (name, value) in request.headers.iter() {
        if *name == CONTENT_TYPE {
            form_encoded = value.as_bytes().starts_with(b"application/x-www-form-urlencoded");
            continue;
        }
        let value = value.to_str().map_err(ApsError::transport)?;
        outgoing = outgoing.header(name.as_str(), value);
    }

    outgoing.body = if form_encoded {
        RequestBody::Form(form_urlencoded::parse(&request.body).into_owned().collect())
    } else if request.body.is_empty() {
        RequestBody::Empty
    } else {
        RequestBody::Binary {
            content: request.body.into(),
            content_type: "application/octet-stream".to_string(),
        }
    };

    let response = transport.send(outgoing).await?;
    if response.status != 200 || response.body.is_empty() {
        return Err(ApsError::upstream_auth(response.status, vendor_message(&response.body)));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(oauth2::HttpResponse {
        status_code: StatusCode::OK,
        headers,
        body: response.body.to_vec(),
    })
}

/// Collapse an oauth2 failure back into the workspace error type
pub(crate) fn token_error(error: RequestTokenError<ApsError, BasicErrorResponse>) -> ApsError {
    match error {
        RequestTokenError::Request(error) => error,
        // RFC 6749 error documents are sent with 400.
        RequestTokenError::ServerResponse(response) => ApsError::upstream_auth(400, response.to_string()),
        RequestTokenError::Parse(error, _) => ApsError::from(error.into_inner()),
        RequestTokenError::Other(message) => ApsError::config(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aps_core::StubTransport;
    use oauth2::http::Method as OAuthMethod;
    use oauth2::url::Url;
    use serde_json::json;

    fn token_request() -> oauth2::HttpRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
        headers.insert("authorization", HeaderValue::from_static("Basic Y2xpZW50OnNlY3JldA=="));
        oauth2::HttpRequest {
            url: Url::parse("http://aps.test/authentication/v2/token").unwrap(),
            method: OAuthMethod::POST,
            headers,
            body: b"grant_type=client_credentials&scope=data%3Aread+data%3Awrite".to_vec(),
        }
    }

    #[tokio::test]
    async fn form_body_and_headers_cross_the_bridge() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            200,
            json!({ "access_token": "t", "token_type": "Bearer", "expires_in": 3599 }),
        );

        let response = send_token_request(stub.clone(), Duration::from_secs(5), token_request())
            .await
            .unwrap();
        assert_eq!(response.status_code, StatusCode::OK);

        let sent = &stub.requests()[0];
        assert_eq!(sent.timeout, Duration::from_secs(5));
        assert_eq!(sent.form_value("grant_type"), Some("client_credentials"));
        assert_eq!(sent.form_value("scope"), Some("data:read data:write"));
        assert_eq!(sent.header_value("authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
        assert_eq!(sent.header_value("content-type"), None);
    }

    #[tokio::test]
    async fn vendor_rejection_keeps_its_status() {
        let stub = Arc::new(StubTransport::new());
        stub.on_json(
            Method::POST,
            "/authentication/v2/token",
            401,
            json!({ "developerMessage": "The client_id specified does not have access" }),
        );

        let err = send_token_request(stub, Duration::from_secs(5), token_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApsError::UpstreamAuth { status: 401, ref message } if message.contains("does not have access")));

        let err = token_error(RequestTokenError::Request(err));
        assert_eq!(err.status(), Some(401));
    }
}
