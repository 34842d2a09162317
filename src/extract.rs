//! Request extractors that report rejections with the JSON error envelope.

use axum::extract::{FromRequest, FromRequestParts, OptionalFromRequest, Request};
use serde::de::DeserializeOwned;

use crate::Error;

/// A JSON request body.
///
/// Same as [axum::Json], but a missing content type, malformed JSON or a body
/// of the wrong shape is reported as an [Error].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

impl<T, S> OptionalFromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    /// A request without a `Content-Type` header has no body.
    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let body = <axum::Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;

        Ok(body.map(|axum::Json(value)| JsonBody(value)))
    }
}

/// Path parameters, e.g. the ID in `/v1/accounts/{account_id}`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::{JsonBody, PathParam};

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    fn must_create_server() -> TestServer {
        let app = Router::new()
            .route(
                "/greet",
                post(|JsonBody(greeting): JsonBody<Greeting>| async move {
                    Json(json!({ "hello": greeting.name }))
                }),
            )
            .route(
                "/maybe",
                post(|body: Option<JsonBody<Greeting>>| async move {
                    let name = body.map(|JsonBody(greeting)| greeting.name);
                    Json(json!({ "hello": name }))
                }),
            )
            .route(
                "/items/{item_id}",
                post(|PathParam(item_id): PathParam<i64>| async move {
                    Json(json!({ "item_id": item_id }))
                }),
            );

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn extracts_valid_json() {
        let server = must_create_server();

        let response = server.post("/greet").json(&json!({ "name": "alice" })).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "hello": "alice" }));
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let server = must_create_server();

        let response = server
            .post("/greet")
            .bytes("{\"name\": ".into())
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn wrong_shape_uses_error_envelope() {
        let server = must_create_server();

        let response = server.post("/greet").json(&json!({ "name": 42 })).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn non_json_content_type_uses_error_envelope() {
        let server = must_create_server();

        let response = server.post("/greet").text("{\"name\": \"alice\"}").await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn optional_body_may_be_omitted() {
        let server = must_create_server();

        let response = server.post("/maybe").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "hello": null }));
    }

    #[tokio::test]
    async fn non_numeric_path_uses_error_envelope() {
        let server = must_create_server();

        let response = server.post("/items/abc").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].is_string());
    }
}
