use std::sync::Arc;

use axum::{extract::State, Json};

use crate::rpc::{handle_request, Request, Response};
use crate::state::AppState;

/// POST /rpc
pub async fn rpc(State(state): State<Arc<AppState>>, Json(request): Json<Request>) -> Json<Response> {
    Json(handle_request(request, &state).await)
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::platform::testing::FakePlatform;
    use crate::sync::test_support::{add_feed, state_with};
    use crate::web::create_router;

    #[tokio::test]
    async fn test_rpc_over_http() {
        let (state, _) = state_with(FakePlatform::new()).await;
        add_feed(&state, "MP_1").await;
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server
            .post("/rpc")
            .json(&json!({ "method": "feed.list", "params": {} }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["result"]["items"][0]["id"], "MP_1");

        let unknown: Value = server
            .post("/rpc")
            .json(&json!({ "method": "feed.nope" }))
            .await
            .json();
        assert_eq!(unknown["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state_with(FakePlatform::new()).await;
        let server = TestServer::new(create_router(state)).unwrap();
        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }
}
