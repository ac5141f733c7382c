//! Plain HTTP endpoints: health check and the status/player page.

use axum::response::{Html, Json};
use serde_json::{json, Value};

/// GET /health - fixed liveness body.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET / and /player - minimal status page that subscribes to the relay
/// and renders the transport state.
pub async fn player_page() -> Html<&'static str> {
    Html(PLAYER_HTML)
}

const PLAYER_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Vibelink Player</title>
    <style>
      body { margin: 0; font-family: "Helvetica Neue", Helvetica, Arial, sans-serif; background: #111; color: #f5f5f5; }
      main { padding: 24px; }
      .badge { display: inline-block; padding: 4px 10px; border-radius: 999px; background: #2f2f2f; font-size: 12px; letter-spacing: 0.02em; }
    </style>
  </head>
  <body>
    <main>
      <div class="badge">Relay player</div>
      <h1>Vibelink Player</h1>
      <pre id="status">Waiting for connection...</pre>
      <script>
        const ws = new WebSocket("ws://" + location.host + "/ws");
        ws.onmessage = (e) => {
          const msg = JSON.parse(e.data);
          if (msg.type === "transport:state") {
            document.getElementById("status").innerText = JSON.stringify(msg.payload, null, 2);
          }
        };
      </script>
    </main>
  </body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_body() {
        let Json(body) = health().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[test]
    fn test_player_page_subscribes_to_ws() {
        assert!(PLAYER_HTML.contains("/ws"));
        assert!(PLAYER_HTML.contains("transport:state"));
    }
}
