//! Shared test utilities for integration tests

use ragdeck::api::ApiClient;

/// Build a client pointed at a mockito server.
#[must_use]
pub fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(server.url())
}

/// Build a client that already holds an admin token.
#[must_use]
pub fn admin_client_for(server: &mockito::ServerGuard) -> ApiClient {
    let mut client = client_for(server);
    client.set_admin_token("test-token");
    client
}

/// A minimal allow/block document with one rule carrying a server id.
#[must_use]
pub fn allow_block_body() -> String {
    serde_json::json!({
        "seeds": [{"url": "https://x.com/", "allow_http": false}],
        "blocked": ["ads.example"],
        "allow_rules": [{
            "id": "r7",
            "pattern": "https://x.com/",
            "match": "prefix",
            "types": {"web": true, "pdf": false, "docx": false, "xlsx": false, "pptx": false},
            "allow_http": false,
            "auth_profile": null
        }]
    })
    .to_string()
}

/// An SSE body from a list of JSON-encoded event payloads.
#[must_use]
pub fn sse_body(payloads: &[&str]) -> String {
    let mut body = String::new();
    for payload in payloads {
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }
    body
}
