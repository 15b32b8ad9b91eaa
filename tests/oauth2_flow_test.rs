// ABOUTME: End-to-end HTTP tests for the OAuth surface and bearer-protected tools
// ABOUTME: Drives the real router with tower::ServiceExt::oneshot and a scripted IdP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{generate_code_challenge, generate_code_verifier, query_param, VALID_IDP_CODE};
use std::sync::Arc;
use tower::ServiceExt;

use u2_mcp_server::config::{
    AuthConfig, Environment, HttpConfig, IdpConfig, IdpProvider, LogLevel, ServerConfig, U2Config,
};
use u2_mcp_server::connection::{ConnectionError, U2Session};
use u2_mcp_server::routes::build_router;
use u2_mcp_server::server::ServerResources;

const REDIRECT_URI: &str = "https://client.example/cb";

struct ScriptedSession;

#[async_trait::async_trait]
impl U2Session for ScriptedSession {
    async fn execute_command(&self, _command: &str) -> Result<String, ConnectionError> {
        Ok("GET.CUSTOMER.DATA\nINV.REPORT\n".to_owned())
    }

    async fn call_subroutine(
        &self,
        _name: &str,
        args: Vec<String>,
    ) -> Result<Vec<String>, ConnectionError> {
        Ok(args)
    }
}

fn test_config(auth_enabled: bool) -> ServerConfig {
    ServerConfig {
        http: HttpConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            cors_origins: vec!["*".to_owned()],
        },
        u2: U2Config {
            host: "u2.example.com".to_owned(),
            user: "svc".to_owned(),
            password: "pw".to_owned(),
            account: "DEMO".to_owned(),
            service: "uvcs".to_owned(),
            port: 31438,
            ssl: false,
            timeout_secs: 30,
            read_only: false,
            max_records: 10_000,
            blocked_commands: vec![],
        },
        auth: AuthConfig {
            enabled: auth_enabled,
            issuer_url: "https://bridge.example.com".to_owned(),
            token_expiry_secs: 3600,
            refresh_token_expiry_secs: 30 * 24 * 3600,
        },
        idp: IdpConfig {
            provider: IdpProvider::Oidc,
            discovery_url: None,
            client_id: "bridge".to_owned(),
            client_secret: "secret".to_owned(),
            scopes: "openid profile email".to_owned(),
            duo_api_host: None,
        },
        log_level: LogLevel::Info,
        environment: Environment::Testing,
    }
}

fn app(auth_enabled: bool) -> Router {
    let adapter = auth_enabled.then(|| {
        Arc::new(common::ScriptedAdapter) as Arc<dyn u2_mcp_server::idp::IdpAdapter>
    });
    let resources = Arc::new(ServerResources::new(
        test_config(auth_enabled),
        adapter,
        Arc::new(ScriptedSession),
    ));
    build_router(resources)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned()
}

async fn register(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "redirect_uris": [REDIRECT_URI],
                        "client_name": "Flow Test",
                        "scope": "u2:read u2:write"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["client_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_full_browser_flow_over_http() {
    let app = app(true);
    let client_id = register(&app).await;

    let verifier = generate_code_verifier();
    let challenge = generate_code_challenge(&verifier);

    // /authorize redirects the browser to the identity provider
    let authorize_uri = format!(
        "/authorize?response_type=code&client_id={client_id}&redirect_uri={}&scope=u2%3Aread&state=xyz&code_challenge={challenge}&code_challenge_method=S256",
        urlencoding::encode(REDIRECT_URI),
    );
    let response = app
        .clone()
        .oneshot(Request::get(&authorize_uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let idp_url = location(&response);
    assert!(idp_url.starts_with("https://idp.example.com/authorize"));
    let state = query_param(&idp_url, "state").unwrap();

    // the provider sends the browser back; we leave with the client redirect
    let callback_uri = format!(
        "/oauth/callback?state={}&code={VALID_IDP_CODE}",
        urlencoding::encode(&state)
    );
    let response = app
        .clone()
        .oneshot(Request::get(&callback_uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let client_redirect = location(&response);
    assert!(client_redirect.starts_with(REDIRECT_URI));
    assert_eq!(query_param(&client_redirect, "state").unwrap(), "xyz");
    let code = query_param(&client_redirect, "code").unwrap();

    // redeem the code
    let form = serde_urlencoded::to_string([
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", client_id.as_str()),
        ("code_verifier", verifier.as_str()),
    ])
    .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::post("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tokens = body_json(response).await;
    assert_eq!(tokens["token_type"], "bearer");
    let access_token = tokens["access_token"].as_str().unwrap().to_owned();
    assert!(tokens["refresh_token"].as_str().is_some());

    // replaying the code fails with invalid_grant
    let response = app
        .clone()
        .oneshot(
            Request::post("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"], "invalid_grant");

    // the access token opens the tool surface
    let response = app
        .clone()
        .oneshot(
            Request::get("/tools/status")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["account"], "DEMO");
}

#[tokio::test]
async fn test_authorize_with_unregistered_redirect_uri_is_rejected() {
    let app = app(true);
    let client_id = register(&app).await;

    let verifier = generate_code_verifier();
    let challenge = generate_code_challenge(&verifier);
    let uri = format!(
        "/authorize?response_type=code&client_id={client_id}&redirect_uri={}&code_challenge={challenge}&code_challenge_method=S256",
        urlencoding::encode("https://evil.example/cb"),
    );

    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"], "invalid_request");
}

#[tokio::test]
async fn test_tool_surface_requires_bearer_when_auth_enabled() {
    let app = app(true);

    let response = app
        .clone()
        .oneshot(Request::get("/tools/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::get("/tools/status")
                .header(header::AUTHORIZATION, "Bearer never-issued")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tool_surface_open_when_auth_disabled() {
    let app = app(false);

    let response = app
        .clone()
        .oneshot(Request::get("/tools/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // and the OAuth endpoints are absent
    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_discovery_document_advertises_endpoints() {
    let app = app(true);

    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = body_json(response).await;
    assert_eq!(doc["issuer"], "https://bridge.example.com");
    assert_eq!(doc["token_endpoint"], "https://bridge.example.com/token");
    assert_eq!(doc["code_challenge_methods_supported"][0], "S256");
    assert_eq!(doc["grant_types_supported"][0], "authorization_code");
    assert_eq!(doc["token_endpoint_auth_methods_supported"][0], "none");
}

#[tokio::test]
async fn test_revoke_always_reports_success() {
    let app = app(true);

    let form = serde_urlencoded::to_string([("token", "never-issued")]).unwrap();
    let response = app
        .oneshot(
            Request::post("/revoke")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_call_subroutine_over_http() {
    let app = app(false);

    let response = app
        .oneshot(
            Request::post("/tools/call_subroutine")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "GET.CUSTOMER.DATA",
                        "args": ["CUST001"],
                        "num_args": 3
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["num_args"], 3);
    assert_eq!(body["args_out"].as_array().unwrap().len(), 3);
}
