use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use digiwallet_api::app::{build_app, services::AppServices};
use digiwallet_auth::{JwtClaims, Role};
use digiwallet_core::UserId;
use digiwallet_wallet::{CommissionPolicy, RecorderPolicy};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    admin_id: UserId,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(
            CommissionPolicy::default(),
            RecorderPolicy::default(),
        ));
        let admin = services
            .accounts
            .bootstrap_admin("Root", "root@example.com")
            .await
            .expect("failed to seed admin");

        let app = build_app(JWT_SECRET.to_string(), services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            admin_id: admin.id,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin_token(&self) -> String {
        mint_jwt(self.admin_id, "root@example.com", Role::Admin)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn patch(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    /// Register through the public endpoint, returning the new account's id.
    async fn register(&self, name: &str, email: &str, role: &str) -> UserId {
        let res = self
            .client
            .post(self.url("/users/register"))
            .json(&json!({ "name": name, "email": email, "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Register and have the admin verify (and, for agents, approve) the account.
    async fn onboard(&self, name: &str, email: &str, role: Role) -> (UserId, String) {
        let id = self.register(name, email, role.as_str()).await;
        let admin = self.admin_token();

        let verify = json!({ "isVerified": true });
        let (status, _) = self.patch(&format!("/users/{id}"), &admin, verify).await;
        assert_eq!(status, StatusCode::OK);
        if role == Role::Agent {
            let path = format!("/users/agents/{id}/approve");
            let (status, _) = self.patch(&path, &admin, json!({})).await;
            assert_eq!(status, StatusCode::OK);
        }

        (id, mint_jwt(id, email, role))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, email: &str, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: email.to_string(),
        role,
        issued_at: now - ChronoDuration::seconds(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn balance(body: &Value) -> f64 {
    body["data"]["balance"].as_f64().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/wallets/my-wallet")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");

    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &JwtClaims {
            sub: srv.admin_id,
            email: "root@example.com".into(),
            role: Role::Admin,
            issued_at: Utc::now(),
            expires_at: Utc::now() + ChronoDuration::minutes(5),
        },
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();
    let (status, _) = srv.get("/users/me", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_unknown_account_is_unauthorized() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(UserId::new(), "ghost@example.com", Role::User);
    let (status, _) = srv.get("/wallets/balance", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_and_unapproved_accounts_are_gated() {
    let srv = TestServer::spawn().await;

    let user = srv.register("Una", "una@example.com", "user").await;
    let token = mint_jwt(user, "una@example.com", Role::User);
    let (status, body) = srv.get("/wallets/balance", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let agent = srv.register("Ari", "ari@example.com", "agent").await;
    let admin = srv.admin_token();
    let verify = json!({ "isVerified": true });
    let (status, _) = srv.patch(&format!("/users/{agent}"), &admin, verify).await;
    assert_eq!(status, StatusCode::OK);
    let token = mint_jwt(agent, "ari@example.com", Role::Agent);
    let (status, _) = srv.get("/wallets/balance", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stored_role_wins_over_token_role() {
    let srv = TestServer::spawn().await;
    let (user, _) = srv.onboard("Uma", "uma@example.com", Role::User).await;

    // A token claiming admin for a plain user still gets the user's permissions.
    let token = mint_jwt(user, "uma@example.com", Role::Admin);
    let (status, _) = srv.get("/wallets/all", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_rules() {
    let srv = TestServer::spawn().await;
    srv.register("Dup", "dup@example.com", "user").await;

    let res = srv
        .client
        .post(srv.url("/users/register"))
        .json(&json!({ "name": "Dup", "email": "DUP@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/users/register"))
        .json(&json!({ "name": "Eve", "email": "eve@example.com", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wallet_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.onboard("Alice", "alice@example.com", Role::User).await;

    let (status, body) = srv.get("/wallets/my-wallet", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Wallet retrieved successfully");
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(balance(&body), 50.0);

    let (status, body) = srv.post("/wallets/add-money", &token, json!({ "amount": 500 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 550.0);

    let (status, body) = srv.post("/wallets/withdraw", &token, json!({ "amount": 100 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 450.0);

    let (status, body) = srv.post("/wallets/withdraw", &token, json!({ "amount": 1000 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_funds");

    let (status, _) = srv.post("/wallets/add-money", &token, json!({ "amount": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = srv.post("/wallets/add-money", &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = srv.get("/wallets/balance", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 450.0);

    let (status, body) = srv.get("/transactions/my-history", &token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["type"], "withdraw");
    assert_eq!(rows[1]["type"], "add_money");
}

#[tokio::test]
async fn send_money_returns_receiver_wallet() {
    let srv = TestServer::spawn().await;
    let (alice, alice_token) = srv.onboard("Alice", "alice@example.com", Role::User).await;
    let (bob, bob_token) = srv.onboard("Bob", "bob@example.com", Role::User).await;

    let (status, body) = srv
        .post(
            "/wallets/send-money",
            &alice_token,
            json!({ "receiverId": bob.to_string(), "amount": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], bob.to_string());
    assert_eq!(balance(&body), 70.0);

    let (_, body) = srv.get("/wallets/balance", &alice_token).await;
    assert_eq!(balance(&body), 30.0);

    let (status, _) = srv
        .post(
            "/wallets/send-money",
            &alice_token,
            json!({ "receiverId": alice.to_string(), "amount": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv.post("/wallets/send-money", &alice_token, json!({ "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = srv.get("/transactions/my-history", &bob_token).await;
    let rows = body["data"].as_array().unwrap();
    assert!(rows.iter().any(|r| r["type"] == "receive_money"));
    assert!(rows.iter().all(|r| r["senderId"]["email"] == "alice@example.com"));
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let srv = TestServer::spawn().await;
    let (_, user_token) = srv.onboard("Uri", "uri@example.com", Role::User).await;
    let admin = srv.admin_token();

    let (status, body) = srv.post("/wallets/add-money", &admin, json!({ "amount": 10 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let admin_only = [
        "/wallets/all",
        "/transactions/all",
        "/users/all-users",
        "/transactions/commission-history",
    ];
    for path in admin_only {
        let (status, _) = srv.get(path, &user_token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn agent_cash_in_records_commission() {
    let srv = TestServer::spawn().await;
    let (user, user_token) = srv.onboard("Cara", "cara@example.com", Role::User).await;
    let (_, agent_token) = srv.onboard("Dan", "dan@example.com", Role::Agent).await;

    let (status, body) = srv
        .post(
            "/wallets/cash-in",
            &agent_token,
            json!({ "userId": user.to_string(), "amount": 300 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cash-in completed successfully");
    assert_eq!(balance(&body), 350.0);

    let (status, body) = srv
        .post(
            "/wallets/cash-out",
            &agent_token,
            json!({ "userId": user.to_string(), "amount": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 250.0);

    let (status, body) = srv.get("/transactions/commission-history", &agent_token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["type"], "cash_out");
    assert_eq!(rows[0]["commission"].as_f64().unwrap(), 2.0);
    assert_eq!(rows[1]["commission"].as_f64().unwrap(), 6.0);

    let (status, body) = srv.get(&format!("/wallets/user/{user}/balance"), &agent_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 250.0);

    let (status, _) = srv.get(&format!("/wallets/user/{user}"), &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blocked_wallet_rejects_money_movement() {
    let srv = TestServer::spawn().await;
    let (user, token) = srv.onboard("Ben", "ben@example.com", Role::User).await;
    let admin = srv.admin_token();

    let (status, body) = srv.patch(&format!("/wallets/block/{user}"), &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "blocked");

    let (status, body) = srv.post("/wallets/add-money", &token, json!({ "amount": 5 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_state");

    let (status, _) = srv.patch(&format!("/wallets/unblock/{user}"), &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.post("/wallets/add-money", &token, json!({ "amount": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance(&body), 55.0);

    let (status, body) = srv.get("/wallets/all", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let wallets = body["data"].as_array().unwrap();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0]["user"]["email"], "ben@example.com");
}

#[tokio::test]
async fn admin_creates_wallet_once() {
    let srv = TestServer::spawn().await;
    let (user, _) = srv.onboard("Ivy", "ivy@example.com", Role::User).await;
    let admin = srv.admin_token();

    let (status, body) = srv
        .post("/wallets/create", &admin, json!({ "userId": user.to_string() }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = srv
        .post("/wallets/create", &admin, json!({ "userId": srv.admin_id.to_string() }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Wallet created successfully");
    assert_eq!(balance(&body), 50.0);
}

#[tokio::test]
async fn users_manage_their_own_profile_only() {
    let srv = TestServer::spawn().await;
    let (alice, alice_token) = srv.onboard("Alice", "alice@example.com", Role::User).await;
    let (bob, _) = srv.onboard("Bob", "bob@example.com", Role::User).await;

    let (status, body) = srv.get("/users/me", &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["isVerified"], true);

    let (status, body) = srv
        .patch(&format!("/users/{alice}"), &alice_token, json!({ "name": "Alicia" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alicia");

    let (status, _) = srv
        .patch(&format!("/users/{bob}"), &alice_token, json!({ "name": "Robert" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv
        .patch(&format!("/users/{alice}"), &alice_token, json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv
        .patch(&format!("/users/{alice}"), &alice_token, json!({ "email": "new@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn amounts_outside_the_stored_precision_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.onboard("Alice", "alice@example.com", Role::User).await;

    for amount in [json!(0.00001), json!(5e28), json!(1000000000001_i64)] {
        let (status, body) = srv
            .post("/wallets/add-money", &token, json!({ "amount": amount }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert_eq!(body["success"], false);
    }

    let (status, body) = srv.post("/wallets/add-money", &token, json!({ "amount": 0.0001 })).await;
    assert_eq!(status, StatusCode::OK);
    assert!((balance(&body) - 50.0001).abs() < 1e-9);
}

#[tokio::test]
async fn agent_commission_rate_updates_are_validated() {
    let srv = TestServer::spawn().await;
    let (agent, _) = srv.onboard("Dan", "dan@example.com", Role::Agent).await;
    let admin = srv.admin_token();

    let (status, body) = srv
        .patch(&format!("/users/{agent}"), &admin, json!({ "commissionRate": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .patch(&format!("/users/{agent}"), &admin, json!({ "commissionRate": 0.03 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["commissionRate"], 0.03);
}

#[tokio::test]
async fn admin_lists_users_by_page_and_filter() {
    let srv = TestServer::spawn().await;
    srv.onboard("Alice", "alice@example.com", Role::User).await;
    srv.onboard("Bob", "bob@example.com", Role::User).await;
    srv.onboard("Dan", "dan@example.com", Role::Agent).await;
    let admin = srv.admin_token();

    let (status, body) = srv.get("/users/all-users?page=1&limit=2", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All users retrieved successfully");
    assert_eq!(body["meta"], json!({ "page": 1, "limit": 2, "total": 4, "totalPage": 2 }));
    let rows = body["data"].as_array().unwrap();
    let names: Vec<_> = rows.iter().map(|u| u["name"].clone()).collect();
    assert_eq!(names, [json!("Dan"), json!("Bob")]);

    let (status, body) = srv.get("/users/all-users?role=agent", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["email"], "dan@example.com");

    let (status, body) = srv.get("/users/all-users?searchTerm=ALI", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Alice");

    let (status, _) = srv.get("/users/all-users?page=0", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = srv.get("/users/all-users?limit=lots", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
