use authgate_api::app::AppServices;
use authgate_auth::{NewCatalogEntry, PermissionCode, codes};
use authgate_core::{Settings, UserId};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    services: AppServices,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(Settings::new("test-secret")).await
    }

    async fn spawn_with(settings: Settings) -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let services = AppServices::in_memory(&settings);
        let app = authgate_api::app::build_app(services.clone());
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
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str, email: &str) -> UserId {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": "Password1",
                "c_password": "Password1",
                "birthday": "2000-01-01",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn login(&self, username: &str) -> Value {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": "Password1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    /// Give `user_id` a fresh role holding `granted`.
    async fn grant(&self, user_id: UserId, granted: &[PermissionCode]) {
        let admin = self.services.admin();
        let role = admin
            .create_role(
                NewCatalogEntry {
                    name: format!("Role {user_id}"),
                    code: format!("role-{user_id}"),
                    description: None,
                },
                user_id,
            )
            .await
            .unwrap();

        for code in granted {
            let existing = admin
                .list_permissions()
                .await
                .unwrap()
                .into_iter()
                .find(|p| p.code == code.as_str());
            let permission = match existing {
                Some(permission) => permission,
                None => admin
                    .create_permission(
                        NewCatalogEntry {
                            name: code.to_string(),
                            code: code.to_string(),
                            description: None,
                        },
                        user_id,
                    )
                    .await
                    .unwrap(),
            };
            admin
                .grant_permission(role.id, permission.id, user_id)
                .await
                .unwrap();
        }

        admin.assign_role(user_id, role.id, user_id).await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn access(tokens: &Value) -> &str {
    tokens["access_token"].as_str().unwrap()
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

    let res = srv.client.get(srv.url("/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_credentials");

    let res = srv
        .client
        .get(srv.url("/policy/roles"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn register_login_and_me() {
    let srv = TestServer::spawn().await;
    srv.register("Testuser", "test@x.com").await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "username": "TESTUSER",
            "email": "other@x.com",
            "password": "Password1",
            "c_password": "Password1",
            "birthday": "2000-01-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_username");

    let tokens = srv.login("Testuser").await;
    assert_eq!(tokens["token_type"], "bearer");

    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["username"], "Testuser");
    assert!(me.get("password_hash").is_none());

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "Testuser", "password": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn registration_input_is_validated() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "username": "Short",
            "email": "short@x.com",
            "password": "Password1",
            "c_password": "Password1",
            "birthday": "2000-01-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation");

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "username": "Testuser",
            "email": "test@x.com",
            "password": "password",
            "c_password": "password",
            "birthday": "2000-01-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "weak_password");
}

#[tokio::test]
async fn refresh_rotates_and_reuse_burns_every_session() {
    let srv = TestServer::spawn().await;
    srv.register("Testuser", "test@x.com").await;
    let first = srv.login("Testuser").await;

    let res = srv
        .client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": first["refresh_token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let second: Value = res.json().await.unwrap();

    // Presenting the spent refresh token again revokes everything.
    let res = srv
        .client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": first["refresh_token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "refresh_token_invalid");

    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .bearer_auth(access(&second))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "token_revoked");
}

#[tokio::test]
async fn session_ceiling_is_enforced() {
    let srv = TestServer::spawn_with(Settings::new("test-secret").with_max_active_tokens(4)).await;
    srv.register("Testuser", "test@x.com").await;

    srv.login("Testuser").await;
    srv.login("Testuser").await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "Testuser", "password": "Password1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "too_many_active_sessions");
}

#[tokio::test]
async fn logout_revokes_only_the_presented_token() {
    let srv = TestServer::spawn().await;
    srv.register("Testuser", "test@x.com").await;
    let a = srv.login("Testuser").await;
    let b = srv.login("Testuser").await;

    let res = srv
        .client
        .post(srv.url("/auth/logout"))
        .bearer_auth(access(&a))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .bearer_auth(access(&a))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/auth/tokens"))
        .bearer_auth(access(&b))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let live: Value = res.json().await.unwrap();
    // a's refresh token plus b's pair.
    assert_eq!(live.as_array().unwrap().len(), 3);

    let res = srv
        .client
        .post(srv.url("/auth/logout-all"))
        .bearer_auth(access(&b))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], 3);
}

#[tokio::test]
async fn change_password_signs_out_and_swaps_credentials() {
    let srv = TestServer::spawn().await;
    srv.register("Testuser", "test@x.com").await;
    let tokens = srv.login("Testuser").await;

    let res = srv
        .client
        .post(srv.url("/auth/change-password"))
        .bearer_auth(access(&tokens))
        .json(&json!({ "current_password": "Password1", "new_password": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "Testuser", "password": "Password2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn policy_routes_are_permission_guarded() {
    let srv = TestServer::spawn().await;
    let user_id = srv.register("Testuser", "test@x.com").await;
    let tokens = srv.login("Testuser").await;

    let res = srv
        .client
        .get(srv.url("/policy/roles"))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "permission_denied");

    srv.grant(
        user_id,
        &[
            codes::GET_LIST_ROLE,
            codes::CREATE_ROLE,
            codes::READ_ROLE,
            codes::DELETE_ROLE,
            codes::RESTORE_ROLE,
        ],
    )
    .await;

    let res = srv
        .client
        .post(srv.url("/policy/roles"))
        .bearer_auth(access(&tokens))
        .json(&json!({ "name": "Editor", "code": "editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let role: Value = res.json().await.unwrap();
    let role_id = role["id"].as_str().unwrap().to_string();
    assert_eq!(role["is_active"], true);

    let res = srv
        .client
        .post(srv.url("/policy/roles"))
        .bearer_auth(access(&tokens))
        .json(&json!({ "name": "Editor", "code": "editor-2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .delete(srv.url(&format!("/policy/roles/{role_id}")))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/policy/roles/{role_id}")))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .post(srv.url(&format!("/policy/roles/{role_id}/restore")))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url("/policy/roles"))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let roles: Value = res.json().await.unwrap();
    assert!(roles.as_array().unwrap().iter().any(|r| r["code"] == "editor"));
}

#[tokio::test]
async fn role_assignment_over_http() {
    let srv = TestServer::spawn().await;
    let admin_id = srv.register("Adminuser", "admin@x.com").await;
    let member_id = srv.register("Memberuser", "member@x.com").await;
    srv.grant(admin_id, &[codes::MANAGE_USER_ROLES, codes::READ_USER])
        .await;
    let tokens = srv.login("Adminuser").await;

    let role = srv
        .services
        .admin()
        .create_role(
            NewCatalogEntry {
                name: "Member".into(),
                code: "member".into(),
                description: None,
            },
            admin_id,
        )
        .await
        .unwrap();

    let assign = format!("/users/{member_id}/roles/{}", role.id);
    let res = srv
        .client
        .post(srv.url(&assign))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .post(srv.url(&assign))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_assigned");

    let res = srv
        .client
        .get(srv.url(&format!("/users/{member_id}/roles")))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let links: Value = res.json().await.unwrap();
    assert_eq!(links.as_array().unwrap().len(), 1);

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}/roles/{}", UserId::new(), role.id)))
        .bearer_auth(access(&tokens))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
