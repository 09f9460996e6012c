use bint_core::{App, TestApp};
use bint_simple_api::{Migrator, UserController};
use serde_json::json;

/// Same assembly as main.rs, served on a random port over in-memory SQLite.
async fn setup() -> TestApp {
    let app = App::new(TestApp::config())
        .await
        .unwrap()
        .controller(UserController)
        .unwrap()
        .migrate::<Migrator>()
        .await
        .unwrap();
    TestApp::with_app(app).await
}

async fn create(app: &TestApp, name: &str, email: &str) -> i64 {
    let body = json!({"name": name, "email": email});
    let res = app.client.post(&app.url("/user"), &body.to_string()).await;
    assert_eq!(res.code(), 0, "create failed: {}", res.body);
    res.data()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_list_users_empty() {
    let app = setup().await;
    let res = app.client.get(&app.url("/user/list")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data(), json!([]));
}

#[tokio::test]
async fn test_create_and_get_user() {
    let app = setup().await;
    let id = create(&app, "Ada", "ada@example.com").await;

    let res = app.client.get(&app.url(&format!("/user/{id}"))).await;
    assert_eq!(res.status, 200);
    assert_eq!(
        res.json(),
        json!({"code": 0, "msg": "success", "data": {"id": id, "name": "Ada", "email": "ada@example.com"}})
    );
}

#[tokio::test]
async fn test_get_missing_user() {
    let app = setup().await;
    let res = app.client.get(&app.url("/user/999")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.code(), 404);
    assert_eq!(res.msg(), "user not found");
}

#[tokio::test]
async fn test_get_with_non_numeric_id() {
    let app = setup().await;
    let res = app.client.get(&app.url("/user/abc")).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.msg(), "invalid integer value param1");
}

#[tokio::test]
async fn test_create_validation_failure() {
    let app = setup().await;
    let res = app
        .client
        .post(&app.url("/user"), r#"{"name":"","email":"nobody"}"#)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.code(), -1);
}

#[tokio::test]
async fn test_create_with_malformed_body() {
    let app = setup().await;
    let res = app.client.post(&app.url("/user"), r#"{"name":1}"#).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.msg(), "invalid request body");
}

#[tokio::test]
async fn test_update_then_get_sees_change() {
    let app = setup().await;
    let id = create(&app, "Grace", "grace@example.com").await;

    // Warm the cache, then update.
    app.client.get(&app.url(&format!("/user/{id}"))).await;
    let res = app
        .client
        .put(&app.url(&format!("/user/{id}")), r#"{"name":"Grace H."}"#)
        .await;
    assert_eq!(res.code(), 0);

    let res = app.client.get(&app.url(&format!("/user/{id}"))).await;
    assert_eq!(res.data()["name"], "Grace H.");
}

#[tokio::test]
async fn test_delete_user() {
    let app = setup().await;
    let id = create(&app, "Linus", "linus@example.com").await;

    let res = app.client.delete(&app.url(&format!("/user/{id}"))).await;
    assert_eq!(res.json(), json!({"code": 0, "msg": "success"}));

    let res = app.client.delete(&app.url(&format!("/user/{id}"))).await;
    assert_eq!(res.code(), 404);
}

#[tokio::test]
async fn test_routes_compiled() {
    let app = App::new(TestApp::config())
        .await
        .unwrap()
        .controller(UserController)
        .unwrap();
    let paths: Vec<String> = app.routes().routes().map(|r| format!("{} {}", r.verb, r.path)).collect();
    assert_eq!(
        paths,
        vec![
            "GET /user/:param1",
            "GET /user/list",
            "POST /user",
            "PUT /user/:param1",
            "DELETE /user/:param1",
        ]
    );
}
