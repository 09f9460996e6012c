use bint_core::prelude::*;
use bint_core::routing::{ParamType, RouteCompiler, ScalarKind, Verb};
use bint_core::ConfigIssue;

#[derive(Deserialize)]
struct Order {
    #[allow(dead_code)]
    sku: String,
}

struct UserController;

impl Controller for UserController {
    fn setup(&self) -> RouteGroup {
        RouteGroup::new("user")
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::new("Get", |_ctx: Context, id: i64| async move { Json(id) }),
            Operation::new("GetUserOrder", |_ctx: Context, user: i64, order: String| async move {
                Json(format!("{user}:{order}"))
            }),
            Operation::new("PostOrder", |_ctx: Context, Body(_order): Body<Order>| async {}),
            Operation::new("PatchFlag", |_ctx: Context, on: bool| async move { Json(on) }),
            Operation::new("Setup", |_ctx: Context| async {}),
            Operation::new("helper", |_ctx: Context| async {}),
        ]
    }
}

struct RootController;

impl Controller for RootController {
    fn setup(&self) -> RouteGroup {
        RouteGroup::new("/")
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![Operation::new("Get", |_ctx: Context| async { "root" })]
    }
}

struct BrokenController;

impl Controller for BrokenController {
    fn setup(&self) -> RouteGroup {
        RouteGroup::new("broken")
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::new("GetNoContext", |id: i64| async move { id }),
            Operation::new("GetNothing", || async {}),
            Operation::new("PutLateContext", |_ctx: Context, _id: i64, _again: Context| async {}),
            Operation::from_parts(
                "PostBodyFirst",
                vec![ParamType::Context, ParamType::Body, ParamType::Scalar(ScalarKind::Int)],
                |_args| async { Reply::empty() },
            ),
        ]
    }
}

fn compile(controllers: Vec<Arc<dyn Controller>>) -> Result<bint_core::routing::RouteTable, bint_core::StartupError> {
    RouteCompiler::compile(&controllers)
}

// ═══ Route shapes ═══

#[test]
fn test_plain_verb_is_group_root() {
    let table = compile(vec![Arc::new(UserController)]).unwrap();
    let route = table.find(Verb::Get, "/user/:param1").expect("GET /user/:param1");
    assert_eq!(route.params, vec!["param1"]);
    assert_eq!(route.operation, "Get");
    assert_eq!(route.controller, "UserController");
}

#[test]
fn test_multi_word_name_with_two_scalars() {
    let table = compile(vec![Arc::new(UserController)]).unwrap();
    let route = table
        .find(Verb::Get, "/user/user-order/:param1/:param2")
        .expect("GET /user/user-order/:param1/:param2");
    assert_eq!(route.params, vec!["param1", "param2"]);
    assert_eq!(route.axum_path(), "/user/user-order/{param1}/{param2}");
}

#[test]
fn test_body_parameter_is_not_a_path_segment() {
    let table = compile(vec![Arc::new(UserController)]).unwrap();
    let route = table.find(Verb::Post, "/user/order").expect("POST /user/order");
    assert!(route.params.is_empty());
    assert_eq!(route.param_types(), &[ParamType::Context, ParamType::Body]);
}

#[test]
fn test_setup_and_unprefixed_operations_are_skipped() {
    let table = compile(vec![Arc::new(UserController)]).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table.routes().all(|r| r.operation != "Setup" && r.operation != "helper"));
}

#[test]
fn test_root_prefix_and_empty_name_give_slash() {
    let table = compile(vec![Arc::new(RootController)]).unwrap();
    assert!(table.find(Verb::Get, "/").is_some());
    assert_eq!(table.groups()[0].prefix, "");
}

#[test]
fn test_prefix_normalization() {
    assert_eq!(RouteGroup::new("user").prefix(), "/user");
    assert_eq!(RouteGroup::new("/user/").prefix(), "/user");
    assert_eq!(RouteGroup::new("api/v1").prefix(), "/api/v1");
    assert_eq!(RouteGroup::new("").prefix(), "");
    assert_eq!(RouteGroup::new("/").prefix(), "");
}

#[test]
fn test_group_middleware_is_recorded() {
    struct Guarded;
    impl Controller for Guarded {
        fn setup(&self) -> RouteGroup {
            let pass = middleware(|_ctx: Context, req: Request, next: Next| async move {
                Ok(next.run(req).await)
            });
            RouteGroup::new("guarded").layer(pass.clone()).layer(pass)
        }

        fn operations(self: Arc<Self>) -> Vec<Operation> {
            vec![Operation::new("Get", |_ctx: Context| async {})]
        }
    }

    let table = compile(vec![Arc::new(Guarded)]).unwrap();
    assert_eq!(table.groups()[0].middleware_count(), 2);
}

// ═══ Determinism ═══

#[test]
fn test_compilation_is_idempotent() {
    let controllers: Vec<Arc<dyn Controller>> = vec![Arc::new(UserController), Arc::new(RootController)];
    let first = RouteCompiler::compile(&controllers).unwrap();
    let second = RouteCompiler::compile(&controllers).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_routes_follow_declaration_order() {
    let table = compile(vec![Arc::new(UserController), Arc::new(RootController)]).unwrap();
    let ops: Vec<_> = table.routes().map(|r| r.operation.as_str()).collect();
    assert_eq!(ops, vec!["Get", "GetUserOrder", "PostOrder", "PatchFlag", "Get"]);
}

// ═══ Startup validation ═══

#[test]
fn test_all_signature_issues_are_collected() {
    let err = compile(vec![Arc::new(BrokenController)]).unwrap_err();
    assert_eq!(
        err.issues,
        vec![
            ConfigIssue::MissingContext {
                controller: "BrokenController".into(),
                operation: "GetNoContext".into(),
            },
            ConfigIssue::MissingContext {
                controller: "BrokenController".into(),
                operation: "GetNothing".into(),
            },
            ConfigIssue::MisplacedContext {
                controller: "BrokenController".into(),
                operation: "PutLateContext".into(),
                index: 2,
            },
            ConfigIssue::BodyNotLast {
                controller: "BrokenController".into(),
                operation: "PostBodyFirst".into(),
            },
        ]
    );
}

#[test]
fn test_startup_error_lists_every_issue() {
    let err = compile(vec![Arc::new(BrokenController)]).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("4 route configuration error(s)"));
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("BrokenController::GetNoContext"));
}

#[test]
fn test_duplicate_routes_across_controllers() {
    let err = compile(vec![Arc::new(UserController), Arc::new(UserController)]).unwrap_err();
    assert_eq!(err.issues.len(), 4);
    assert!(err.issues.contains(&ConfigIssue::DuplicateRoute {
        method: "GET".into(),
        path: "/user/:param1".into(),
    }));
}

#[test]
fn test_unsupported_scalar_is_accepted_at_startup() {
    struct Odd;
    impl Controller for Odd {
        fn setup(&self) -> RouteGroup {
            RouteGroup::new("odd")
        }

        fn operations(self: Arc<Self>) -> Vec<Operation> {
            vec![Operation::from_parts(
                "GetRatio",
                vec![ParamType::Context, ParamType::Scalar(ScalarKind::Other("f64"))],
                |_args| async { Reply::empty() },
            )]
        }
    }

    let table = compile(vec![Arc::new(Odd)]).unwrap();
    assert!(table.find(Verb::Get, "/odd/ratio/:param1").is_some());
}
