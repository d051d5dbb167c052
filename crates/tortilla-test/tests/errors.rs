//! Error resolution across views, hooks and middleware.

mod common;

use std::any::TypeId;

use common::{failing_view, recording_view, Fault, Log, Recorder, Teapot};
use http::{HeaderName, HeaderValue, StatusCode};
use tortilla::prelude::*;
use tortilla_test::TestClient;

#[derive(Debug, thiserror::Error)]
#[error("domain failure")]
struct DomainError;

impl ErrorClass for DomainError {}

#[derive(Debug, thiserror::Error)]
#[error("out of stock")]
struct OutOfStock;

impl ErrorClass for OutOfStock {
    fn ancestors() -> Vec<TypeId> {
        vec![TypeId::of::<DomainError>()]
    }
}

fn muted() -> impl tortilla::ErrorHandler {
    error_handler("muted", |_req, mut res: Response, _err| async move {
        res.set_text("muted!");
        res
    })
}

fn raising_hook() -> impl Hook {
    hook("raise", |_req, _res: Response, _params, _args| async move {
        Err::<Response, _>(DispatchError::from(OutOfStock))
    })
}

#[tokio::test]
async fn test_before_hook_error_reaches_custom_handler() {
    let log = Log::default();
    let mut app = App::new();
    app.route("/", recording_view("view", &log)).unwrap();
    app.before(HookTarget::route("/"), raising_hook(), HookArgs::new())
        .unwrap();
    app.error_handler::<OutOfStock>(error_handler(
        "out_of_stock",
        |_req, mut res: Response, err| async move {
            res.set_status(StatusCode::CONFLICT);
            res.set_text(format!("sorry: {err}"));
            res
        },
    ))
    .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_status(StatusCode::CONFLICT)
        .assert_text("sorry: out of stock");
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_after_hook_error_resolves_to_nearest_ancestor() {
    let log = Log::default();
    let mut app = App::new();
    app.route("/", recording_view("view", &log)).unwrap();
    app.after(HookTarget::view("view"), raising_hook(), HookArgs::new())
        .unwrap();
    app.error_handler::<DomainError>(muted()).unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_text("muted!");
    assert_eq!(log.entries(), vec!["view"]);
}

#[tokio::test]
async fn test_unregistered_error_is_generic_500() {
    let log = Log::default();
    let mut app = App::new();
    app.route("/", failing_view("view", &log)).unwrap();

    let client = TestClient::new(app.build().unwrap());
    let res = client.get("/").send().await;
    res.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_text("500 Internal Server Error");
    assert!(!res.text().unwrap().contains("kettle"));
}

#[tokio::test]
async fn test_middleware_phase_errors_use_custom_handler() {
    for fault in [Fault::FailBefore, Fault::FailAfter] {
        let log = Log::default();
        let mut app = App::new();
        app.add_middleware(Recorder::new("outer", &log)).unwrap();
        app.add_middleware(Recorder::with_fault("faulty", &log, fault))
            .unwrap();
        app.route("/", recording_view("view", &log)).unwrap();
        app.error_handler::<Teapot>(muted()).unwrap();

        let client = TestClient::new(app.build().unwrap());
        client
            .get("/")
            .send()
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
            .assert_text("muted!");

        // The failing phase aborts the rest of the chain.
        let entries = log.entries();
        assert!(!entries.contains(&"outer-after".to_string()));
        assert_eq!(entries.first().map(String::as_str), Some("outer-before"));
    }
}

#[tokio::test]
async fn test_http_error_from_middleware_uses_http_handler() {
    struct Gatekeeper;
    impl Callable for Gatekeeper {}
    impl Middleware for Gatekeeper {
        fn before_dispatch<'a>(
            &'a self,
            req: &'a Request,
        ) -> BoxFuture<'a, DispatchResult<Option<Response>>> {
            let authorized = req.header("authorization").is_some();
            let outcome: DispatchResult<Option<Response>> = if authorized {
                Ok(None)
            } else {
                Err(DispatchError::from(HttpError::unauthorized()))
            };
            Box::pin(std::future::ready(outcome))
        }
    }

    let log = Log::default();
    let mut app = App::new();
    app.add_middleware(Gatekeeper).unwrap();
    app.route("/", recording_view("view", &log)).unwrap();
    app.error_handler::<HttpError>(error_handler(
        "http",
        |_req, mut res: Response, err| async move {
            res.set_status(err.status());
            res.set_text("Foo");
            res
        },
    ))
    .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_text("Foo");
    client
        .get("/")
        .header("authorization", "Bearer t")
        .send()
        .await
        .assert_text("view");

    // Routing outcomes reach an explicitly registered HTTP error handler.
    client
        .get("/nowhere")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_text("Foo");
}

#[tokio::test]
async fn test_error_handler_sees_default_headers_and_500() {
    let log = Log::default();
    let mut app = App::new();
    app.default_header(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    app.route("/", failing_view("view", &log)).unwrap();
    app.error_handler::<Teapot>(error_handler(
        "inspect",
        |_req, mut res: Response, _err| async move {
            let seen = format!(
                "{} {}",
                res.status().as_u16(),
                res.header("x-frame-options").unwrap_or("-")
            );
            res.set_text(seen);
            res
        },
    ))
    .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_text("500 DENY")
        .assert_header("x-frame-options", "DENY");
}

#[tokio::test]
async fn test_json_error_format() {
    let mut app = App::new();
    app.error_format(ErrorFormat::Json);
    app.route_with_methods("/", &["GET"], view("index", |_req, res| async move { Ok(res) }))
        .unwrap();

    let client = TestClient::new(app.build().unwrap());
    let res = client.post("/").send().await;
    res.assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("content-type", "application/json");
    let body: serde_json::Value = res.json().unwrap();
    assert_eq!(
        body,
        serde_json::json!({"error": "405 Method Not Allowed", "status": 405})
    );
}

#[tokio::test]
async fn test_built_in_renderers_are_registrable() {
    let mut app = App::new();
    app.route(
        "/",
        view("index", |_req, _res: Response| async move {
            Err::<Response, _>(DispatchError::from(HttpError::with_detail(
                StatusCode::IM_A_TEAPOT,
                "short and stout",
            )))
        }),
    )
    .unwrap();
    app.error_handler::<HttpError>(error_handler("html", tortilla::error_to_html))
        .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_status(StatusCode::IM_A_TEAPOT)
        .assert_header("content-type", "text/html; charset=utf-8")
        .assert_text("<h1>short and stout</h1>");
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct StillBrewing(HttpError);

impl ErrorClass for StillBrewing {
    fn ancestors() -> Vec<TypeId> {
        tortilla::core::lineage_of::<HttpError>()
    }

    fn as_http(&self) -> Option<&HttpError> {
        Some(&self.0)
    }
}

fn brewing_app() -> App {
    let mut app = App::new();
    app.route(
        "/coffee",
        view("coffee", |_req, _res: Response| async move {
            Err::<Response, _>(DispatchError::from(StillBrewing(HttpError::with_detail(
                StatusCode::IM_A_TEAPOT,
                "still brewing",
            ))))
        }),
    )
    .unwrap();
    app
}

#[tokio::test]
async fn test_http_error_descendant_keeps_status_by_default() {
    let client = TestClient::new(brewing_app().build().unwrap());
    client
        .get("/coffee")
        .send()
        .await
        .assert_status(StatusCode::IM_A_TEAPOT)
        .assert_text("still brewing");
}

#[tokio::test]
async fn test_http_error_handler_reads_descendant_status() {
    let mut app = brewing_app();
    app.error_handler::<HttpError>(error_handler(
        "http",
        |_req, mut res: Response, err| async move {
            res.set_status(err.status());
            let detail = err.as_http().map(HttpError::detail).unwrap_or("-");
            let body = format!("handled: {detail} ({})", err.category().as_str());
            res.set_text(body);
            res
        },
    ))
    .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/coffee")
        .send()
        .await
        .assert_status(StatusCode::IM_A_TEAPOT)
        .assert_text("handled: still brewing (http)");
}
