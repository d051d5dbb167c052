//! Execution order across middleware, hooks and views.

mod common;

use common::{failing_view, recording_hook, recording_view, Fault, Log, Recorder};
use http::{Method, StatusCode};
use proptest::prelude::*;
use tortilla::prelude::*;
use tortilla_test::TestClient;

#[tokio::test]
async fn test_middleware_wraps_view_in_registration_order() {
    let log = Log::default();
    let mut app = App::new();
    app.add_middleware(Recorder::new("A", &log)).unwrap();
    app.add_middleware(Recorder::new("B", &log)).unwrap();
    app.route("/", recording_view("view", &log)).unwrap();

    let client = TestClient::new(app.build().unwrap());
    client.get("/").send().await.assert_status(StatusCode::OK);

    assert_eq!(
        log.entries(),
        vec!["A-before", "B-before", "view", "B-after", "A-after"]
    );
}

#[tokio::test]
async fn test_after_phases_unwind_when_view_raises() {
    let log = Log::default();
    let mut app = App::new();
    app.add_middleware(Recorder::new("A", &log)).unwrap();
    app.add_middleware(Recorder::new("B", &log)).unwrap();
    app.route("/", failing_view("view", &log)).unwrap();

    let client = TestClient::new(app.build().unwrap());
    let res = client.get("/").send().await;

    res.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_text("500 Internal Server Error");
    assert_eq!(
        log.entries(),
        vec!["A-before", "B-before", "view", "B-after", "A-after"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_view_but_unwinds_entered_layers() {
    let log = Log::default();
    let mut app = App::new();
    app.add_middleware(Recorder::new("A", &log)).unwrap();
    app.add_middleware(Recorder::with_fault("B", &log, Fault::ShortCircuit))
        .unwrap();
    app.add_middleware(Recorder::new("C", &log)).unwrap();
    app.route("/", recording_view("view", &log)).unwrap();
    app.before(
        HookTarget::route("/"),
        recording_hook("hook", &log),
        HookArgs::new(),
    )
    .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_text("short-circuited by B");

    assert_eq!(log.entries(), vec!["A-before", "B-before", "B-after", "A-after"]);
}

#[tokio::test]
async fn test_hook_levels_nest_around_the_view() {
    let log = Log::default();
    let mut app = App::new();
    app.route(
        "/items",
        ClassView::new("Items").get(recording_view("Items.get", &log)),
    )
    .unwrap();

    let route = HookTarget::route("/items");
    let class = HookTarget::view("Items");
    let method = HookTarget::method("Items", Method::GET);

    // Attach in scrambled order; levels decide the nesting.
    app.before(method.clone(), recording_hook("method-before", &log), HookArgs::new())
        .unwrap();
    app.after(route.clone(), recording_hook("route-after-1", &log), HookArgs::new())
        .unwrap();
    app.before(class.clone(), recording_hook("class-before", &log), HookArgs::new())
        .unwrap();
    app.before(route.clone(), recording_hook("route-before-1", &log), HookArgs::new())
        .unwrap();
    app.before(route.clone(), recording_hook("route-before-2", &log), HookArgs::new())
        .unwrap();
    app.after(method, recording_hook("method-after", &log), HookArgs::new())
        .unwrap();
    app.after(class, recording_hook("class-after", &log), HookArgs::new())
        .unwrap();
    app.after(route, recording_hook("route-after-2", &log), HookArgs::new())
        .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client.get("/items").send().await.assert_status(StatusCode::OK);

    assert_eq!(
        log.entries(),
        vec![
            "route-before-1",
            "route-before-2",
            "class-before",
            "method-before",
            "Items.get",
            "method-after",
            "class-after",
            "route-after-2",
            "route-after-1",
        ]
    );
}

#[tokio::test]
async fn test_hooks_run_inside_middleware() {
    let log = Log::default();
    let mut app = App::new();
    app.add_middleware(Recorder::new("A", &log)).unwrap();
    app.route("/", recording_view("view", &log)).unwrap();
    app.before(HookTarget::route("/"), recording_hook("before", &log), HookArgs::new())
        .unwrap();
    app.after(HookTarget::route("/"), recording_hook("after", &log), HookArgs::new())
        .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client.get("/").send().await;

    assert_eq!(
        log.entries(),
        vec!["A-before", "before", "view", "after", "A-after"]
    );
}

#[tokio::test]
async fn test_raising_hook_stops_its_phase() {
    let log = Log::default();
    let mut app = App::new();
    app.route("/", recording_view("view", &log)).unwrap();
    app.before(
        HookTarget::route("/"),
        hook("deny", |_req, _res: Response, _params, _args| async move {
            Err::<Response, _>(DispatchError::from(HttpError::forbidden()))
        }),
        HookArgs::new(),
    )
    .unwrap();
    app.before(HookTarget::route("/"), recording_hook("second", &log), HookArgs::new())
        .unwrap();
    app.after(HookTarget::route("/"), recording_hook("after", &log), HookArgs::new())
        .unwrap();

    let client = TestClient::new(app.build().unwrap());
    client
        .get("/")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_text("403 Forbidden");
    assert!(log.is_empty());
}

fn run_chain(count: usize, fail: bool) -> Vec<String> {
    let log = Log::default();
    let mut app = App::new();
    for i in 0..count {
        app.add_middleware(Recorder::new(&format!("m{i}"), &log)).unwrap();
    }
    if fail {
        app.route("/", failing_view("view", &log)).unwrap();
    } else {
        app.route("/", recording_view("view", &log)).unwrap();
    }
    let client = TestClient::new(app.build().unwrap());

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(client.get("/").send());
    log.entries()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_before_in_order_after_in_reverse(count in 0usize..7, fail in any::<bool>()) {
        let mut expected: Vec<String> = (0..count).map(|i| format!("m{i}-before")).collect();
        expected.push("view".to_string());
        expected.extend((0..count).rev().map(|i| format!("m{i}-after")));

        prop_assert_eq!(run_chain(count, fail), expected);
    }
}
