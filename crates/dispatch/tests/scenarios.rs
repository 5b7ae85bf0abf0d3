use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use futures::future::{BoxFuture, FutureExt};
use http::header::CONTENT_TYPE;
use http::{Method, Response, StatusCode};
use micro_dispatch::{
    Dispatcher, Endpoint, EntryPoint, HttpContext, Json, NamedEnum, ProcessorKind, bindable, param, serialized_output,
};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
    id: u64,
    title: String,
    done: bool,
}

bindable!(object Todo);
serialized_output!(Todo);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Priority {
    Low,
    High,
}

impl NamedEnum for Priority {
    const MEMBERS: &'static [(&'static str, Self)] = &[("Low", Priority::Low), ("High", Priority::High)];
}

bindable!(enum Priority);

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capturing_dispatcher() -> (Dispatcher, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .finish();

    let dispatcher = Dispatcher::builder().diagnostics(tracing::Dispatch::new(subscriber)).build();
    (dispatcher, captured)
}

async fn dispatch(endpoint: &Endpoint, ctx: &HttpContext) -> Response<Bytes> {
    endpoint.call(ctx).await.unwrap();
    ctx.take_response()
}

fn greet(name: String) -> String {
    format!("Hello, {name}!")
}

#[tokio::test]
async fn greet_writes_the_returned_text() {
    let endpoint = Dispatcher::builder().build().map(greet, [param("name")]).unwrap();
    let ctx = HttpContext::builder().uri("/hello/Ada").route_value("name", "Ada").build().unwrap();

    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
    assert_eq!(response.body().as_ref(), b"Hello, Ada!");
}

#[tokio::test]
async fn invalid_id_answers_400_without_invoking_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let get = move |id: i32| -> Option<Todo> {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(Todo { id: u64::try_from(id).unwrap_or_default(), title: String::new(), done: false })
    };

    let (dispatcher, captured) = capturing_dispatcher();
    let endpoint = dispatcher.map(get, [param("id")]).unwrap();
    let ctx = HttpContext::builder().uri("/todos/abc").route_value("id", "abc").build().unwrap();

    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.body().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let logs = captured.contents();
    assert!(logs.contains("failed to bind parameter"), "{logs}");
    assert!(logs.contains("id"), "{logs}");
    assert!(logs.contains("i32"), "{logs}");
}

#[tokio::test]
async fn malformed_body_answers_400_and_names_the_parameter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let create = move |todo: Todo| {
        counter.fetch_add(1, Ordering::SeqCst);
        todo
    };

    let (dispatcher, captured) = capturing_dispatcher();
    let endpoint = dispatcher.map(create, [param("todo").from_body()]).unwrap();
    assert_eq!(endpoint.entry_point(), EntryPoint::BodyAware);

    let ctx = HttpContext::builder().method(Method::POST).uri("/todos").body(r#"{"id": 1, "title": "#).build().unwrap();
    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let logs = captured.contents();
    assert!(logs.contains("todo"), "{logs}");
    assert!(logs.contains("malformed request body"), "{logs}");
}

#[tokio::test]
async fn async_struct_result_is_serialized() {
    async fn find(id: u64) -> Todo {
        Todo { id, title: "write the docs".into(), done: true }
    }

    let endpoint = Dispatcher::builder().build().map(find, [param("id").from_route()]).unwrap();
    assert_eq!(endpoint.result_kind(), ProcessorKind::AwaitSerialize);

    let ctx = HttpContext::builder().route_value("id", "12").build().unwrap();
    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    let todo: Todo = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(todo, Todo { id: 12, title: "write the docs".into(), done: true });
}

#[tokio::test]
async fn boxed_and_async_fn_results_match() {
    fn boxed(id: u64) -> BoxFuture<'static, Todo> {
        async move { Todo { id, title: "same".into(), done: false } }.boxed()
    }

    async fn unboxed(id: u64) -> Todo {
        Todo { id, title: "same".into(), done: false }
    }

    let dispatcher = Dispatcher::builder().build();
    let boxed = dispatcher.map(boxed, [param("id")]).unwrap();
    let unboxed = dispatcher.map(unboxed, [param("id")]).unwrap();
    assert_eq!(boxed.result_kind(), unboxed.result_kind());

    let first = dispatch(&boxed, &HttpContext::builder().uri("/?id=3").build().unwrap()).await;
    let second = dispatch(&unboxed, &HttpContext::builder().uri("/?id=3").build().unwrap()).await;

    assert_eq!(first.headers(), second.headers());
    assert_eq!(first.body(), second.body());
}

#[test]
fn handlers_without_body_complete_immediately() {
    let dispatcher = Dispatcher::builder().build();
    let endpoint = dispatcher.map(|a: u32, b: u32| a * b, [param("a"), param("b")]).unwrap();
    assert_eq!(endpoint.entry_point(), EntryPoint::Immediate);

    let ctx = HttpContext::builder().uri("/?a=6&b=7").build().unwrap();
    let completion = endpoint.call(&ctx);

    assert!(completion.is_ready());
    completion.into_ready().unwrap().unwrap();
    assert_eq!(ctx.take_response().body().as_ref(), b"42");
}

#[test]
fn repeated_requests_produce_identical_output() {
    let dispatcher = Dispatcher::builder().build();
    let endpoint = dispatcher
        .map(|id: u64| Json(Todo { id, title: "stable".into(), done: false }), [param("id")])
        .unwrap();

    let outputs: Vec<_> = (0..2)
        .map(|_| {
            let ctx = HttpContext::builder().route_value("id", "5").build().unwrap();
            endpoint.call(&ctx).into_ready().unwrap().unwrap();
            ctx.take_response()
        })
        .collect();

    assert_eq!(outputs[0].headers(), outputs[1].headers());
    assert_eq!(outputs[0].body(), outputs[1].body());
}

#[tokio::test]
async fn values_round_trip_through_route_query_and_header() {
    let id = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
    let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let at: DateTime<FixedOffset> = FixedOffset::west_opt(5 * 3600).unwrap().with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let endpoint = Dispatcher::builder()
        .build()
        .map(
            |id: Uuid, day: NaiveDate, at: DateTime<FixedOffset>, priority: Priority, ratio: f64| {
                format!("{id}|{day}|{}|{priority:?}|{ratio}", at.to_rfc3339())
            },
            [
                param("id").from_route(),
                param("day").from_query(),
                param("at").from_header_named("x-at"),
                param("priority").from_query(),
                param("ratio").from_header(),
            ],
        )
        .unwrap();

    let ctx = HttpContext::builder()
        .uri(format!("/?day={day}&priority=high"))
        .route_value("id", id.to_string())
        .header("x-at", at.to_rfc3339())
        .header("ratio", "0.25")
        .build()
        .unwrap();
    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(response.body().to_vec()).unwrap();
    assert_eq!(body, format!("{id}|{day}|{}|High|0.25", at.to_rfc3339()));
}

#[tokio::test]
async fn cancellation_token_is_the_requests_own() {
    let endpoint = Dispatcher::builder()
        .build()
        .map(|token: CancellationToken| if token.is_cancelled() { "cancelled" } else { "running" }, [param("token")])
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = HttpContext::builder().cancellation(token).build().unwrap();

    assert_eq!(dispatch(&endpoint, &ctx).await.body().as_ref(), b"cancelled");
}

#[tokio::test]
async fn context_parameter_can_shape_the_response() {
    let endpoint = Dispatcher::builder()
        .build()
        .map(
            |ctx: HttpContext, id: u32| {
                ctx.set_status(StatusCode::ACCEPTED);
                async move { (StatusCode::CREATED, Json(id)) }
            },
            [param("ctx"), param("id")],
        )
        .unwrap();
    assert_eq!(endpoint.result_kind(), ProcessorKind::AwaitExecute);

    let ctx = HttpContext::builder().uri("/?id=9").build().unwrap();
    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body().as_ref(), b"9");
}

#[tokio::test]
async fn optional_body_accepts_an_empty_payload() {
    let endpoint = Dispatcher::builder()
        .build()
        .map(
            |todo: Option<Todo>| todo.map_or_else(|| String::from("nothing"), |todo| todo.title),
            [param("todo").from_body_or_empty()],
        )
        .unwrap();

    let ctx = HttpContext::builder().method(Method::PUT).body(Bytes::new()).build().unwrap();
    assert_eq!(dispatch(&endpoint, &ctx).await.body().as_ref(), b"nothing");
}

#[tokio::test]
async fn optional_body_binds_none_for_null() {
    let endpoint = Dispatcher::builder()
        .build()
        .map(
            |todo: Option<Todo>| todo.map_or_else(|| String::from("nothing"), |todo| todo.title),
            [param("todo").from_body_or_empty()],
        )
        .unwrap();

    let ctx = HttpContext::builder().method(Method::PUT).body("null").build().unwrap();
    let response = dispatch(&endpoint, &ctx).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"nothing");
}

#[tokio::test]
async fn failed_route_value_leaves_the_body_unread() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let update = move |_id: u32, todo: Todo| {
        counter.fetch_add(1, Ordering::SeqCst);
        todo
    };

    let endpoint = Dispatcher::builder()
        .build()
        .map(update, [param("id").from_route(), param("todo").from_body()])
        .unwrap();
    assert_eq!(endpoint.entry_point(), EntryPoint::BodyAware);

    let payload = serde_json::to_vec(&Todo { id: 1, title: "rename".into(), done: false }).unwrap();
    let ctx = HttpContext::builder().method(Method::PUT).uri("/todos/abc").route_value("id", "abc").body(payload).build().unwrap();

    endpoint.call(&ctx).await.unwrap();

    assert_eq!(ctx.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(ctx.has_body().await);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let endpoint = Dispatcher::builder().max_body_size(16).build().map(|todo: Todo| todo, [param("todo")]).unwrap();

    let payload = serde_json::to_vec(&Todo { id: 1, title: "far too long for the limit".into(), done: false }).unwrap();
    let ctx = HttpContext::builder().body(payload).build().unwrap();

    assert_eq!(dispatch(&endpoint, &ctx).await.status(), StatusCode::BAD_REQUEST);
}
