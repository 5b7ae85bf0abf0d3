use bytes::Bytes;
use http::{Method, Response, StatusCode};
use micro_dispatch::{
    Dispatcher, Endpoint, HttpContext, Json, NamedEnum, ServiceCollection, ServiceProvider, bindable, param,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    #[serde(default)]
    id: u64,
    title: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum Filter {
    All,
    Open,
    Done,
}

impl NamedEnum for Filter {
    const MEMBERS: &'static [(&'static str, Self)] =
        &[("all", Filter::All), ("open", Filter::Open), ("done", Filter::Done)];
}

#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Arc<Mutex<Vec<Todo>>>,
}

bindable!(object Todo);
bindable!(enum Filter);
bindable!(opaque TodoStore);

fn greet(name: String) -> String {
    format!("hello {name}\r\n")
}

fn find(store: TodoStore, id: u64) -> Option<Todo> {
    store.todos.lock().iter().find(|todo| todo.id == id).cloned()
}

fn list(store: TodoStore, filter: Option<Filter>) -> Vec<Todo> {
    let filter = filter.unwrap_or(Filter::All);
    store
        .todos
        .lock()
        .iter()
        .filter(|todo| match filter {
            Filter::All => true,
            Filter::Open => !todo.done,
            Filter::Done => todo.done,
        })
        .cloned()
        .collect()
}

async fn create(store: TodoStore, todo: Todo) -> (StatusCode, Json<Todo>) {
    let todo = {
        let mut todos = store.todos.lock();
        let todo = Todo { id: todos.len() as u64 + 1, ..todo };
        todos.push(todo.clone());
        todo
    };
    (StatusCode::CREATED, Json(todo))
}

async fn run(endpoint: &Endpoint, ctx: HttpContext) -> Response<Bytes> {
    if let Err(e) = endpoint.call(&ctx).await {
        tracing::error!(cause = %e, "dispatch failed");
        ctx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
    ctx.take_response()
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let services: Arc<dyn ServiceProvider> = Arc::new(ServiceCollection::new().add_singleton(TodoStore::default()));
    let dispatcher = Dispatcher::builder().services(Arc::clone(&services)).build();

    let greet = dispatcher.map(greet, [param("name").from_route()]).unwrap();
    let find = dispatcher.map(find, [param("store"), param("id").from_route()]).unwrap();
    let list = dispatcher.map(list, [param("store"), param("filter").from_query()]).unwrap();
    let create = dispatcher.map(create, [param("store"), param("todo").from_body()]).unwrap();

    let request = || HttpContext::builder().services(Arc::clone(&services));

    let response = run(&greet, request().uri("/hello/world").route_value("name", "world").build().unwrap()).await;
    info!(status = %response.status(), body = ?response.body(), "GET /hello/world");

    for title in ["write the docs", "ship it"] {
        let body = serde_json::to_vec(&serde_json::json!({ "title": title })).unwrap();
        let ctx = request().method(Method::POST).uri("/todos").body(body).build().unwrap();
        let response = run(&create, ctx).await;
        info!(status = %response.status(), body = ?response.body(), "POST /todos");
    }

    let response = run(&create, request().method(Method::POST).uri("/todos").body("{").build().unwrap()).await;
    info!(status = %response.status(), "POST /todos with a malformed body");

    let response = run(&find, request().uri("/todos/2").route_value("id", "2").build().unwrap()).await;
    info!(status = %response.status(), body = ?response.body(), "GET /todos/2");

    let response = run(&find, request().uri("/todos/two").route_value("id", "two").build().unwrap()).await;
    info!(status = %response.status(), "GET /todos/two");

    let response = run(&list, request().uri("/todos?filter=OPEN").build().unwrap()).await;
    info!(status = %response.status(), body = ?response.body(), "GET /todos?filter=OPEN");
}
