//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use comet::http::handler::{handler_fn, BoxedHandler};
use comet::http::middleware::{recover, request_id, request_logging};
use comet::http::ServerError;
use comet::security::{
    authenticated, authorize, require_role, BearerTokenValidator, Claims, SessionError,
    SessionValidator,
};
use comet::{ApiServer, Controller, Policies, Request, Response, Routes, Scope, ServerConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
}

#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<Vec<User>>,
}

impl UserStore {
    pub fn seeded() -> Self {
        let users = [(1, "ada"), (2, "grace"), (7, "linus")]
            .into_iter()
            .map(|(id, name)| User { id, name: name.to_string() })
            .collect();
        Self { users: Mutex::new(users) }
    }

    pub fn get(&self, id: u32) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn insert(&self, new: NewUser) -> User {
        let mut users = self.users.lock().unwrap();
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User { id, name: new.name };
        users.push(user.clone());
        user
    }

    pub fn remove(&self, id: u32) -> bool {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

pub struct UsersController {
    store: Arc<UserStore>,
}

impl UsersController {
    fn id(req: &Request) -> Option<u32> {
        req.param("id").and_then(|id| id.parse().ok())
    }

    async fn get_user_by_id(self: Arc<Self>, req: Request) -> Response {
        let Some(id) = Self::id(&req) else {
            return Response::bad_request("invalid id");
        };
        match self.store.get(id) {
            Some(user) => Response::ok(user),
            None => Response::not_found(),
        }
    }

    async fn list_users(self: Arc<Self>, _req: Request) -> Response {
        Response::ok(self.store.list())
    }

    async fn post_user(self: Arc<Self>, req: Request) -> Response {
        match req.json::<NewUser>() {
            Ok(new) => Response::ok(self.store.insert(new)),
            Err(e) => Response::bad_request(e.to_string()),
        }
    }

    async fn delete_user_by_id(self: Arc<Self>, req: Request) -> Response {
        match Self::id(&req) {
            Some(id) if self.store.remove(id) => Response::ok(id),
            Some(_) => Response::not_found(),
            None => Response::bad_request("invalid id"),
        }
    }

    async fn get_me(self: Arc<Self>, req: Request) -> Response {
        Response::ok(json!({ "user_id": req.context().user_id() }))
    }
}

impl Controller for UsersController {
    fn policies(&self) -> Policies {
        Policies::new()
            .add("DeleteUserByID", require_role("admin"))
            .add("GetMe", authenticated())
    }

    fn routes() -> Routes<Self> {
        Routes::new()
            .route("GetUserByID", Self::get_user_by_id)
            .route("ListUsers", Self::list_users)
            .route("PostUser", Self::post_user)
            .route("DeleteUserByID", Self::delete_user_by_id)
            .route("GetMe", Self::get_me)
            .route("Validate", Self::list_users)
    }
}

/// Two parameterized routes that match the same paths, plus an exact one.
pub struct OrdersController;

impl Controller for OrdersController {
    fn base_path(&self) -> Option<String> {
        Some("/orders".to_string())
    }

    fn routes() -> Routes<Self> {
        Routes::new()
            .route("GetByID", |_c: Arc<Self>, req: Request| async move {
                Response::ok(json!({ "handler": "GetByID", "id": req.param("id") }))
            })
            .route("GetByCustomer", |_c: Arc<Self>, _req: Request| async {
                Response::ok(json!({ "handler": "GetByCustomer" }))
            })
            .route("GetRecent", |_c: Arc<Self>, _req: Request| async {
                Response::ok(json!({ "handler": "GetRecent" }))
            })
            .route("ListOrders", |_c: Arc<Self>, req: Request| async move {
                Response::ok(json!({ "status": req.query_param("status") }))
            })
    }
}

/// Wildcard `authenticated()` then a handler policy that needs its user id.
pub struct AuditController;

fn stamp(next: BoxedHandler, value: Value) -> BoxedHandler {
    handler_fn(move |req: Request| {
        let next = next.clone();
        let stamp = value.as_str().unwrap_or_default().to_string();
        async move {
            let Some(user) = req.context().user_id().map(str::to_string) else {
                return Response::unauthorized();
            };
            let context = req.context().with_request_id(format!("{stamp}:{user}"));
            next.call(req.with_context(context)).await
        }
    })
}

impl Controller for AuditController {
    fn base_path(&self) -> Option<String> {
        Some("/audit".to_string())
    }

    fn policies(&self) -> Policies {
        Policies::new()
            .add("GetTrail", authorize(stamp, "stamped"))
            .all(authenticated())
    }

    fn routes() -> Routes<Self> {
        Routes::new().route("GetTrail", |_c: Arc<Self>, req: Request| async move {
            Response::ok(json!({
                "user_id": req.context().user_id(),
                "request_id": req.context().request_id(),
            }))
        })
    }
}

pub struct PanicController;

impl Controller for PanicController {
    fn base_path(&self) -> Option<String> {
        Some("/panics".to_string())
    }

    fn routes() -> Routes<Self> {
        Routes::new().route("GetBoom", |_c: Arc<Self>, _req: Request| async move {
            if true {
                panic!("handler exploded");
            }
            Response::ok(())
        })
    }
}

pub fn token_validator() -> Arc<dyn SessionValidator> {
    Arc::new(BearerTokenValidator::new(|token| {
        let (sub, role) = match token {
            ADMIN_TOKEN => ("1", "admin"),
            USER_TOKEN => ("2", "user"),
            other => return Err(SessionError::InvalidToken(other.to_string())),
        };
        let mut claims = Claims::new();
        claims.insert("sub".into(), sub.into());
        claims.insert("role".into(), role.into());
        Ok(claims)
    }))
}

pub struct Fixture {
    pub server: ApiServer,
    pub store: Arc<UserStore>,
    /// Number of `UsersController` instances built so far.
    pub user_controllers: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn built(&self) -> usize {
        self.user_controllers.load(Ordering::SeqCst)
    }
}

pub fn fixture(config: ServerConfig) -> Fixture {
    let mut server = ApiServer::new(config);
    let store = Arc::new(UserStore::seeded());
    let built = Arc::new(AtomicUsize::new(0));

    server.services().register_singleton(store.clone());
    server.services().register_singleton(token_validator());

    let counter = built.clone();
    server
        .map_controller(move |scope: &Scope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(UsersController {
                store: Arc::clone(&*scope.resolve::<Arc<UserStore>>()?),
            })
        })
        .unwrap();
    server.map_controller(|_: &Scope| Ok(OrdersController)).unwrap();
    server.map_controller(|_: &Scope| Ok(AuditController)).unwrap();
    server.map_controller(|_: &Scope| Ok(PanicController)).unwrap();

    server
        .use_middleware(request_logging())
        .use_middleware(recover())
        .use_middleware(request_id());

    Fixture {
        server,
        store,
        user_controllers: built,
    }
}

pub fn bearer(req: Request, token: &str) -> Request {
    req.with_header("Authorization", format!("Bearer {token}"))
}

pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(());
        self.handle.await.expect("server task panicked")
    }
}

/// Serve `server` on an ephemeral local port.
pub async fn spawn(server: ApiServer) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.run_with_shutdown(listener, async move {
        let _ = rx.await;
    }));

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}
