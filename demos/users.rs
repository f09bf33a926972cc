//! Demo API: a users controller behind role-based policies.
//!
//! ```text
//! cargo run --example users -- [config.toml]
//! curl localhost:8080/users
//! curl localhost:8080/users/1
//! curl -X DELETE -H 'Authorization: Bearer admin' localhost:8080/users/1
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use comet::config::load_config;
use comet::http::middleware::{recover, request_id, request_logging};
use comet::observability::{init_logging, init_metrics};
use comet::security::{require_role, BearerTokenValidator, Claims, SessionError, SessionValidator};
use comet::{ApiServer, Controller, Policies, Request, Response, Routes, Scope, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[derive(Default)]
struct Directory {
    users: RwLock<BTreeMap<u64, User>>,
}

struct UsersController {
    directory: Arc<Directory>,
}

impl UsersController {
    async fn list_users(self: Arc<Self>, _req: Request) -> Response {
        let users = self.directory.users.read().expect("directory lock poisoned");
        Response::ok(users.values().cloned().collect::<Vec<_>>())
    }

    async fn get_user_by_id(self: Arc<Self>, req: Request) -> Response {
        let Some(id) = req.param("id").and_then(|id| id.parse::<u64>().ok()) else {
            return Response::bad_request("id must be a number");
        };
        match self.directory.users.read().expect("directory lock poisoned").get(&id) {
            Some(user) => Response::ok(user),
            None => Response::not_found(),
        }
    }

    async fn post_user(self: Arc<Self>, req: Request) -> Response {
        let new: NewUser = match req.json() {
            Ok(new) => new,
            Err(e) => return Response::bad_request(e.to_string()),
        };
        let mut users = self.directory.users.write().expect("directory lock poisoned");
        let id = users.keys().next_back().copied().unwrap_or(0) + 1;
        let user = User { id, name: new.name };
        users.insert(id, user.clone());
        Response::ok(user)
    }

    async fn delete_user_by_id(self: Arc<Self>, req: Request) -> Response {
        let id = req.param("id").and_then(|id| id.parse::<u64>().ok());
        let removed = id.and_then(|id| self.directory.users.write().expect("directory lock poisoned").remove(&id));
        match removed {
            Some(user) => Response::ok(user),
            None => Response::not_found(),
        }
    }
}

impl Controller for UsersController {
    fn policies(&self) -> Policies {
        Policies::new()
            .add("PostUser", require_role("admin"))
            .add("DeleteUserByID", require_role("admin"))
    }

    fn routes() -> Routes<Self> {
        Routes::new()
            .route("ListUsers", Self::list_users)
            .route("GetUserByID", Self::get_user_by_id)
            .route("PostUser", Self::post_user)
            .route("DeleteUserByID", Self::delete_user_by_id)
    }
}

/// Accepts the bearer tokens `admin` and `reader`; real deployments verify a JWT here.
fn demo_sessions() -> Arc<dyn SessionValidator> {
    Arc::new(BearerTokenValidator::new(|token| {
        let role = match token {
            "admin" => "admin",
            "reader" => "reader",
            other => return Err(SessionError::InvalidToken(other.to_string())),
        };
        let mut claims = Claims::new();
        claims.insert("sub".into(), token.into());
        claims.insert("role".into(), role.into());
        Ok(claims)
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("comet users demo starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let directory = Arc::new(Directory::default());
    directory.users.write().expect("directory lock poisoned").insert(
        1,
        User {
            id: 1,
            name: "ada".to_string(),
        },
    );

    let mut server = ApiServer::new(config);
    server.services().register_singleton(directory);
    server.services().register_singleton(demo_sessions());

    server.map_controller(|scope: &Scope| {
        Ok(UsersController {
            directory: Arc::clone(&*scope.resolve::<Arc<Directory>>()?),
        })
    })?;

    server
        .use_middleware(request_logging())
        .use_middleware(recover())
        .use_middleware(request_id());

    server.run_configured().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
