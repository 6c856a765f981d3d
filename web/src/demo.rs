//! # Demo Procedures
//!
//! A small in-memory user directory exposed over REST. Used by the server
//! binary and by the CLI when no other router is available.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue};
use rpc_rest_core::{
    ContextFactory, HeaderParameter, OpenApiMeta, Procedure, RequestHead, Router, RpcError,
    Schema,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Shared user storage.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<Vec<User>>,
}

impl UserStore {
    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<User>>, RpcError> {
        self.users
            .read()
            .map_err(|_| RpcError::internal("User store is unavailable"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<User>>, RpcError> {
        self.users
            .write()
            .map_err(|_| RpcError::internal("User store is unavailable"))
    }
}

/// Request-scoped context of the demo procedures.
#[derive(Debug, Clone)]
pub struct DemoContext {
    /// Id echoed in the `x-request-id` response header.
    pub request_id: String,
    /// Bearer token of the caller, if any.
    pub user: Option<String>,
    /// Storage shared by all requests.
    pub store: Arc<UserStore>,
}

impl DemoContext {
    fn require_user(&self) -> Result<&str, RpcError> {
        self.user
            .as_deref()
            .ok_or_else(|| RpcError::unauthorized("Authorization required"))
    }
}

/// Builds a [`DemoContext`] per request around one shared store.
#[derive(Debug, Clone, Default)]
pub struct DemoContextFactory {
    store: Arc<UserStore>,
}

impl DemoContextFactory {
    /// A factory over an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextFactory<DemoContext> for DemoContextFactory {
    async fn create_context(
        &self,
        head: &RequestHead,
        response_headers: &mut HeaderMap,
    ) -> Result<DemoContext, RpcError> {
        let request_id = head
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response_headers.insert(REQUEST_ID_HEADER, value);
        }

        let user = head
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(DemoContext {
            request_id,
            user,
            store: Arc::clone(&self.store),
        })
    }
}

#[derive(Deserialize)]
struct SayHello {
    name: Option<String>,
}

#[derive(Serialize)]
struct Greeting {
    greeting: String,
}

#[derive(Deserialize)]
struct ListUsers {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct UserId {
    id: Uuid,
}

#[derive(Deserialize)]
struct CreateUser {
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct UpdateUser {
    id: Uuid,
    name: Option<String>,
    email: Option<String>,
}

fn user_schema() -> Schema {
    Schema::object([
        ("id", Schema::string().with_format("uuid")),
        ("name", Schema::string()),
        ("email", Schema::string().with_format("email")),
        ("createdAt", Schema::date()),
    ])
}

fn user_id_input() -> Schema {
    Schema::object([("id", Schema::string().with_format("uuid"))])
}

fn not_found(id: Uuid) -> RpcError {
    RpcError::not_found(format!("User {} does not exist", id))
}

fn greeting_router() -> Router<DemoContext> {
    Router::new().procedure(
        "sayHello",
        Procedure::query()
            .meta(
                OpenApiMeta::get("/say-hello")
                    .with_summary("Say hello")
                    .with_tag("greeting"),
            )
            .input(Schema::object([(
                "name",
                Schema::string().optional().describe("Who to greet"),
            )]))
            .output(Schema::object([("greeting", Schema::string())]))
            .handler(|_ctx, input: SayHello| async move {
                Ok(Greeting {
                    greeting: format!("Hello {}!", input.name.as_deref().unwrap_or("world")),
                })
            }),
    )
}

fn users_router() -> Router<DemoContext> {
    Router::new()
        .procedure(
            "list",
            Procedure::query()
                .meta(
                    OpenApiMeta::get("/users")
                        .with_summary("List users")
                        .with_tag("users"),
                )
                .input(Schema::object([(
                    "limit",
                    Schema::integer().optional().describe("Maximum number of users"),
                )]))
                .output(Schema::array(user_schema()))
                .handler(|ctx: DemoContext, input: ListUsers| async move {
                    let users = ctx.store.read()?;
                    let limit = input.limit.unwrap_or(users.len());
                    Ok(users.iter().take(limit).cloned().collect::<Vec<_>>())
                }),
        )
        .procedure(
            "get",
            Procedure::query()
                .meta(
                    OpenApiMeta::get("/users/{id}")
                        .with_summary("Get a user")
                        .with_tag("users"),
                )
                .input(user_id_input())
                .output(user_schema())
                .handler(|ctx: DemoContext, input: UserId| async move {
                    let users = ctx.store.read()?;
                    users
                        .iter()
                        .find(|u| u.id == input.id)
                        .cloned()
                        .ok_or_else(|| not_found(input.id))
                }),
        )
        .procedure(
            "create",
            Procedure::mutation()
                .meta(
                    OpenApiMeta::post("/users")
                        .with_summary("Create a user")
                        .with_tag("users")
                        .protected()
                        .with_content_types(["application/json", "application/x-www-form-urlencoded"])
                        .with_response_header(
                            HeaderParameter::new(REQUEST_ID_HEADER).with_description("Request id"),
                        ),
                )
                .input(Schema::object([
                    ("name", Schema::string()),
                    ("email", Schema::string().with_format("email")),
                ]))
                .output(user_schema())
                .handler(|ctx: DemoContext, input: CreateUser| async move {
                    ctx.require_user()?;
                    let mut users = ctx.store.write()?;
                    if users.iter().any(|u| u.email == input.email) {
                        return Err(RpcError::conflict(format!(
                            "A user with email {} already exists",
                            input.email
                        )));
                    }
                    let user = User {
                        id: Uuid::new_v4(),
                        name: input.name,
                        email: input.email,
                        created_at: Utc::now(),
                    };
                    users.push(user.clone());
                    tracing::info!(request_id = %ctx.request_id, user_id = %user.id, "Created user");
                    Ok(user)
                }),
        )
        .procedure(
            "update",
            Procedure::mutation()
                .meta(
                    OpenApiMeta::patch("/users/{id}")
                        .with_summary("Update a user")
                        .with_tag("users")
                        .protected(),
                )
                .input(Schema::object([
                    ("id", Schema::string().with_format("uuid")),
                    ("name", Schema::string().optional()),
                    ("email", Schema::string().with_format("email").optional()),
                ]))
                .output(user_schema())
                .handler(|ctx: DemoContext, input: UpdateUser| async move {
                    ctx.require_user()?;
                    let mut users = ctx.store.write()?;
                    let user = users
                        .iter_mut()
                        .find(|u| u.id == input.id)
                        .ok_or_else(|| not_found(input.id))?;
                    if let Some(name) = input.name {
                        user.name = name;
                    }
                    if let Some(email) = input.email {
                        user.email = email;
                    }
                    Ok(user.clone())
                }),
        )
        .procedure(
            "delete",
            Procedure::mutation()
                .meta(
                    OpenApiMeta::delete("/users/{id}")
                        .with_summary("Delete a user")
                        .with_tag("users")
                        .protected(),
                )
                .input(user_id_input())
                .handler(|ctx: DemoContext, input: UserId| async move {
                    ctx.require_user()?;
                    let mut users = ctx.store.write()?;
                    let before = users.len();
                    users.retain(|u| u.id != input.id);
                    if users.len() == before {
                        return Err(not_found(input.id));
                    }
                    Ok(())
                }),
        )
}

/// The full demo router: `greeting.*` and `users.*`, plus `auth.me`.
pub fn demo_router() -> Router<DemoContext> {
    Router::new()
        .merge("greeting", greeting_router())
        .merge("users", users_router())
        .procedure(
            "auth.me",
            Procedure::query()
                .meta(
                    OpenApiMeta::get("/me")
                        .with_summary("Current caller")
                        .protected()
                        .with_header(HeaderParameter::new("authorization").required()),
                )
                .output(Schema::object([("token", Schema::string())]))
                .handler(|ctx: DemoContext, (): ()| async move {
                    let token = ctx.require_user()?;
                    Ok(serde_json::json!({ "token": token }))
                }),
        )
        .procedure(
            "internal.stats",
            Procedure::query().handler(|ctx: DemoContext, (): ()| async move {
                let count = ctx.store.read()?.len();
                Ok(count)
            }),
        )
}
