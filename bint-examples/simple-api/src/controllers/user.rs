use std::time::Duration;

use bint_core::prelude::*;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};

use crate::models::user::{self, Entity as User, UserResponse};

const CACHE_TTL: Duration = Duration::from_secs(60);

// ── Request types ──

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

// ── Controller ──

/// `/user` routes:
///
/// | operation    | route                     |
/// |--------------|---------------------------|
/// | `Get`        | `GET /user/:param1`       |
/// | `GetList`    | `GET /user/list`          |
/// | `Post`       | `POST /user`              |
/// | `Put`        | `PUT /user/:param1`       |
/// | `Delete`     | `DELETE /user/:param1`    |
pub struct UserController;

impl Controller for UserController {
    fn setup(&self) -> RouteGroup {
        RouteGroup::new("user").layer(middleware(|ctx: Context, req: Request, next: Next| async move {
            tracing::debug!(parent: &ctx.log, "user api");
            Ok(next.run(req).await)
        }))
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::new("Get", get),
            Operation::new("GetList", list),
            Operation::new("Post", create),
            Operation::new("Put", update),
            Operation::new("Delete", delete),
        ]
    }
}

fn cache_key(id: i64) -> String {
    format!("user:{id}")
}

// ── Handlers ──

async fn get(ctx: Context, id: i64) -> Result<Reply, BintError> {
    if let Some(cached) = ctx.cache.get_json::<UserResponse>(&cache_key(id)).await? {
        return Ok(Reply::data(cached));
    }

    match User::find_by_id(id).one(&ctx.db).await? {
        Some(found) => {
            let response = UserResponse::from(found);
            ctx.cache.set_json(&cache_key(id), &response, Some(CACHE_TTL)).await?;
            Ok(Reply::data(response))
        }
        None => Ok(Reply::fail(404, "user not found")),
    }
}

async fn list(ctx: Context) -> Result<Vec<UserResponse>, BintError> {
    let users = User::find()
        .order_by_asc(user::Column::Id)
        .all(&ctx.db)
        .await?;
    Ok(users.into_iter().map(UserResponse::from).collect())
}

async fn create(ctx: Context, Body(new): Body<NewUser>) -> Result<Json<UserResponse>, BintError> {
    if new.name.trim().is_empty() || !new.email.contains('@') {
        return Err(BintError::handler("name and a valid email are required"));
    }

    let created = user::ActiveModel {
        name: Set(new.name),
        email: Set(new.email),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    tracing::info!(parent: &ctx.log, id = created.id, "user created");
    Ok(Json(created.into()))
}

async fn update(ctx: Context, id: i64, Body(changes): Body<UpdateUser>) -> Result<Reply, BintError> {
    let Some(found) = User::find_by_id(id).one(&ctx.db).await? else {
        return Ok(Reply::fail(404, "user not found"));
    };

    let mut active: user::ActiveModel = found.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    let updated = active.update(&ctx.db).await?;
    ctx.cache.del(&cache_key(id)).await?;

    Ok(Reply::data(UserResponse::from(updated)))
}

async fn delete(ctx: Context, id: i64) -> Result<Reply, BintError> {
    let result = User::delete_by_id(id).exec(&ctx.db).await?;
    ctx.cache.del(&cache_key(id)).await?;

    if result.rows_affected == 0 {
        Ok(Reply::fail(404, "user not found"))
    } else {
        Ok(Reply::empty())
    }
}
