/// User provisioning and notification preferences
use crate::{auth::UserContext, context::AppContext, db::models::User, error::KindredResult};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/me/notifications", put(update_notifications))
        .route(
            "/api/me/push-token",
            put(register_push_token).delete(clear_push_token),
        )
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    email: String,
    name: String,
}

async fn create_user(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateUserRequest>,
) -> KindredResult<(StatusCode, Json<User>)> {
    let user = ctx.users.create_user(&req.email, &req.name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
struct NotificationSettingsRequest {
    notifications_enabled: Option<bool>,
    digest_enabled: Option<bool>,
}

async fn update_notifications(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<NotificationSettingsRequest>,
) -> KindredResult<Json<User>> {
    let user = ctx
        .users
        .update_notification_settings(
            auth.id(),
            req.notifications_enabled.unwrap_or(auth.user.notifications_enabled),
            req.digest_enabled.unwrap_or(auth.user.digest_enabled),
        )
        .await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct PushTokenRequest {
    token: String,
}

async fn register_push_token(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<PushTokenRequest>,
) -> KindredResult<StatusCode> {
    ctx.users.register_push_token(auth.id(), &req.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_push_token(
    State(ctx): State<AppContext>,
    auth: UserContext,
) -> KindredResult<StatusCode> {
    ctx.users.clear_push_token(auth.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
