/// Event, guest and invite endpoints
use crate::{
    auth::UserContext,
    context::AppContext,
    db::models::{Event, EventGuest},
    error::KindredResult,
    events::{EventUpdate, GuestInput, InviteView, NewEvent, RsvpInput},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/api/events/:id/invite-token", post(regenerate_invite_token))
        .route("/api/events/:id/guests", get(list_guests).post(add_guest))
        // Public: the token is the credential
        .route("/api/invites/:token", get(get_invite))
        .route("/api/invites/:token/rsvp", post(respond_to_invite))
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    events: Vec<Event>,
}

async fn list_events(
    State(ctx): State<AppContext>,
    auth: UserContext,
) -> KindredResult<Json<EventsResponse>> {
    let events = ctx.events.list_events(auth.id()).await?;
    Ok(Json(EventsResponse { events }))
}

async fn create_event(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<NewEvent>,
) -> KindredResult<(StatusCode, Json<Event>)> {
    let event = ctx.events.create_event(auth.id(), req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<Json<Event>> {
    Ok(Json(ctx.events.get_event(auth.id(), &id).await?))
}

async fn update_event(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<EventUpdate>,
) -> KindredResult<Json<Event>> {
    Ok(Json(ctx.events.update_event(auth.id(), &id, req).await?))
}

async fn delete_event(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<StatusCode> {
    ctx.events.delete_event(auth.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn regenerate_invite_token(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<Json<Event>> {
    Ok(Json(ctx.events.regenerate_invite_token(auth.id(), &id).await?))
}

#[derive(Debug, Serialize)]
struct GuestsResponse {
    guests: Vec<EventGuest>,
}

async fn list_guests(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<Json<GuestsResponse>> {
    let guests = ctx.events.list_guests(auth.id(), &id).await?;
    Ok(Json(GuestsResponse { guests }))
}

async fn add_guest(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<GuestInput>,
) -> KindredResult<(StatusCode, Json<EventGuest>)> {
    let guest = ctx.events.add_guest(auth.id(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(guest)))
}

async fn get_invite(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
) -> KindredResult<Json<InviteView>> {
    Ok(Json(ctx.events.get_invite(&token, Utc::now()).await?))
}

async fn respond_to_invite(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
    Json(req): Json<RsvpInput>,
) -> KindredResult<Json<EventGuest>> {
    Ok(Json(ctx.events.respond_to_invite(&token, req, Utc::now()).await?))
}
