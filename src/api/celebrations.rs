/// Celebration endpoints
use crate::{
    auth::UserContext,
    celebrations::{CelebrationUpdate, NewCelebration, UpcomingCelebration},
    context::AppContext,
    db::models::Celebration,
    error::KindredResult,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default lookahead for `GET /api/upcoming`
const DEFAULT_UPCOMING_DAYS: i64 = 30;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/people/:id/celebrations",
            get(list_celebrations).post(create_celebration),
        )
        .route(
            "/api/celebrations/:id",
            patch(update_celebration).delete(delete_celebration),
        )
        .route("/api/upcoming", get(upcoming))
}

#[derive(Debug, Serialize)]
struct CelebrationsResponse {
    celebrations: Vec<Celebration>,
}

async fn list_celebrations(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(person_id): Path<String>,
) -> KindredResult<Json<CelebrationsResponse>> {
    let celebrations = ctx.celebrations.list_for_person(auth.id(), &person_id).await?;
    Ok(Json(CelebrationsResponse { celebrations }))
}

async fn create_celebration(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(person_id): Path<String>,
    Json(req): Json<NewCelebration>,
) -> KindredResult<(StatusCode, Json<Celebration>)> {
    let celebration = ctx
        .celebrations
        .create_celebration(auth.id(), &person_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(celebration)))
}

async fn update_celebration(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<CelebrationUpdate>,
) -> KindredResult<Json<Celebration>> {
    Ok(Json(ctx.celebrations.update_celebration(auth.id(), &id, req).await?))
}

async fn delete_celebration(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<StatusCode> {
    ctx.celebrations.delete_celebration(auth.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UpcomingQuery {
    from: Option<NaiveDate>,
    days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct UpcomingResponse {
    upcoming: Vec<UpcomingCelebration>,
}

async fn upcoming(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Query(query): Query<UpcomingQuery>,
) -> KindredResult<Json<UpcomingResponse>> {
    let from = query.from.unwrap_or_else(|| Local::now().date_naive());
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);

    let upcoming = ctx.celebrations.upcoming(auth.id(), from, days).await?;
    Ok(Json(UpcomingResponse { upcoming }))
}
