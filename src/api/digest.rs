/// On-demand digest preview
use crate::{auth::UserContext, context::AppContext, digest::Digest, error::KindredResult};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/digest", get(preview_digest))
}

#[derive(Debug, Deserialize)]
struct DigestQuery {
    days: Option<i64>,
}

async fn preview_digest(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Query(query): Query<DigestQuery>,
) -> KindredResult<Json<Digest>> {
    let days = query.days.unwrap_or(ctx.config.digest.window_days);
    let digest = ctx
        .digests
        .generate_digest(auth.id(), Local::now().date_naive(), days)
        .await?;

    Ok(Json(digest))
}
