/// Background task implementations
use crate::{context::AppContext, db, error::KindredResult};
use chrono::{Datelike, Local, NaiveDate, Utc, Weekday};

/// Process one batch of due reminders
pub async fn process_due_reminders(ctx: &AppContext) -> KindredResult<usize> {
    ctx.reminders.process_due_reminders(Utc::now()).await
}

/// Whether `today` is the configured digest day
pub fn is_digest_day(today: NaiveDate, weekday: Weekday) -> bool {
    today.weekday() == weekday
}

/// Send weekly digests when today is the digest day.
///
/// Returns `None` on every other day.
pub async fn send_weekly_digests(ctx: &AppContext) -> KindredResult<Option<usize>> {
    let today = Local::now().date_naive();
    if !is_digest_day(today, ctx.config.digest.weekday) {
        return Ok(None);
    }

    ctx.digests.send_weekly_digests(today).await.map(Some)
}

/// Health check - verify the store is reachable
pub async fn health_check(ctx: &AppContext) -> KindredResult<()> {
    db::test_connection(&ctx.db).await
}
