use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::{context::AppContext, metrics};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::reminder_job(Arc::clone(&self)));
        tokio::spawn(Self::digest_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Deliver due reminders (default: every hour)
    async fn reminder_job(scheduler: Arc<Self>) {
        let every = scheduler.context.config.reminders.interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(every));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::process_due_reminders(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("reminders", "success", started.elapsed().as_secs_f64());
                    if count > 0 {
                        info!("Processed {} due reminders", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job("reminders", "failure", started.elapsed().as_secs_f64());
                    error!("Failed to process due reminders: {}", e);
                }
            }
        }
    }

    /// Weekly digest (checked daily, sent on the configured weekday)
    async fn digest_job(scheduler: Arc<Self>) {
        let every = scheduler.context.config.digest.interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(every));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::send_weekly_digests(&scheduler.context).await {
                Ok(Some(count)) => {
                    metrics::record_background_job("digest", "success", started.elapsed().as_secs_f64());
                    info!("Delivered {} weekly digests", count);
                }
                Ok(None) => {}
                Err(e) => {
                    metrics::record_background_job("digest", "failure", started.elapsed().as_secs_f64());
                    error!("Weekly digest run failed: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    metrics::record_background_job("health_check", "success", started.elapsed().as_secs_f64());
                }
                Err(e) => {
                    metrics::record_background_job("health_check", "failure", started.elapsed().as_secs_f64());
                    error!("Health check failed: {}", e);
                }
            }
        }
    }
}
