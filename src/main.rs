mod analytics;
mod config;
mod domain;
mod export;
mod services;
mod time_utils;

use crate::analytics::checkins::analyze_checkin_behavior;
use crate::analytics::coverage::analyze_coverage;
use crate::analytics::engine::ShiftEngine;
use crate::config::Config;
use crate::domain::records::RecordStore;
use crate::domain::scoring::compute_scores;
use crate::services::api::BaseApiClient;
use crate::services::report::render_report;
use crate::time_utils::ReportClock;
use anyhow::Context;
use std::collections::HashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    // One frozen clock for the whole run so every anchor date agrees.
    let clock = ReportClock::start();
    let client = BaseApiClient::new(config.goal_token.clone(), config.account_token.clone())?;

    tracing::info!("Loading account directory...");
    let users = client.get_account_users().await?;
    let directory: HashMap<String, String> = users
        .into_iter()
        .map(|user| (user.id, user.name))
        .collect();

    let members = client.get_filtered_members(&config.member_group).await?;
    tracing::info!(members = members.len(), "Loaded filtered member list");

    let cycles = client.get_cycle_list().await?;
    let cycle = match &config.cycle_path {
        Some(path) => cycles
            .iter()
            .find(|c| &c.path == path)
            .cloned()
            .with_context(|| format!("cycle {path} not found"))?,
        None => cycles
            .first()
            .cloned()
            .context("no quarterly cycles available")?,
    };
    tracing::info!(cycle = %cycle.name, start = %cycle.formatted_start_time, "Analyzing cycle");

    let goals = client.get_goals(&cycle.path).await?;
    let krs = client.get_krs(&cycle.path).await?;
    let checkins = client.get_checkins(&cycle.path).await?;
    tracing::info!(
        goals = goals.len(),
        krs = krs.len(),
        checkins = checkins.len(),
        "Loaded cycle data"
    );

    let store = RecordStore::build(&goals, &krs, &checkins, &directory);
    if store.is_empty() {
        tracing::warn!("no joined records; report will be empty");
    }

    let engine = ShiftEngine::new(&store, clock);
    let weekly = engine.weekly_shifts();
    let monthly = engine.monthly_shifts();
    if let Some(top) = weekly.first() {
        tracing::info!(user = %top.user_name, shift = top.shift, "Top weekly shift");
    }
    if monthly.is_empty() && !clock.should_compute_monthly_shift() {
        tracing::info!("quarter-opening month; monthly shift skipped");
    }

    let (period_checkins, overall_checkins) = analyze_checkin_behavior(&store, &clock);
    let coverage = analyze_coverage(&members, &store);
    let scores = compute_scores(&store, &krs, &checkins, &directory, &clock);

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    export::write_csv(&config.output_dir.join("okr_shift_weekly.csv"), &weekly)?;
    if !monthly.is_empty() {
        export::write_csv(&config.output_dir.join("okr_shift_monthly.csv"), &monthly)?;
    }
    export::write_csv(
        &config.output_dir.join("checkins_period.csv"),
        &period_checkins,
    )?;
    export::write_csv(
        &config.output_dir.join("checkins_overall.csv"),
        &overall_checkins,
    )?;
    export::write_csv(&config.output_dir.join("user_scores.csv"), &scores)?;

    let html = render_report(
        &cycle.name,
        &clock,
        &weekly,
        &monthly,
        &overall_checkins,
        &coverage,
    );
    let report_path = config.output_dir.join("okr_report.html");
    std::fs::write(&report_path, html)
        .with_context(|| format!("writing {}", report_path.display()))?;

    tracing::info!(
        weekly = weekly.len(),
        monthly = monthly.len(),
        report = %report_path.display(),
        "Run complete"
    );
    Ok(())
}
