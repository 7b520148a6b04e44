//! `vantalu track` and `vantalu orders`.

use anyhow::Context;
use clap::Args;
use serde_json::json;
use vantalu_core::history::{OrderSummary, order_history};
use vantalu_core::model::Order;
use vantalu_core::tracking::{
    FollowOutcome, Notification, OrderTracker, STAGES, progress_percent, stage_index,
};

use crate::context::App;
use crate::output::{Palette, print_json, progress_bar, rupees};

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Order id printed at checkout
    pub order_id: String,

    /// Keep listening for status changes until the order is delivered or
    /// cancelled (Ctrl-C to stop)
    #[arg(long, short = 'f')]
    pub follow: bool,
}

pub async fn run_track(app: &App, args: TrackArgs) -> anyhow::Result<()> {
    let session = app.current_session().await?;
    let backend = app.backend(session.as_ref())?;
    let mut tracker = OrderTracker::open(backend, &args.order_id).await?;

    if app.json {
        print_json(tracker.order())?;
    } else {
        print!("{}", render_tracking(&app.palette, tracker.order()));
    }
    if !args.follow {
        return Ok(());
    }

    let palette = app.palette;
    let json = app.json;
    let outcome = tokio::select! {
        outcome = tracker.follow(|order, note| report_update(&palette, json, order, note)) => {
            outcome.context("order tracking failed")?
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted while following order");
            return Ok(());
        }
    };

    match outcome {
        FollowOutcome::Terminal(status) => {
            tracing::debug!(%status, "order reached a terminal state");
        }
        FollowOutcome::FeedClosed => {
            eprintln!("Update feed closed; run the command again to resume tracking.");
        }
    }
    Ok(())
}

fn report_update(palette: &Palette, json: bool, order: &Order, note: Option<&Notification>) {
    let Some(note) = note else {
        return;
    };
    if json {
        match serde_json::to_string(order) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(%err, "failed to encode order update"),
        }
        return;
    }
    println!("{} {}", palette.status(note.status), palette.heading(&note.title));
    println!("  {}", note.body);
}

/// Status header, stage checklist, progress bar and bill.
pub fn render_tracking(palette: &Palette, order: &Order) -> String {
    let mut out = format!(
        "Order #{} {}\n",
        palette.heading(order.short_id()),
        palette.status(order.status)
    );
    match stage_index(order.status) {
        Some(current) => {
            for (index, stage) in STAGES.iter().enumerate() {
                let mark = if index <= current { "●" } else { "○" };
                let label = if index == current {
                    palette.heading(stage)
                } else if index < current {
                    (*stage).to_string()
                } else {
                    palette.dim(stage)
                };
                out.push_str(&format!("  {mark} {label}\n"));
            }
            let percent = progress_percent(order.status).unwrap_or(0);
            out.push_str(&format!("  {}\n", progress_bar(percent)));
        }
        None => out.push_str(&format!("  {}\n", palette.failure("This order was cancelled."))),
    }
    for line in &order.items {
        out.push_str(&format!(
            "  {} x{}  {}\n",
            line.name,
            line.quantity,
            rupees(line.line_total())
        ));
    }
    out.push_str(&format!("  Total {}\n", rupees(order.total_amount)));
    if order.status.is_pending() {
        if let Some(eta) = order.estimated_delivery_time {
            out.push_str(&format!("  Estimated delivery {}\n", eta.format("%H:%M UTC")));
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

pub async fn run_orders(app: &App) -> anyhow::Result<()> {
    let session = app.require_session().await?;
    let backend = app.backend(Some(&session))?;
    let summaries = order_history(backend.as_ref(), session.user_id()).await?;
    if app.json {
        let rows: Vec<_> = summaries.iter().map(summary_json).collect();
        return print_json(&rows);
    }
    if summaries.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }
    for summary in &summaries {
        println!("{}", summary_line(&app.palette, summary));
    }
    Ok(())
}

fn summary_json(summary: &OrderSummary) -> serde_json::Value {
    json!({
        "id": summary.id,
        "created_at": summary.created_at,
        "status": summary.status,
        "item_count": summary.item_count,
        "total_amount": summary.total_amount,
    })
}

pub fn summary_line(palette: &Palette, summary: &OrderSummary) -> String {
    format!(
        "#{}  {}  {} items  {:>6}  {}",
        summary.short_id,
        summary.created_at.format("%Y-%m-%d %H:%M"),
        summary.item_count,
        rupees(summary.total_amount),
        palette.status(summary.status),
    )
}
