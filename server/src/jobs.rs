// crm_server/src/jobs.rs

//! Operational jobs. Each run appends its lines to the configured log file;
//! scheduling is left to the caller (cron, systemd timers).

use chrono::Local;
use crm_core::report;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

use crate::errors::Result;
use crate::state::AppState;

pub async fn append_lines(path: &Path, lines: &[String]) -> Result<()> {
  let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
  let mut buf = String::new();
  for line in lines {
    buf.push_str(line);
    buf.push('\n');
  }
  file.write_all(buf.as_bytes()).await?;
  file.flush().await?;
  Ok(())
}

#[instrument(name = "job::heartbeat", skip_all)]
pub async fn heartbeat(state: &AppState) -> Result<()> {
  let lines = report::heartbeat_lines(&state.service, Local::now()).await;
  append_lines(&state.config.heartbeat_log_path, &lines).await?;
  info!(path = %state.config.heartbeat_log_path.display(), "Heartbeat logged.");
  Ok(())
}

/// Writes either the report line or an error line; the error is still returned.
#[instrument(name = "job::report", skip_all)]
pub async fn crm_report(state: &AppState) -> Result<report::CrmReport> {
  let (line, outcome) = report::report_line(&state.service, Local::now()).await;
  append_lines(&state.config.report_log_path, &[line]).await?;
  outcome.map_err(|e| {
    error!(error = %e, "Error generating CRM report.");
    e.into()
  })
}

/// Returns the number of orders reminded about.
#[instrument(name = "job::reminders", skip_all)]
pub async fn order_reminders(state: &AppState) -> Result<usize> {
  let now = Local::now();
  let path = &state.config.reminder_log_path;
  match report::order_reminder_lines(&state.service, now).await {
    Ok(lines) => {
      append_lines(path, &lines).await?;
      // The final line is the summary, not a reminder.
      let reminded = if lines.len() > 1 { lines.len() - 1 } else { 0 };
      info!(reminded, "Order reminders processed!");
      Ok(reminded)
    }
    Err(e) => {
      append_lines(path, &[report::reminder_error_line(now, &e)]).await?;
      error!(error = %e, "Error processing order reminders.");
      Err(e.into())
    }
  }
}
