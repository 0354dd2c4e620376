// crm_core/src/report.rs

//! Text produced by the operational jobs: heartbeat, CRM report and order
//! reminders. Functions here only build lines; writing them somewhere is the
//! caller's business.

use chrono::{DateTime, Duration, Local, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CrmError, CrmResult};
use crate::model::{EntityKind, Record};
use crate::query::QuerySpec;
use crate::service::CrmService;

/// How far back the reminder job looks.
pub const REMINDER_WINDOW_DAYS: i64 = 7;

const REPORT_STAMP: &str = "%Y-%m-%d %H:%M:%S";

pub async fn heartbeat_lines(service: &CrmService, now: DateTime<Local>) -> Vec<String> {
  let alive = format!("{} CRM is alive", now.format("%d/%m/%Y-%H:%M:%S"));
  let store = service.store();
  let status = match store.ping().await {
    Ok(()) => format!("Store responsive (backend: {}).", store.backend()),
    Err(e) => {
      warn!(error = %e, "Heartbeat ping failed.");
      format!("Store not responsive: {}", e)
    }
  };
  vec![alive, status]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrmReport {
  pub generated_at: DateTime<Local>,
  pub customers: u64,
  pub orders: u64,
  pub revenue: Decimal,
}

impl CrmReport {
  pub async fn generate(service: &CrmService, now: DateTime<Local>) -> CrmResult<Self> {
    let summary = service.summary().await?;
    Ok(Self {
      generated_at: now,
      customers: summary.customers,
      orders: summary.orders,
      revenue: summary.revenue,
    })
  }

  pub fn log_line(&self) -> String {
    format!(
      "{} - Report: {} customers, {} orders, {:.2} revenue.",
      self.generated_at.format(REPORT_STAMP),
      self.customers,
      self.orders,
      self.revenue
    )
  }
}

/// The report line, or an error line when the store could not be read.
pub async fn report_line(service: &CrmService, now: DateTime<Local>) -> (String, CrmResult<CrmReport>) {
  match CrmReport::generate(service, now).await {
    Ok(report) => {
      let line = report.log_line();
      info!(customers = report.customers, orders = report.orders, "CRM report generated.");
      (line, Ok(report))
    }
    Err(e) => (
      format!("[{}] Error generating CRM report: {}", now.format(REPORT_STAMP), e),
      Err(e),
    ),
  }
}

/// One reminder line per order placed in the last seven days, followed by a
/// count line.
pub async fn order_reminder_lines(service: &CrmService, now: DateTime<Local>) -> CrmResult<Vec<String>> {
  let stamp = now.format(REPORT_STAMP).to_string();
  let since = now.with_timezone(&Utc) - Duration::days(REMINDER_WINDOW_DAYS);
  let page_size = service.resolver().config().max_page_size;

  let mut lines = Vec::new();
  let mut after: Option<String> = None;
  loop {
    let mut spec = QuerySpec::new()
      .filter("order_date__gte", since.to_rfc3339())
      .order_by("order_date")
      .first(page_size);
    if let Some(cursor) = after.take() {
      spec = spec.after(cursor);
    }
    let page = service.query(EntityKind::Order, &spec).await?;

    for node in page.nodes() {
      let Record::Order(order) = node else {
        return Err(CrmError::invalid_query("order query returned a non-order record"));
      };
      let customer = service.get_customer(order.customer_id).await?;
      lines.push(format!(
        "[{}] Reminder for Order ID: {}, Customer Email: {}",
        stamp, order.id, customer.email
      ));
    }

    if !page.page_info.has_next_page {
      break;
    }
    after = page.page_info.end_cursor;
  }

  if lines.is_empty() {
    lines.push(format!("[{}] No recent orders found to send reminders for.", stamp));
  } else {
    let count = lines.len();
    lines.push(format!("[{}] Processed {} order reminders.", stamp, count));
  }
  Ok(lines)
}

pub fn reminder_error_line(now: DateTime<Local>, error: &CrmError) -> String {
  format!("[{}] Error sending order reminders: {}", now.format(REPORT_STAMP), error)
}
