// crm_server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use clap::{Parser, Subcommand};
use crm_server::config::AppConfig;
use crm_server::state::AppState;
use crm_server::web::configure_app_routes;
use crm_server::{jobs, seed};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

#[derive(Debug, Parser)]
#[command(name = "crm_server", about = "Customer, product and order backend")]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
  /// Run the HTTP API (default).
  Serve,
  /// Append a liveness line to the heartbeat log.
  Heartbeat,
  /// Append customer/order/revenue counts to the report log.
  Report,
  /// Log a reminder for every order placed in the last seven days.
  Reminders,
  /// Insert the demo customers and products.
  Seed,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return ExitCode::FAILURE;
    }
  };

  let command = cli.command.unwrap_or(Command::Serve);
  let outcome = actix_web::rt::System::new().block_on(run(command, app_config));
  match outcome {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %e, ?command, "Command failed.");
      ExitCode::FAILURE
    }
  }
}

async fn run(command: Command, app_config: AppConfig) -> anyhow::Result<()> {
  let seed_on_start = app_config.seed_db;
  let app_state = AppState::build(app_config).await?;

  match command {
    Command::Serve => {
      if seed_on_start {
        seed::seed(&app_state.service).await?;
      }
      serve(app_state).await?;
    }
    Command::Heartbeat => jobs::heartbeat(&app_state).await?,
    Command::Report => {
      let report = jobs::crm_report(&app_state).await?;
      println!("CRM report generated: {}", report.log_line());
    }
    Command::Reminders => {
      jobs::order_reminders(&app_state).await?;
      println!("Order reminders processed!");
    }
    Command::Seed => {
      seed::seed(&app_state.service).await?;
      println!("Database seeded successfully!");
    }
  }
  Ok(())
}

async fn serve(app_state: AppState) -> std::io::Result<()> {
  let server_address = app_state.config.bind_address();
  tracing::info!(backend = app_state.service.store().backend(), "Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
