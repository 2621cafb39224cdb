//! Binary entrypoint: read one JSON request from stdin, write one JSON object to stdout.
//!
//! The output is either a Response or an ErrorOutput (when the request is
//! invalid). Logs go to stderr; set RUST_LOG to change verbosity.

use allocation_engine::types::ErrorOutput;
use allocation_engine::{run, AllocationError, Request};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
  init_tracing();
  if let Err(e) = run_binary() {
    let _ = writeln!(io::stderr(), "allocation-engine error: {}", e);
    std::process::exit(1);
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("allocation_engine=warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_ansi(false)
    .init();
}

fn run_binary() -> Result<(), Box<dyn std::error::Error>> {
  let mut raw = String::new();
  io::stdin().lock().read_to_string(&mut raw)?;

  let json = match serde_json::from_str::<Request>(&raw) {
    Ok(request) => match run(&request) {
      Ok(response) => serde_json::to_vec(&response)?,
      Err(e) => serde_json::to_vec(&error_output(&e))?,
    },
    Err(e) => serde_json::to_vec(&ErrorOutput::new(format!("json parse: {}", e)))?,
  };

  io::stdout().write_all(&json)?;
  Ok(())
}

fn error_output(e: &AllocationError) -> ErrorOutput {
  match e {
    AllocationError::Validation { field, reason } => {
      ErrorOutput::new(reason.clone()).with_field(field.clone())
    }
    AllocationError::InvalidManualHours { id, .. } | AllocationError::UnknownUnit { id } => {
      ErrorOutput::new(e.to_string()).with_field(format!("overrides.{}", id))
    }
    _ => ErrorOutput::new(e.to_string()),
  }
}
