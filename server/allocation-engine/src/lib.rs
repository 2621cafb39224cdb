//! Timesheet allocation engine: splits a fixed daily hour budget across the
//! commits made that day, deterministically and sum-exact.
//!
//! Pipeline: normalize inbound commits, allocate per budget scope, apply
//! manual overrides (redistributing the rest of the scope), then validate the
//! resulting time records before they are handed to the time-tracking sink.
//!
//! No DB, no network; pure computation + in-memory session state.

pub mod allocate;
pub mod bounds;
pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod overrides;
pub mod records;
pub mod rounding;
pub mod scope;
pub mod timefmt;
pub mod types;
pub mod weight;

#[cfg(test)]
mod fixtures;

pub use allocate::allocate;
pub use config::{AllocationPolicy, Config, Strategy};
pub use error::AllocationError;
pub use overrides::Session;
pub use types::{Allocation, Hours, Request, Response, TimeRecord, WorkUnit};
pub use weight::WeightStrategy;

use types::RedistributionNote;

/// Run one request end to end (no I/O).
///
/// Refused redistributions and scope violations are part of the response;
/// only invalid input is an error.
pub fn run(request: &Request) -> Result<Response, AllocationError> {
  let units = normalize::normalize_units(&request.units)?;

  let mut session =
    Session::new(request.config.clone()).with_repositories(request.repositories.clone());
  session.load(units)?;

  let mut redistributions = Vec::new();
  for manual in &request.overrides {
    let hours = timefmt::resolve(&manual.hours)?;
    match session.apply_manual(&manual.unit_id, hours) {
      Ok(_) => {}
      Err(e) if e.is_recoverable() => redistributions.push(RedistributionNote {
        unit_id: manual.unit_id.clone(),
        message: e.to_string(),
      }),
      Err(e) => return Err(e),
    }
  }

  let records = records::build_records(session.units(), session.allocation());
  let violations = scope::validate(&records, session.config());

  Ok(Response {
    records,
    redistributions,
    violations,
  })
}
