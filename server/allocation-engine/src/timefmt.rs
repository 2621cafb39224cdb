//! Decimal hours <-> hours and minutes, and the "3h 30m" text form.

use crate::error::AllocationError;
use crate::rounding::round_to;
use crate::types::HoursInput;

/// 3h 30m -> 3.5 (4 decimals).
pub fn to_decimal(hours: u32, minutes: u32) -> f64 {
  round_to(hours as f64 + minutes as f64 / 60.0, 4)
}

/// 3.5 -> (3, 30). Minutes are rounded to the nearest whole minute.
pub fn to_hours_minutes(decimal: f64) -> (u32, u32) {
  let decimal = decimal.max(0.0);
  let mut hours = decimal.floor() as u32;
  let mut minutes = ((decimal - hours as f64) * 60.0).round() as u32;
  if minutes == 60 {
    hours += 1;
    minutes = 0;
  }
  (hours, minutes)
}

/// 3.5 -> "3h 30m", 3.0 -> "3h".
pub fn format_hours(decimal: f64) -> String {
  let (h, m) = to_hours_minutes(decimal);
  if m > 0 {
    format!("{}h {}m", h, m)
  } else {
    format!("{}h", h)
  }
}

/// Parse "3h", "3h 30m" or "3h30m" (case-insensitive) into decimal hours.
pub fn parse_hours(text: &str) -> Result<f64, AllocationError> {
  let s = text.trim().to_ascii_lowercase();
  let bad_format = || {
    AllocationError::parse(format!(
      "expected \"Xh Ym\" (e.g. \"3h 30m\"), got {:?}",
      text
    ))
  };

  let (h, rest) = s.split_once('h').ok_or_else(bad_format)?;
  let hours: u32 = h.parse().map_err(|_| bad_format())?;

  let rest = rest.trim();
  let minutes = if rest.is_empty() {
    0
  } else {
    let m = rest.strip_suffix('m').ok_or_else(bad_format)?;
    let m = m.trim();
    if m.is_empty() || !m.chars().all(|c| c.is_ascii_digit()) {
      return Err(bad_format());
    }
    m.parse::<u32>().map_err(|_| bad_format())?
  };

  if minutes >= 60 {
    return Err(AllocationError::parse("minutes must be less than 60"));
  }
  Ok(to_decimal(hours, minutes))
}

/// Resolve user-entered hours to a decimal value.
pub fn resolve(input: &HoursInput) -> Result<f64, AllocationError> {
  match input {
    HoursInput::Decimal(v) => Ok(*v),
    HoursInput::Text(text) => match text.trim().parse::<f64>() {
      Ok(v) => Ok(v),
      Err(_) => parse_hours(text),
    },
  }
}
