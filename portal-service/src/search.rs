use water_client::domain::Meter;

use crate::error::PortalError;

/// Parse a numeric ID typed by a user.
pub fn parse_id(kind: &str, input: &str) -> Result<i64, PortalError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PortalError::invalid(format!("a {kind} ID is required")));
    }

    trimmed
        .parse::<i64>()
        .map_err(|_| PortalError::invalid(format!("{kind} ID '{trimmed}' must be a whole number")))
}

pub fn parse_meter_id(input: &str) -> Result<i64, PortalError> {
    parse_id("meter", input)
}

/// Case-insensitive substring match over ID, client name, address and sector.
///
/// A blank term matches every meter.
pub fn filter_meters<'a>(meters: &'a [Meter], term: &str) -> Vec<&'a Meter> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return meters.iter().collect();
    }

    let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&term));

    meters
        .iter()
        .filter(|m| {
            m.meter_id.to_string().contains(&term)
                || hit(Some(m.client_name.as_str()))
                || hit(m.address.as_deref())
                || hit(m.sector.as_deref())
        })
        .collect()
}
