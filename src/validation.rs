//! Argument validation for values that end up on the radio: owner names,
//! channel names, coordinates, node ids and message text.
//!
//! Limits mirror the firmware's fixed-size protobuf string fields (which reserve
//! one byte for the terminating NUL), so anything accepted here fits on the device.

/// Byte limit of `User.long_name`.
pub const MAX_LONG_NAME_BYTES: usize = 39;
/// Byte limit of `User.short_name`.
pub const MAX_SHORT_NAME_BYTES: usize = 4;
/// Byte limit of `ChannelSettings.name`.
pub const MAX_CHANNEL_NAME_BYTES: usize = 11;
/// Largest `Data.payload` a text message may carry.
pub const MAX_TEXT_BYTES: usize = 233;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long (maximum {max} bytes)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },

    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),

    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),

    #[error("'{0}' is not a node id (expected !xxxxxxxx)")]
    NodeId(String),
}

fn check_text(value: &str, field: &'static str, max: usize) -> Result<String, InputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty { field });
    }
    if trimmed.len() > max {
        return Err(InputError::TooLong { field, max });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(InputError::ControlCharacters { field });
    }
    Ok(trimmed.to_string())
}

pub fn validate_long_name(name: &str) -> Result<String, InputError> {
    check_text(name, "long name", MAX_LONG_NAME_BYTES)
}

pub fn validate_short_name(name: &str) -> Result<String, InputError> {
    check_text(name, "short name", MAX_SHORT_NAME_BYTES)
}

/// Short name derived from a long name: its first four characters, cut back
/// further if needed so the result fits the short-name byte limit.
pub fn default_short_name(long_name: &str) -> String {
    let mut out = String::new();
    for ch in long_name.trim().chars().take(4) {
        if out.len() + ch.len_utf8() > MAX_SHORT_NAME_BYTES {
            break;
        }
        out.push(ch);
    }
    out
}

pub fn validate_channel_name(name: &str) -> Result<String, InputError> {
    check_text(name, "channel name", MAX_CHANNEL_NAME_BYTES)
}

/// Message text is sent as typed; only emptiness and size are checked.
pub fn validate_message_text(text: &str) -> Result<(), InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty { field: "message" });
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(InputError::TooLong {
            field: "message",
            max: MAX_TEXT_BYTES,
        });
    }
    Ok(())
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), InputError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(InputError::Latitude(lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(InputError::Longitude(lon));
    }
    Ok(())
}

/// Parse a `!xxxxxxxx` node id into its node number.
pub fn parse_node_id(id: &str) -> Result<u32, InputError> {
    let hex = id
        .strip_prefix('!')
        .ok_or_else(|| InputError::NodeId(id.to_string()))?;
    if hex.is_empty() || hex.len() > 8 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InputError::NodeId(id.to_string()));
    }
    u32::from_str_radix(hex, 16).map_err(|_| InputError::NodeId(id.to_string()))
}
