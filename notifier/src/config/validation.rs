//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

/// `host[:port]` with an optional http(s) scheme and trailing path.
static RE_SERVER_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?[A-Za-z0-9]([A-Za-z0-9.\-]*[A-Za-z0-9])?(:\d{1,5})?(/\S*)?$")
        .expect("server address pattern is valid")
});
/// Credentials end up in URL paths and query strings.
static RE_CREDENTIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/\s]*$").expect("credential pattern is valid"));

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_ADDRESS" => {
            let value = value.trim();
            if !value.is_empty() && !RE_SERVER_ADDRESS.is_match(value) {
                return Err("expected host[:port] or http(s)://host[:port]".into());
            }
        }
        "BOARD_ID" | "SECRET_KEY" => {
            if !RE_CREDENTIAL.is_match(value) {
                return Err("must not contain '/' or whitespace".into());
            }
        }
        "WINDOW_LEVEL" => {
            if !["normal", "always_on_top", "desktop", "0", "1", "2"].contains(&value) {
                return Err("must be normal, always_on_top, or desktop".into());
            }
        }
        "LAYOUT_RESET" => {
            if value != "when_empty" && value != "every_close" {
                return Err("must be 'when_empty' or 'every_close'".into());
            }
        }
        "DELETE_NOTICE" => {
            if value != "silent" && value != "notify" {
                return Err("must be 'silent' or 'notify'".into());
            }
        }
        "DISPLAY_TIMEOUT_SECS" => validate_int_range(value, 0, 3600)?,
        "OPACITY" => validate_int_range(value, 10, 100)?,
        "FONT_SIZE" => validate_int_range(value, 6, 48)?,
        "WINDOW_WIDTH" => validate_int_range(value, 100, 2000)?,
        "WINDOW_HEIGHT" => validate_int_range(value, 50, 2000)?,
        "WINDOW_SPACING" => validate_int_range(value, 0, 200)?,
        "SCREEN_WIDTH" | "SCREEN_HEIGHT" => validate_int_range(value, 200, 16384)?,
        "TOP_MARGIN" => validate_int_range(value, 0, 2000)?,
        "POLL_INTERVAL_SECS" => validate_int_range(value, 5, 3600)?,
        "HEARTBEAT_INTERVAL_SECS" => validate_int_range(value, 5, 3600)?,
        "PUSH_HEARTBEAT_INTERVAL_SECS" => validate_int_range(value, 1, 600)?,
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(
        key,
        "NOTIFY_NEW" | "NOTIFY_TASK" | "NOTIFY_SOUND" | "REFRESH_ON_PUSH"
    )
}
