//! `getDateTime`: current time in an IANA timezone.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Default, Deserialize)]
pub struct DateTimeArgs {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DateTimeReport {
    pub iso: String,
    pub local: String,
    pub timezone: String,
}

const ZH_WEEKDAYS: [&str; 7] = ["星期一", "星期二", "星期三", "星期四", "星期五", "星期六", "星期日"];

/// Blank arguments fall back to the configured defaults.
pub fn get_date_time(
    args: DateTimeArgs,
    now: DateTime<Utc>,
    default_timezone: &str,
    default_locale: &str,
) -> Result<DateTimeReport, ToolError> {
    let timezone = non_blank(args.timezone).unwrap_or_else(|| default_timezone.to_string());
    let locale = non_blank(args.locale).unwrap_or_else(|| default_locale.to_string());

    let tz: Tz = timezone
        .parse()
        .map_err(|_| ToolError::invalid(format!("unknown timezone \"{timezone}\"")))?;
    let local = now.with_timezone(&tz);

    let formatted = if locale.to_ascii_lowercase().starts_with("zh") {
        let weekday = ZH_WEEKDAYS[local.weekday().num_days_from_monday() as usize];
        format!(
            "{} {} {}",
            local.format("%Y年%-m月%-d日"),
            weekday,
            local.format("%H:%M:%S %Z")
        )
    } else {
        local.format("%A, %B %-d, %Y at %H:%M:%S %Z").to_string()
    };

    Ok(DateTimeReport {
        iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        local: formatted,
        timezone,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
