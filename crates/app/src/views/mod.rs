//! Server-rendered HTML pages.
//!
//! Markup lives in askama templates under `crates/app/templates/`, which escape
//! every interpolated value. The structs here carry values already formatted
//! for display.

pub mod detail;
pub mod listing;

use askama::Template;
use chrono::{DateTime, Utc};
use tracing::error;

/// Image shown on cards whose media reference was not resolved.
pub const PLACEHOLDER_IMAGE: &str = "https://picsum.photos/id/164/200/300";

#[derive(Template)]
#[template(path = "notice.html")]
struct NoticePage<'a> {
    title: &'a str,
    heading: &'a str,
    message: &'a str,
}

impl NoticePage<'_> {
    fn render_or_plain(&self) -> String {
        self.render().unwrap_or_else(|err| {
            error!(stage = "views", error = %err, "notice page failed to render");
            self.heading.to_string()
        })
    }
}

/// Generic page returned when a request fails upstream.
pub fn error_page() -> String {
    NoticePage {
        title: "Real Estate Listings",
        heading: "Something went wrong",
        message: "We could not load this page. Please try again later.",
    }
    .render_or_plain()
}

/// Page for unknown routes and slugs without a published record.
pub fn not_found_page() -> String {
    NoticePage {
        title: "Property Not Found | Real Estate Listings",
        heading: "Property Not Found",
        message: "The property you're looking for doesn't exist or has been removed.",
    }
    .render_or_plain()
}

/// Formats a price as dollars with en-US digit grouping.
///
/// Up to three fraction digits are kept, trailing zeros dropped:
/// `1250000.0` renders as `$1,250,000` and `99.5` as `$99.5`.
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let fixed = format!("{:.3}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::from("$");
    if value < 0.0 && (whole != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a timestamp as `January 5, 2024`.
pub fn format_date(value: DateTime<Utc>) -> String {
    value.format("%B %-d, %Y").to_string()
}
