//! HTML rendering and raw-message assembly for the digest email.

use chrono::{DateTime, Utc};
use shared::DigestItem;

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn digest_subject(date: DateTime<Utc>) -> String {
    format!("Daily Inbox Digest - {}", date.format("%A, %B %-d"))
}

pub fn build_digest_html(items: &[DigestItem], date: DateTime<Utc>) -> String {
    let date_str = date.format("%A, %B %-d, %Y").to_string();

    let rows: String = items
        .iter()
        .map(|item| {
            format!(
                "\n    <tr>\n      <td style=\"padding:14px 0;border-bottom:1px solid #e5e7eb;\">\n        <div style=\"font-weight:600;color:#111;font-size:15px;\">{}</div>\n        <div style=\"color:#6b7280;font-size:13px;margin:2px 0 8px;\">{}</div>\n        <div style=\"color:#374151;font-size:14px;white-space:pre-line;\">{}</div>\n      </td>\n    </tr>",
                escape_html(&item.subject),
                escape_html(&item.from),
                escape_html(&item.content),
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<body style=\"font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;max-width:620px;margin:0 auto;padding:24px;color:#111;\">\n  <h2 style=\"margin:0 0 4px;font-size:20px;\">Daily Inbox Digest</h2>\n  <p style=\"margin:0 0 20px;color:#6b7280;font-size:14px;\">{} &mdash; {} email{}</p>\n  <table style=\"width:100%;border-collapse:collapse;\">{}</table>\n</body>\n</html>",
        escape_html(&date_str),
        items.len(),
        if items.len() == 1 { "" } else { "s" },
        rows,
    )
}

/// Assemble the RFC 2822 message the provider's send API expects
pub fn build_raw_message(to: &str, from: &str, subject: &str, html: &str) -> String {
    [
        &format!("From: {from}"),
        &format!("To: {to}"),
        &format!("Subject: {subject}"),
        "MIME-Version: 1.0",
        "Content-Type: text/html; charset=UTF-8",
        "",
        html,
    ]
    .join("\r\n")
}
