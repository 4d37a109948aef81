//! Weekly portfolio email.
//!
//! The summary is rendered to a single HTML body and sent over SMTP with
//! STARTTLS. Credentials come from the environment (or a `.env` file):
//!
//! - `SMTP_USERNAME`: login, also used as the sender address
//! - `SMTP_PASSWORD`: password or app password
//! - `NOTIFY_EMAIL`: recipient
//! - `SMTP_HOST`: relay, defaults to `smtp.gmail.com`

use anyhow::{Context, Result};
use biashara_core::report::{HoldingSummary, PortfolioSummary};
use chrono::{DateTime, FixedOffset};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use rust_decimal::Decimal;
use std::fmt;

const DEFAULT_HOST: &str = "smtp.gmail.com";
const SENDER_NAME: &str = "BiasharaWatch";

const BRAND: &str = "#006633";
const GAIN: &str = "#1B5E20";
const LOSS: &str = "#B71C1C";

/// SMTP account and recipient.
#[derive(Clone)]
pub struct MailSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

impl MailSettings {
    /// Read settings from the environment. `Err` lists the missing variables.
    pub fn from_env() -> std::result::Result<Self, Vec<&'static str>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, Vec<&'static str>> {
        let get = |key: &'static str, missing: &mut Vec<&'static str>| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let mut missing = Vec::new();
        let username = get("SMTP_USERNAME", &mut missing);
        let password = get("SMTP_PASSWORD", &mut missing);
        let recipient = get("NOTIFY_EMAIL", &mut missing);
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            host: lookup("SMTP_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            username,
            password,
            recipient,
        })
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// A rendered report ready to send.
#[derive(Debug, Clone)]
pub struct Report {
    pub subject: String,
    pub html: String,
}

/// Render the weekly report for prices fetched at `as_of`.
pub fn compose(summary: &PortfolioSummary, as_of: DateTime<FixedOffset>) -> Report {
    let subject = format!(
        "BiasharaWatch Weekly Portfolio Report: {}",
        as_of.format("%d %b %Y")
    );

    let mut html = String::new();
    html.push_str(&format!(
        r#"<html><body style="font-family:Arial,sans-serif;color:#222;max-width:820px;margin:auto">
<div style="background:{BRAND};color:white;padding:20px;border-radius:8px 8px 0 0">
<h2 style="margin:0">BiasharaWatch Weekly Portfolio Report</h2>
<p style="margin:4px 0 0">NSE prices as of {as_of}</p>
</div>
"#,
        as_of = as_of.format("%A, %d %B %Y %H:%M")
    ));

    let total_color = colour(summary.is_gain());
    let total_pct = summary
        .total_gain_loss_pct
        .map(|pct| format!(" ({})", signed_pct(pct)))
        .unwrap_or_default();
    html.push_str(&format!(
        r#"<div style="background:#f9f9f9;padding:16px;border:1px solid #ddd;margin-bottom:16px">
<table width="100%" cellspacing="8"><tr>
<td><strong>Total Invested</strong><br><span style="font-size:18px">{invested}</span></td>
<td><strong>Current Value</strong><br><span style="font-size:18px">{value}</span></td>
<td><strong>Total Gain/Loss</strong><br><span style="font-size:18px;color:{total_color}">{gain}{total_pct}</span></td>
</tr></table>
</div>
"#,
        invested = kes(summary.total_invested),
        value = kes(summary.total_current_value),
        gain = signed_kes(summary.total_gain_loss),
    ));

    if summary.holdings.is_empty() {
        html.push_str("<p>No priced holdings this week. Fill in Ticker, Shares Owned and Buy Price in the My Portfolio sheet.</p>\n");
    } else {
        html.push_str(
            r#"<table width="100%" cellspacing="0" style="border-collapse:collapse;font-size:13px">
<thead><tr style="background:#006633;color:white">
<th style="padding:8px;text-align:left">Ticker</th>
<th style="padding:8px;text-align:left">Company</th>
<th style="padding:8px;text-align:right">Shares</th>
<th style="padding:8px;text-align:right">Buy Price</th>
<th style="padding:8px;text-align:right">Current Price</th>
<th style="padding:8px;text-align:right">Current Value</th>
<th style="padding:8px;text-align:right">Gain/Loss</th>
<th style="padding:8px;text-align:right">Gain/Loss %</th>
</tr></thead>
<tbody>
"#,
        );
        for holding in &summary.holdings {
            holding_row(&mut html, holding);
        }
        html.push_str("</tbody>\n</table>\n");
    }

    if !summary.unpriced.is_empty() {
        html.push_str(&format!(
            "<p style=\"font-size:12px;color:#555\">Not valued this week: {}</p>\n",
            escape(&summary.unpriced.join(", "))
        ));
    }

    html.push_str(
        r#"<p style="font-size:11px;color:#888;margin-top:16px">NSE market data. Sent by BiasharaWatch.</p>
</body></html>
"#,
    );

    Report { subject, html }
}

fn holding_row(html: &mut String, h: &HoldingSummary) {
    let color = colour(!h.gain_loss.is_sign_negative());
    let pct = h.gain_loss_pct.map(signed_pct).unwrap_or_default();
    html.push_str(&format!(
        r#"<tr style="border-bottom:1px solid #eee">
<td style="padding:8px">{ticker}</td>
<td style="padding:8px">{company}</td>
<td style="padding:8px;text-align:right">{shares}</td>
<td style="padding:8px;text-align:right">{buy}</td>
<td style="padding:8px;text-align:right">{price}</td>
<td style="padding:8px;text-align:right">{value}</td>
<td style="padding:8px;text-align:right;color:{color}">{gain}</td>
<td style="padding:8px;text-align:right;color:{color}">{pct}</td>
</tr>
"#,
        ticker = escape(&h.ticker),
        company = escape(&h.company),
        shares = group_thousands(&h.shares_owned.to_string()),
        buy = kes(h.buy_price),
        price = kes(h.current_price),
        value = kes(h.current_value),
        gain = signed_kes(h.gain_loss),
    ));
}

/// Send `report` through the configured relay.
pub fn send(settings: &MailSettings, report: &Report) -> Result<()> {
    let from: Address = settings
        .username
        .parse()
        .with_context(|| format!("SMTP_USERNAME '{}' is not an email address", settings.username))?;
    let to: Address = settings
        .recipient
        .parse()
        .with_context(|| format!("NOTIFY_EMAIL '{}' is not an email address", settings.recipient))?;

    let message = Message::builder()
        .from(Mailbox::new(Some(SENDER_NAME.to_string()), from))
        .to(Mailbox::new(None, to))
        .subject(report.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(report.html.clone())
        .context("build email")?;

    let transport = SmtpTransport::starttls_relay(&settings.host)
        .with_context(|| format!("SMTP relay {}", settings.host))?
        .credentials(Credentials::new(
            settings.username.clone(),
            settings.password.clone(),
        ))
        .build();

    transport
        .send(&message)
        .with_context(|| format!("send via {}", settings.host))?;
    Ok(())
}

fn colour(gain: bool) -> &'static str {
    if gain {
        GAIN
    } else {
        LOSS
    }
}

/// `KES 1,234.50`
fn kes(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() && !amount.round_dp(2).is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}KES {}", money(amount.abs()))
}

/// `+KES 2,000.00` or `-KES 500.00`
fn signed_kes(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() { "-" } else { "+" };
    format!("{sign}KES {}", money(amount.abs()))
}

fn signed_pct(pct: Decimal) -> String {
    let sign = if pct.is_sign_negative() { "" } else { "+" };
    format!("{sign}{:.2}%", pct.round_dp(2))
}

/// Non-negative amount with two decimals and thousands separators.
fn money(amount: Decimal) -> String {
    let text = format!("{:.2}", amount.round_dp(2));
    match text.split_once('.') {
        Some((whole, frac)) => format!("{}.{frac}", group_thousands(whole)),
        None => format!("{}.00", group_thousands(&text)),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
