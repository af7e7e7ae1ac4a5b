//! Forecast notifications
//!
//! After a forecast is served, a summary email is sent to the configured
//! inbox. Delivery runs on a spawned task and never affects the HTTP
//! response; failures are only logged.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::types::ForecastEntry;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email API returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Receives every completed forecast.
#[async_trait]
pub trait ForecastNotifier: Send + Sync {
    /// `country` is the display label for the entry's country code.
    async fn notify(&self, entry: &ForecastEntry, country: &str) -> Result<(), NotifyError>;
}

/// Notifier used when email is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ForecastNotifier for NoopNotifier {
    async fn notify(&self, entry: &ForecastEntry, _country: &str) -> Result<(), NotifyError> {
        debug!(mode = %entry.inputs.mode, "Email disabled, skipping forecast notification");
        Ok(())
    }
}

/// Sends HTML summaries through a Resend-compatible email API
/// (`POST {from, to, subject, html}` with a Bearer key).
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    to: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }
}

#[async_trait]
impl ForecastNotifier for HttpMailer {
    async fn notify(&self, entry: &ForecastEntry, country: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "from": self.from,
            "to": self.to,
            "subject": subject(entry),
            "html": render_html(entry, country),
        });

        let resp = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        info!(to = %self.to, "Forecast email sent");
        Ok(())
    }
}

/// Notifier for the given email settings.
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn ForecastNotifier>, NotifyError> {
    if !config.enabled {
        return Ok(Arc::new(NoopNotifier));
    }
    if config.api_key.is_empty() {
        warn!("email.enabled = true but no API key is set; sends will likely be rejected");
    }
    Ok(Arc::new(HttpMailer::new(config)?))
}

/// Fire-and-forget delivery on the current runtime.
pub fn spawn_notify(notifier: Arc<dyn ForecastNotifier>, entry: ForecastEntry, country: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&entry, &country).await {
            warn!(error = %e, "Forecast notification failed");
        }
    });
}

pub fn subject(entry: &ForecastEntry) -> String {
    format!(
        "Forecast Results for {}",
        entry.contact.website.as_deref().unwrap_or("(no website)")
    )
}

/// Group the integer part with commas and keep up to three decimals,
/// trailing zeros dropped: `9000000.0` → `9,000,000`, `1234.5678` → `1,234.568`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    let text = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// HTML email body for a forecast.
pub fn render_html(entry: &ForecastEntry, country: &str) -> String {
    let inputs = &entry.inputs;
    let rates = &entry.result.rates;
    let totals = &entry.result.totals;
    let website = escape_html(entry.contact.website.as_deref().unwrap_or("not provided"));
    let email = escape_html(entry.contact.email.as_deref().unwrap_or("not provided"));

    format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.5; color: #000; max-width: 600px; margin: auto; padding: 20px; border: 1px solid #e5e7eb; border-radius: 8px;">
  <h2 style="margin-bottom: 8px;">Forecast Results</h2>
  <p><b>Website:</b> {website}</p>
  <p><b>Email Provided:</b> {email}</p>
  <p><b>Country:</b> {country}</p>
  <p><b>Category:</b> {category}</p>
  <p><b>Mode:</b> {mode}</p>
  <p><b>Daily Budget:</b> ${budget}</p>
  <p><b>Duration:</b> {days} days</p>
  <hr style="margin: 20px 0; border: 1px solid #ddd;"/>
  <h3>Rates</h3>
  <ul>
    <li>CTR: {ctr:.2}%</li>
    <li>CVR: {cvr:.2}%</li>
    <li>CPM: ${cpm:.2}</li>
    <li>CPC: ${cpc:.2}</li>
    <li>CPA: ${cpa:.2}</li>
  </ul>
  <h3>Totals (Estimates)</h3>
  <ul>
    <li>Impressions: {impressions}</li>
    <li>Clicks: {clicks}</li>
    <li>Conversions: {conversions}</li>
  </ul>
  <p style="margin-top: 16px; font-size: 13px;">Estimates are based on benchmarks and inputs. Actual results may vary.</p>
</div>"#,
        country = escape_html(country),
        category = escape_html(&inputs.category),
        mode = inputs.mode,
        budget = format_thousands(inputs.daily_budget),
        days = inputs.duration_days,
        ctr = rates.ctr * 100.0,
        cvr = rates.cvr * 100.0,
        cpm = rates.cpm,
        cpc = rates.cpc,
        cpa = rates.cpa,
        impressions = format_thousands(totals.impressions.base),
        clicks = format_thousands(totals.clicks.base),
        conversions = format_thousands(totals.conversions.base),
    )
}
