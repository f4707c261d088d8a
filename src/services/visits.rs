//! Visit beacon: geolocate the visitor and post a summary to a webhook.
//!
//! The work runs in a detached task. Whatever happens there is logged and
//! never reaches the visitor.

use crate::config::VisitConfig;
use crate::models::{Embed, EmbedField, EmbedFooter, GeoLocation, Visit, WebhookPayload};
use chrono::{DateTime, SecondsFormat, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const FALLBACK_IP: &str = "127.0.0.1";
const EMBED_COLOR: u32 = 0x5865F2;

#[derive(Debug, Error)]
pub enum VisitError {
    #[error("not a valid IP address: {0}")]
    InvalidIp(String),

    #[error("geolocation lookup failed: {0}")]
    Geolocation(#[source] reqwest::Error),

    #[error("webhook delivery failed: {0}")]
    Webhook(#[source] reqwest::Error),
}

/// First entry of an `X-Forwarded-For` value, or loopback when there is none.
pub fn client_ip(forwarded_for: Option<&str>) -> String {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(FALLBACK_IP)
        .to_string()
}

fn format_coordinate(value: Option<f64>) -> Option<String> {
    value.filter(|v| v.is_finite()).map(|v| v.to_string())
}

/// Builds the notification. Fields the lookup did not return are left out.
pub fn build_embed(visit: &Visit, geo: &GeoLocation, footer: &str, now: DateTime<Utc>) -> Embed {
    let mut fields = vec![EmbedField::inline("IP Address", format!("`{}`", visit.ip))];

    let optional = [
        ("Country", geo.country.clone()),
        ("City", geo.city.clone()),
        ("ISP", geo.isp.clone()),
        ("Latitude", format_coordinate(geo.lat)),
        ("Longitude", format_coordinate(geo.lon)),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            fields.push(EmbedField::inline(name, value));
        }
    }

    if let Some(ref ua) = visit.user_agent {
        fields.push(EmbedField::block("User Agent", format!("```{}```", ua)));
    }

    Embed {
        title: "New visit".to_string(),
        description: "A new user has visited the site.".to_string(),
        color: EMBED_COLOR,
        fields,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        footer: EmbedFooter {
            text: footer.to_string(),
        },
    }
}

pub struct VisitNotifier {
    client: reqwest::Client,
    geolocation_url: String,
    footer: String,
}

impl VisitNotifier {
    pub fn new(config: &VisitConfig, footer: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("media-gallery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            geolocation_url: config.geolocation_url.clone(),
            footer: footer.to_string(),
        })
    }

    pub async fn geolocate(&self, ip: &str) -> Result<GeoLocation, VisitError> {
        // The address ends up in a URL path.
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| VisitError::InvalidIp(ip.to_string()))?;

        let url = format!("{}/{}", self.geolocation_url, addr);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(VisitError::Geolocation)?;

        response.json().await.map_err(VisitError::Geolocation)
    }

    pub async fn post_webhook(
        &self,
        webhook_url: &str,
        payload: &WebhookPayload,
    ) -> Result<(), VisitError> {
        self.client
            .post(webhook_url)
            .json(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(VisitError::Webhook)?;
        Ok(())
    }

    /// Lookup then delivery. No webhook post happens when the lookup fails.
    pub async fn notify(&self, webhook_url: &str, visit: &Visit) -> Result<(), VisitError> {
        let geo = self.geolocate(&visit.ip).await?;
        if geo.status.as_deref() == Some("fail") {
            tracing::debug!("Geolocation returned no data for {}", visit.ip);
        }

        let payload = WebhookPayload {
            embeds: vec![build_embed(visit, &geo, &self.footer, Utc::now())],
        };
        self.post_webhook(webhook_url, &payload).await?;

        tracing::info!("Sent visit notification for {}", visit.ip);
        Ok(())
    }

    /// Fire-and-forget. The handle is dropped, so the caller never learns the outcome.
    pub fn dispatch(self: &Arc<Self>, webhook_url: String, visit: Visit) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&webhook_url, &visit).await {
                tracing::warn!("Visit notification for {} dropped: {}", visit.ip, e);
            }
        });
    }
}
