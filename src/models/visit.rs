use serde::Deserialize;

/// What the request told us about the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub ip: String,
    pub user_agent: Option<String>,
}

/// Geolocation lookup result. Every field may be missing, e.g. for private addresses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}
