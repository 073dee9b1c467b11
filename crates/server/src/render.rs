//! HTML pages for the share link.
//!
//! Rendering sits behind [`LinkRenderer`] so the page layout can change
//! without touching the routes.

use std::time::Duration;

use minijinja::{Environment, Value, context};
use thiserror::Error;

use crate::resolver::AssetView;

/// Fuel limit for template evaluation.
const FUEL_LIMIT: u64 = 50_000;

const ASSET_TEMPLATE: &str = "asset.html";
const EXPIRED_TEMPLATE: &str = "expired.html";

/// A page failed to render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render {template}: {source}")]
    Template {
        template: &'static str,
        #[source]
        source: minijinja::Error,
    },

    #[error("base url {0:?} must be an absolute http(s) url without quotes, markup or whitespace")]
    BaseUrl(String),
}

/// Whether `url` can be written into an HTML attribute verbatim.
///
/// The base URL is the only link component not derived from an
/// [`AssetId`](ephemera_blob::AssetId) or the format table, so it is the
/// only one that needs checking before being marked safe.
#[must_use]
pub fn is_plain_base_url(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://"))
        && !url.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '&')
        })
}

/// Produces the pages shown behind `/v/{id}`.
pub trait LinkRenderer: Send + Sync {
    /// Player page for a present asset.
    fn render_asset(&self, asset: &AssetView) -> Result<String, RenderError>;

    /// Page for an absent asset. The same page is used whether the asset
    /// expired or never existed.
    fn render_expired(&self) -> Result<String, RenderError>;
}

/// Renders the built-in templates with `MiniJinja`.
pub struct HtmlRenderer {
    env: Environment<'static>,
    base_url: String,
    ttl: Duration,
}

impl HtmlRenderer {
    /// `base_url` prefixes absolute links (e.g. `og:video`); `ttl` is
    /// shown on the expired page.
    pub fn new(base_url: impl Into<String>, ttl: Duration) -> Result<Self, RenderError> {
        let base_url = base_url.into();
        if !is_plain_base_url(&base_url) {
            return Err(RenderError::BaseUrl(base_url));
        }
        let mut env = Environment::new();
        env.set_fuel(Some(FUEL_LIMIT));
        for (name, source) in [
            (ASSET_TEMPLATE, include_str!("../templates/asset.html")),
            (EXPIRED_TEMPLATE, include_str!("../templates/expired.html")),
        ] {
            env.add_template(name, source)
                .map_err(|source| RenderError::Template {
                    template: name,
                    source,
                })?;
        }
        Ok(Self {
            env,
            base_url,
            ttl,
        })
    }

    fn render(&self, template: &'static str, ctx: &minijinja::Value) -> Result<String, RenderError> {
        self.env
            .get_template(template)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|source| RenderError::Template { template, source })
    }
}

impl LinkRenderer for HtmlRenderer {
    fn render_asset(&self, asset: &AssetView) -> Result<String, RenderError> {
        // HTML auto-escaping also rewrites `/`, which would mangle every
        // link; these values are built from the id, the format table and
        // the checked base url only.
        let ctx = context! {
            raw_url => Value::from_safe_string(asset.raw_url.clone()),
            download_url => Value::from_safe_string(asset.download_url.clone()),
            media_type => Value::from_safe_string(asset.media_type.to_owned()),
            video_url => Value::from_safe_string(format!("{}{}", self.base_url, asset.raw_url)),
            share_url => Value::from_safe_string(format!("{}/v/{}", self.base_url, asset.id)),
            size => human_size(asset.size_bytes),
            expires_at => asset.expires_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        };
        self.render(ASSET_TEMPLATE, &ctx)
    }

    fn render_expired(&self) -> Result<String, RenderError> {
        self.render(EXPIRED_TEMPLATE, &context! { ttl => human_duration(self.ttl) })
    }
}

/// `1536` -> `"1.5 KiB"`.
#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `5400s` -> `"1 hour 30 minutes"`; seconds are dropped past one minute.
fn human_duration(d: Duration) -> String {
    fn part(n: u64, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    }

    let secs = d.as_secs();
    if secs < 60 {
        return part(secs, "second");
    }
    let (days, hours, minutes) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60);
    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| part(n, unit))
        .collect();
    parts.join(" ")
}
