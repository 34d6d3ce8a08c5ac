// Site list: building the cache and picking a site from it
use chrono::Utc;
use futures::stream::{self, StreamExt};
use image::ImageFormat;
use stacksearch_cache::{CacheDirectory, SitesSnapshot};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::feedback::{Feedback, Item, ERROR_ICON, FALLBACK_ICON};
use crate::filter::{filter_items, FuzzyFilter};
use crate::models::Site;
use crate::search::StackExchangeSource;
use crate::{Config, Error, Result};

/// Icons downloaded at once
const ICON_CONCURRENCY: usize = 8;

/// Outcome of a cache rebuild, printed for the completion notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheReport {
    pub sites: usize,
    pub new_icons: usize,
    pub failed_icons: usize,
}

impl std::fmt::Display for CacheReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cached {} sites ({} new icons)", self.sites, self.new_icons)
    }
}

/// Rebuild the site list and fill in missing icons
///
/// The site list is written only after every page has been fetched, and it
/// replaces the old file in one rename. A failed fetch leaves the previous
/// list untouched.
pub async fn cache_sites(
    cache: &CacheDirectory,
    source: &dyn StackExchangeSource,
) -> Result<CacheReport> {
    debug!("Retrieving StackExchange sites");
    let sites = dedup_sites(source.sites().await?);

    cache.store_sites(&SitesSnapshot {
        fetched_at: Utc::now(),
        sites: sites.clone(),
    })?;
    info!("Retrieved {} StackExchange sites", sites.len());

    let outstanding: Vec<&Site> = sites
        .iter()
        .filter(|site| !site.icon_url.is_empty() && !cache.has_icon(&site.id))
        .collect();
    debug!("{} icons to download", outstanding.len());

    let results: Vec<bool> = stream::iter(outstanding)
        .map(|site| async move {
            match cache_icon(cache, source, site).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Icon for {} from {} skipped: {}", site.id, site.icon_url, e);
                    false
                }
            }
        })
        .buffer_unordered(ICON_CONCURRENCY)
        .collect()
        .await;

    let new_icons = results.iter().filter(|ok| **ok).count();
    let report = CacheReport {
        sites: sites.len(),
        new_icons,
        failed_icons: results.len() - new_icons,
    };
    info!("Correctly processed {} icons", report.new_icons);
    if report.failed_icons > 0 {
        warn!("{} icons could not be cached", report.failed_icons);
    }
    Ok(report)
}

/// First occurrence of each site id wins
fn dedup_sites(sites: Vec<Site>) -> Vec<Site> {
    let mut seen = HashSet::new();
    sites
        .into_iter()
        .filter(|site| {
            let fresh = seen.insert(site.id.clone());
            if !fresh {
                debug!("Dropping duplicate site {}", site.id);
            }
            fresh
        })
        .collect()
}

async fn cache_icon(cache: &CacheDirectory, source: &dyn StackExchangeSource, site: &Site) -> Result<()> {
    debug!("Downloading icon for {} from {}", site.id, site.icon_url);
    let bytes = source.icon(&site.icon_url).await?;
    let png = to_png(&bytes)?;
    let path = cache.store_icon(&site.id, &png)?;
    debug!("Saved icon to {}", path.display());
    Ok(())
}

/// Decode whatever the CDN served and re-encode it as PNG
fn to_png(bytes: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(bytes).map_err(|e| Error::IconError(e.to_string()))?;
    debug!("Decoded icon {}x{}", image.width(), image.height());

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| Error::IconError(e.to_string()))?;
    Ok(png.into_inner())
}

/// Sites from the cache, empty if it was never built
pub fn load_sites(cache: &CacheDirectory) -> Result<Vec<Site>> {
    Ok(cache
        .load_sites::<Site>()?
        .map(|snapshot| snapshot.sites)
        .unwrap_or_default())
}

/// Icon to show for a site: its cached icon or the workflow icon
pub fn site_icon(cache: &CacheDirectory, site_id: &str) -> String {
    let path = cache.icon_path(site_id);
    if path.is_file() {
        path.display().to_string()
    } else {
        FALLBACK_ICON.to_string()
    }
}

/// Script filter for choosing a site
pub async fn site_feedback(
    cache: &CacheDirectory,
    filter: &dyn FuzzyFilter,
    config: &Config,
    query: &str,
) -> Result<Feedback> {
    let mut sites = load_sites(cache)?;
    if sites.is_empty() {
        return Ok(Feedback::new(vec![Item::new("Sites not collected yet")
            .subtitle("Please run `stack-cache-sites` to collect StackExchange sites")
            .invalid()
            .icon(ERROR_ICON)]));
    }

    if config.ignore_meta_sites {
        sites.retain(|site| !site.is_meta);
    }

    let query = query.trim();
    if !query.is_empty() {
        sites = filter_items(filter, query, sites, |site| site.name.as_str()).await?;
    }
    debug!("Showing {} sites for {:?}", sites.len(), query);

    if sites.is_empty() {
        return Ok(Feedback::message("No matching sites", "Try a different query"));
    }

    Ok(Feedback::new(
        sites.iter().map(|site| site_item(cache, site)).collect(),
    ))
}

fn site_item(cache: &CacheDirectory, site: &Site) -> Item {
    Item::new(&site.name)
        .subtitle(&site.audience)
        .arg(&site.id)
        .uid(&site.id)
        .icon(site_icon(cache, &site.id))
        .text(&site.id)
        .variable("site_id", &site.id)
        .variable("site_name", &site.name)
        .variable("site_audience", &site.audience)
        .variable("site_icon", &site.icon_url)
        .variable("site_is_meta", if site.is_meta { "1" } else { "0" })
        .cmd_subtitle("Reveal icon in Finder")
}
