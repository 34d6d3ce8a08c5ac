// Side commands run when an item is actioned
use stacksearch_cache::CacheDirectory;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::catalog::site_icon;
use crate::{Error, Result};

/// Show the site's icon file selected in Finder
pub async fn reveal_icon(cache: &CacheDirectory, site_id: &str) -> Result<()> {
    let icon = site_icon(cache, site_id);
    debug!("Revealing {}", icon);

    let status = Command::new("open").arg("-R").arg(&icon).status().await?;
    if !status.success() {
        return Err(Error::CommandFailed(format!("open -R {} exited with {}", icon, status)));
    }
    Ok(())
}

/// Only web links are handed to the browser
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(format!("{:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl(format!("{:?}: unsupported scheme {}", raw, other))),
    }
}

/// Open a question link in the default browser
pub fn open_url(raw: &str) -> Result<()> {
    let url = validate_url(raw)?;
    info!("Opening {}", url);
    open::that(url.as_str())?;
    Ok(())
}
