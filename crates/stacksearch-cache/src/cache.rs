use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Hex digits of the hash kept in answer file names
const KEY_LEN: usize = 12;

const SITES_FILE: &str = "all_sites.json";
const ANSWERS_DIR: &str = "answers";
const ICONS_DIR: &str = "icons";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache IO failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The persisted site list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesSnapshot<T> {
    pub fetched_at: DateTime<Utc>,
    pub sites: Vec<T>,
}

/// One cached search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersEntry<T> {
    pub cached_at: DateTime<Utc>,
    pub site_id: String,
    pub query: String,
    pub tags: Vec<String>,
    pub questions: Vec<T>,
}

impl<T> AnswersEntry<T> {
    /// Younger than `max_age` as of `now`
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => age < max_age,
            Err(_) => true,
        }
    }
}

/// Cache file name stem for a search: the first [`KEY_LEN`] hex digits of
/// SHA-256 over `site_id`, `query` and each tag joined with `_`
pub fn answers_key(site_id: &str, query: &str, tags: &[String]) -> String {
    let mut parts = vec![site_id, query];
    parts.extend(tags.iter().map(String::as_str));
    let digest = Sha256::digest(parts.join("_").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..KEY_LEN].to_string()
}

/// Layout of the cache directory
///
/// ```text
/// <root>/all_sites.json
/// <root>/answers/<key>.json.gz
/// <root>/icons/<site_id>.png
/// ```
#[derive(Debug, Clone)]
pub struct CacheDirectory {
    root: PathBuf,
    answers_dir: PathBuf,
    icons_dir: PathBuf,
}

impl CacheDirectory {
    /// Open the cache rooted at `root`, creating the directories on first use
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let answers_dir = root.join(ANSWERS_DIR);
        let icons_dir = root.join(ICONS_DIR);

        for dir in [&root, &answers_dir, &icons_dir] {
            std::fs::create_dir_all(dir).map_err(io_err(dir))?;
        }

        Ok(Self {
            root,
            answers_dir,
            icons_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sites_path(&self) -> PathBuf {
        self.root.join(SITES_FILE)
    }

    pub fn answers_path(&self, key: &str) -> PathBuf {
        self.answers_dir.join(format!("{}.json.gz", key))
    }

    pub fn icon_path(&self, site_id: &str) -> PathBuf {
        self.icons_dir.join(format!("{}.png", site_id))
    }

    pub fn has_icon(&self, site_id: &str) -> bool {
        self.icon_path(site_id).is_file()
    }

    /// Load the site list, `None` if it was never built
    pub fn load_sites<T: DeserializeOwned>(&self) -> Result<Option<SitesSnapshot<T>>> {
        let path = self.sites_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        let snapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CacheError::Corrupt { path, source })?;
        Ok(Some(snapshot))
    }

    /// Replace the site list wholesale
    pub fn store_sites<T: Serialize>(&self, snapshot: &SitesSnapshot<T>) -> Result<()> {
        let path = self.sites_path();
        let mut tmp = self.temp_file(&self.root)?;
        serde_json::to_writer(&mut tmp, snapshot).map_err(|source| CacheError::Encode {
            path: path.clone(),
            source,
        })?;
        persist(tmp, &path)?;
        debug!("Wrote {} sites to {}", snapshot.sites.len(), path.display());
        Ok(())
    }

    /// Load a cached search, `None` on a miss
    pub fn load_answers<T: DeserializeOwned>(&self, key: &str) -> Result<Option<AnswersEntry<T>>> {
        let path = self.answers_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        let entry = serde_json::from_reader(BufReader::new(GzDecoder::new(file)))
            .map_err(|source| CacheError::Corrupt { path, source })?;
        Ok(Some(entry))
    }

    /// Store a search response gzip-compressed
    pub fn store_answers<T: Serialize>(&self, key: &str, entry: &AnswersEntry<T>) -> Result<()> {
        let path = self.answers_path(key);
        let tmp = self.temp_file(&self.answers_dir)?;
        let mut encoder = GzEncoder::new(tmp, Compression::default());
        serde_json::to_writer(&mut encoder, entry).map_err(|source| CacheError::Encode {
            path: path.clone(),
            source,
        })?;
        let tmp = encoder.finish().map_err(io_err(&path))?;
        persist(tmp, &path)?;
        debug!("Cached {} questions in {}", entry.questions.len(), path.display());
        Ok(())
    }

    /// Store an already-encoded PNG for `site_id`
    pub fn store_icon(&self, site_id: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.icon_path(site_id);
        let mut tmp = self.temp_file(&self.icons_dir)?;
        tmp.write_all(png).map_err(io_err(&path))?;
        persist(tmp, &path)?;
        Ok(path)
    }

    fn temp_file(&self, dir: &Path) -> Result<NamedTempFile> {
        NamedTempFile::new_in(dir).map_err(io_err(dir))
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| io_err(path)(e.error))?;
    Ok(())
}
