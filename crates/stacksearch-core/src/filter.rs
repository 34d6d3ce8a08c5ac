// Fuzzy filtering of site names and question titles
use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Ranks candidates against a pattern
#[async_trait]
pub trait FuzzyFilter: Send + Sync {
    /// Indices into `candidates` that match `pattern`, best match first
    async fn rank(&self, pattern: &str, candidates: &[String]) -> Result<Vec<usize>>;
}

/// Keep the items whose key matches `pattern`, in ranked order
pub async fn filter_items<T, F>(
    filter: &dyn FuzzyFilter,
    pattern: &str,
    items: Vec<T>,
    key: F,
) -> Result<Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let candidates: Vec<String> = items.iter().map(|item| key(item).to_string()).collect();
    let ranked = filter.rank(pattern, &candidates).await?;

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    Ok(ranked
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect())
}

/// In-process ranking with the skim algorithm
#[derive(Default)]
pub struct SkimFilter {
    matcher: SkimMatcherV2,
}

impl SkimFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn rank_sync(&self, pattern: &str, candidates: &[String]) -> Vec<usize> {
        let mut scored: Vec<(i64, usize)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| self.matcher.fuzzy_match(c, pattern).map(|score| (score, i)))
            .collect();
        // stable, so equal scores keep input order
        scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
        scored.into_iter().map(|(_, i)| i).collect()
    }
}

#[async_trait]
impl FuzzyFilter for SkimFilter {
    async fn rank(&self, pattern: &str, candidates: &[String]) -> Result<Vec<usize>> {
        Ok(self.rank_sync(pattern, candidates))
    }
}

/// Runs `fzf --filter`, falling back to [`SkimFilter`] when fzf is missing
pub struct FzfFilter {
    program: PathBuf,
    fallback: SkimFilter,
}

impl Default for FzfFilter {
    fn default() -> Self {
        Self::with_program("fzf")
    }
}

impl FzfFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            fallback: SkimFilter::new(),
        }
    }
}

#[async_trait]
impl FuzzyFilter for FzfFilter {
    async fn rank(&self, pattern: &str, candidates: &[String]) -> Result<Vec<usize>> {
        // fzf is line based
        let lines: Vec<String> = candidates.iter().map(|c| c.replace(['\n', '\r'], " ")).collect();

        let spawned = Command::new(&self.program)
            .arg("--filter")
            .arg(pattern)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} not found, using built-in fuzzy matching", self.program.display());
                return self.fallback.rank(pattern, &lines).await;
            }
            Err(e) => {
                return Err(Error::FilterError(format!(
                    "could not start {}: {}",
                    self.program.display(),
                    e
                )))
            }
        };

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::FilterError("fzf stdin unavailable".into()))?;
        let mut input = lines.join("\n");
        input.push('\n');

        // Feed stdin while stdout drains so a large list can't deadlock
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(Error::FilterError(format!("writing to fzf: {}", e))),
            Err(e) => return Err(Error::FilterError(format!("fzf writer task: {}", e))),
        }

        match output.status.code() {
            Some(0) => {}
            // no match
            Some(1) => return Ok(Vec::new()),
            _ => {
                return Err(Error::FilterError(format!(
                    "fzf --filter {:?} exited with {}: {}",
                    pattern,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )))
            }
        }

        // Map printed lines back to indices; duplicates resolve in input order
        let mut positions: HashMap<&str, VecDeque<usize>> = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            positions.entry(line.as_str()).or_default().push_back(i);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let ranked: Vec<usize> = stdout
            .lines()
            .filter_map(|line| positions.get_mut(line).and_then(VecDeque::pop_front))
            .collect();
        debug!("fzf matched {} of {} candidates", ranked.len(), lines.len());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skim_ranks_matches_only() {
        let filter = SkimFilter::new();
        let candidates = strings(&["Stack Overflow", "Super User", "Server Fault", "Ask Ubuntu"]);

        let ranked = filter.rank("sof", &candidates).await.unwrap();

        assert!(ranked.contains(&0));
        assert!(!ranked.contains(&3));
    }

    #[tokio::test]
    async fn test_skim_no_match_is_empty() {
        let filter = SkimFilter::new();
        let ranked = filter.rank("zzzz", &strings(&["Stack Overflow"])).await.unwrap();

        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fzf_falls_back_to_skim() {
        let filter = FzfFilter::with_program("stacksearch-test-no-such-fzf");
        let candidates = strings(&["Ask Ubuntu", "Stack Overflow"]);

        let ranked = filter.rank("overflow", &candidates).await.unwrap();

        assert_eq!(ranked, vec![1]);
    }

    #[tokio::test]
    async fn test_filter_items_keeps_duplicates() {
        let filter = SkimFilter::new();
        let items = vec![("same title", 1), ("other", 2), ("same title", 3)];

        let kept = filter_items(&filter, "same", items, |item| item.0).await.unwrap();

        let ids: Vec<i32> = kept.iter().map(|item| item.1).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fzf_protocol_with_stand_in_binary() {
        use std::os::unix::fs::PermissionsExt;

        // grep shares fzf's exit codes: 0 on match, 1 on none
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-fzf");
        std::fs::write(&script, "#!/bin/sh\nexec grep -i -F -- \"$2\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let filter = FzfFilter::with_program(&script);
        let candidates = strings(&["Parse JSON", "parse yaml", "Write JSON", "parse yaml"]);

        let ranked = filter.rank("parse", &candidates).await.unwrap();
        assert_eq!(ranked, vec![0, 1, 3]);

        let ranked = filter.rank("toml", &candidates).await.unwrap();
        assert!(ranked.is_empty());
    }
}
