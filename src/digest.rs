//! New-formula digest: sync the mirror, parse what was added, ask the model
//! for a summary.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::descriptor::FormulaDescriptor;
use crate::escape::decode_escapes;
use crate::model::ModelAdapter;
use crate::repo::RepoSync;

/// Token budget for the generated summary.
pub const SUMMARY_MAX_TOKENS: u32 = 1024;

/// Between the prompt and the model's summary in the rendered digest.
pub const SUMMARY_SEPARATOR: &str = "\n----\n";

/// Instruction text that opens every digest prompt.
pub fn prompt_prefix(window: &str) -> String {
    format!(
        "Summarize the following list of newly added applications called Formula that have \
         been added this past {window} into a brief overview. Include a summary paragraph \
         written like a radio commentator.\n"
    )
}

/// The full summarization prompt for `descriptors`.
pub fn summary_prompt(window: &str, descriptors: &[FormulaDescriptor]) -> String {
    let listing = descriptors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    prompt_prefix(window) + &listing
}

#[derive(Debug, Clone)]
pub struct DigestReport {
    pub run_id: Uuid,
    pub window: String,
    pub descriptors: Vec<FormulaDescriptor>,
    pub prompt: String,
    pub summary: String,
}

impl DigestReport {
    /// Prompt and summary as one text blob, escape sequences decoded.
    pub fn render(&self) -> String {
        decode_escapes(&format!("{}{}{}", self.prompt, SUMMARY_SEPARATOR, self.summary))
    }
}

/// Parse every entry (relative to `repo_dir`). Unreadable files are logged and skipped.
pub fn collect_descriptors(repo_dir: &Path, entries: &[String]) -> Vec<FormulaDescriptor> {
    entries
        .iter()
        .filter_map(|entry| {
            let path = repo_dir.join(entry);
            tracing::debug!(path = %path.display(), "parsing formula");
            match FormulaDescriptor::from_file(&path) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping formula");
                    None
                }
            }
        })
        .collect()
}

/// Runs digests against one mirror root. Runs are serialized so concurrent
/// requests never operate on the checkout at the same time.
pub struct Digester {
    sync: Arc<RepoSync>,
    model: ModelAdapter,
    repo_root: PathBuf,
    lock: Mutex<()>,
}

impl Digester {
    pub fn new(sync: Arc<RepoSync>, model: ModelAdapter, repo_root: PathBuf) -> Self {
        Self {
            sync,
            model,
            repo_root,
            lock: Mutex::new(()),
        }
    }

    pub async fn run(&self, window: &str) -> Result<DigestReport> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("digest", %run_id, window);
        self.run_inner(run_id, window).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, window: &str) -> Result<DigestReport> {
        let _guard = self.lock.lock().await;

        let sync = Arc::clone(&self.sync);
        let root = self.repo_root.clone();
        let window_owned = window.to_string();
        let descriptors = tokio::task::spawn_blocking(move || -> Result<Vec<FormulaDescriptor>> {
            let repo_dir = sync.update_core(&root);
            let entries = sync
                .list_new_entries(&window_owned, &repo_dir)
                .context("failed to list new formulae")?;
            Ok(collect_descriptors(&repo_dir, &entries))
        })
        .await
        .context("digest sync task failed")??;

        tracing::info!(count = descriptors.len(), "collected new formulae");

        let prompt = summary_prompt(window, &descriptors);
        match self.model.count_tokens(&prompt).await {
            Ok(n) => tracing::info!(tokens = n, "digest prompt token count"),
            Err(e) => tracing::warn!(error = %e, "could not count prompt tokens"),
        }

        let summary = self.model.complete(&prompt, SUMMARY_MAX_TOKENS).await;

        Ok(DigestReport {
            run_id,
            window: window.to_string(),
            descriptors,
            prompt,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> FormulaDescriptor {
        FormulaDescriptor {
            name: name.into(),
            description: format!("{name} does things"),
            homepage: format!("https://{name}.example"),
            license: "MIT".into(),
            git_repository: String::new(),
        }
    }

    #[test]
    fn prompt_with_no_descriptors_is_just_the_prefix() {
        let prompt = summary_prompt("1 week", &[]);
        assert_eq!(prompt, prompt_prefix("1 week"));
        assert!(prompt.contains("added this past 1 week"));
        assert!(prompt.ends_with("radio commentator.\n"));
    }

    #[test]
    fn prompt_lists_descriptors_one_per_entry() {
        let prompt = summary_prompt("5 days", &[descriptor("abc"), descriptor("xyz")]);
        let listing = prompt.strip_prefix(&prompt_prefix("5 days")).unwrap();
        assert_eq!(
            listing,
            "abc: abc does things\n- License: MIT Link(s): https://abc.example \n\
             xyz: xyz does things\n- License: MIT Link(s): https://xyz.example "
        );
    }

    #[test]
    fn render_joins_and_decodes() {
        let report = DigestReport {
            run_id: Uuid::now_v7(),
            window: "1 week".into(),
            descriptors: vec![],
            prompt: "P".into(),
            summary: r"On the air:\nnothing new".into(),
        };
        assert_eq!(report.render(), "P\n----\nOn the air:\nnothing new");
    }

    #[test]
    fn collect_skips_unreadable_entries() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("Formula/a")).unwrap();
        std::fs::write(
            tmp.path().join("Formula/a/abc.rb"),
            "class Abc < Formula\n  desc \"Alphabet tool\"\nend\n",
        )
        .unwrap();

        let entries = vec!["Formula/a/abc.rb".to_string(), "Formula/g/gone.rb".to_string()];
        let descriptors = collect_descriptors(tmp.path(), &entries);

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "abc");
        assert_eq!(descriptors[0].description, "Alphabet tool");
    }
}
