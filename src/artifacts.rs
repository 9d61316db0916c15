//! Session-scoped artifact layout.
//!
//! ```text
//! <output>/flow_<YYYYmmdd_HHMMSS>/
//!   screenshots/          one PNG per scraped phase
//!   prompts/              every delivered prompt, for manual copy
//!   <planning>_output/    raw planning responses
//!   <executing>_output/   raw executing responses
//!   final_article.md      append-only transcript
//!   journal.log           phase-state transitions
//!   session.json          audit record
//!   ghostflow.log         tracing output
//! ```

use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ArtifactError;
use crate::phase::SurfaceRole;

pub const JOURNAL_FILE: &str = "journal.log";
pub const LOG_FILE: &str = "ghostflow.log";

/// Directory layout of one session. Created once, never deleted.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    transcript_file: String,
    planning_output: PathBuf,
    executing_output: PathBuf,
}

impl ArtifactStore {
    /// Create a timestamped session folder under `output_dir`.
    pub fn create(
        output_dir: &Path,
        transcript_file: &str,
        planning_label: &str,
        executing_label: &str,
    ) -> Result<Self, ArtifactError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut root = output_dir.join(format!("flow_{}", stamp));
        let mut suffix = 1;
        while root.exists() {
            suffix += 1;
            root = output_dir.join(format!("flow_{}_{}", stamp, suffix));
        }
        Self::create_at(&root, transcript_file, planning_label, executing_label)
    }

    /// Create the layout at an explicit root.
    pub fn create_at(
        root: &Path,
        transcript_file: &str,
        planning_label: &str,
        executing_label: &str,
    ) -> Result<Self, ArtifactError> {
        let planning_output = root.join(format!("{}_output", planning_label));
        let mut executing_output = root.join(format!("{}_output", executing_label));
        if executing_output == planning_output {
            executing_output = root.join(format!("{}_executing_output", executing_label));
        }

        let store = Self {
            root: root.to_path_buf(),
            transcript_file: transcript_file.to_string(),
            planning_output,
            executing_output,
        };

        for dir in [
            store.root.clone(),
            store.screenshots_dir(),
            store.prompts_dir(),
            store.planning_output.clone(),
            store.executing_output.clone(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|source| ArtifactError::CreateDirFailed { path: dir, source })?;
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    pub fn output_dir(&self, role: SurfaceRole) -> &Path {
        match role {
            SurfaceRole::Planning => &self.planning_output,
            SurfaceRole::Executing => &self.executing_output,
        }
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.root.join(&self.transcript_file)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    pub fn screenshot_path(&self, phase: &str) -> PathBuf {
        self.screenshots_dir().join(format!("{}.png", phase))
    }

    /// Save the prompt delivered for `phase` so the operator can copy it by hand.
    pub fn save_prompt(&self, phase: &str, prompt: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.prompts_dir().join(format!("{}.md", phase));
        write_file(&path, prompt)?;
        Ok(path)
    }

    /// Save a raw response under the surface's output folder.
    pub fn save_response(
        &self,
        role: SurfaceRole,
        phase: &str,
        text: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.output_dir(role).join(format!("{}.txt", phase));
        write_file(&path, text)?;
        Ok(path)
    }

    /// Append one transcript entry, preceded by a blank-line separator.
    pub fn append_transcript(&self, text: &str) -> Result<(), ArtifactError> {
        let path = self.transcript_path();
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(format!("\n\n{}", text).as_bytes()))
            .map_err(|source| ArtifactError::WriteFailed { path, source })
    }

    /// Current transcript contents; empty when nothing was appended yet.
    pub fn read_transcript(&self) -> Result<String, ArtifactError> {
        let path = self.transcript_path();
        if !path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&path).map_err(|source| ArtifactError::WriteFailed { path, source })
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), ArtifactError> {
    fs::write(path, content).map_err(|source| ArtifactError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
