//! Git operations used by the review and commit commands.
//!
//! All operations shell out to the system `git` binary, inheriting the user's
//! git config, hooks and credentials.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::config::GitOptions;
use crate::error::GitError;

/// Pathspec magic that excludes a pattern relative to the repository root.
const EXCLUDE_PREFIX: &str = ":(exclude,top)";

/// Paths never worth sending to a model: lockfiles, build output, binaries.
const DEFAULT_EXCLUDES: &[&str] = &[
    // Lockfiles
    "go.sum",
    "go.work.sum",
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "coverage.out",
    // Build outputs
    "**/bin/",
    "**/build/",
    "**/dist/",
    "**/out/",
    "**/target/",
    "**/tmp/",
    "**/coverage/",
    "**/node_modules/",
    "**/.next/",
    "**/__pycache__/",
    "**/*.pyc",
    "**/.gradle/",
    "**/*.class",
    "**/obj/",
    // Editor and OS metadata
    "**/.DS_Store",
    "**/.idea/",
    "**/.vscode/",
    // Compiled artifacts and archives
    "**/*.exe",
    "**/*.dll",
    "**/*.so",
    "**/*.dylib",
    "**/*.a",
    "**/*.o",
    "**/*.rlib",
    "**/*.jar",
    "**/*.zip",
    "**/*.tar",
    "**/*.tgz",
    "**/*.gz",
    // Logs and swap files
    "**/*.log",
    "**/*.tmp",
    "**/*.swp",
];

/// Check that `git` is on PATH.
pub fn check_git_installed() -> Result<(), GitError> {
    which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
}

/// A git wrapper configured with diff settings and exclusions.
#[derive(Debug, Clone)]
pub struct GitCommand {
    options: GitOptions,
    workdir: Option<PathBuf>,
}

impl GitCommand {
    pub fn new(options: GitOptions) -> Self {
        Self {
            options,
            workdir: None,
        }
    }

    /// Run git in `dir` instead of the current directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// The staged diff, or `HEAD^..HEAD` when amending.
    ///
    /// Fails when nothing (outside the exclusions) is staged.
    pub fn diff_files(&self) -> Result<String, GitError> {
        let names = self.run(&self.diff_name_args())?;
        if names.is_empty() {
            return Err(GitError::NothingStaged);
        }
        debug!("Diffing files: {}", names.replace('\n', ", "));
        self.run(&self.diff_files_args())
    }

    /// Commit the staged changes with `message`, signed off.
    pub fn commit(&self, message: &str) -> Result<String, GitError> {
        let output = self.run(&self.commit_args(message))?;
        if output.is_empty() {
            return Err(GitError::NothingStaged);
        }
        Ok(output)
    }

    /// Stage `paths`.
    pub fn add<P: AsRef<str>>(&self, paths: &[P]) -> Result<String, GitError> {
        if paths.is_empty() {
            return Err(GitError::NoPaths);
        }
        let mut args = vec!["add".to_string()];
        args.extend(paths.iter().map(|p| p.as_ref().to_string()));
        self.run(&args)
    }

    fn excluded_pathspecs(&self) -> impl Iterator<Item = String> + '_ {
        DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(self.options.exclude_list.iter().map(String::as_str))
            .map(|pattern| format!("{}{}", EXCLUDE_PREFIX, pattern))
    }

    fn range_args(&self) -> Vec<String> {
        if self.options.amend {
            vec!["HEAD^".to_string(), "HEAD".to_string()]
        } else {
            vec!["--staged".to_string()]
        }
    }

    pub(crate) fn diff_name_args(&self) -> Vec<String> {
        let mut args = vec!["diff".to_string(), "--name-only".to_string()];
        args.extend(self.range_args());
        args.extend(self.excluded_pathspecs());
        args
    }

    pub(crate) fn diff_files_args(&self) -> Vec<String> {
        let mut args = vec![
            "diff".to_string(),
            "--ignore-all-space".to_string(),
            "--diff-algorithm=minimal".to_string(),
            format!("--unified={}", self.options.diff_unified),
        ];
        args.extend(self.range_args());
        args.extend(self.excluded_pathspecs());
        args
    }

    pub(crate) fn commit_args(&self, message: &str) -> Vec<String> {
        let mut args = vec![
            "commit".to_string(),
            "--signoff".to_string(),
            format!("--message={}", message),
        ];
        if self.options.amend {
            args.push("--amend".to_string());
        }
        args
    }

    /// Run git and return trimmed stdout, or an error carrying git's stderr.
    fn run(&self, args: &[String]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(GitError::SpawnFailed)?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
