//! Nebula project layout and config-file editing.
//!
//! A project is a composer-managed WordPress checkout with core in `web/wp`,
//! content in `web/app`, and Bedrock-style config under `config/`. All file
//! edits here are line-oriented: values are replaced in place, and new config
//! is inserted after a marker line rather than rewriting whole files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A Nebula/Bedrock website checkout rooted at a directory.
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// A project rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project in the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn current() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        Ok(Self::at(cwd))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// WordPress core directory (`web/wp`).
    #[must_use]
    pub fn core_dir(&self) -> PathBuf {
        self.root.join("web").join("wp")
    }

    #[must_use]
    pub fn themes_dir(&self) -> PathBuf {
        self.root.join("web").join("app").join("themes")
    }

    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("web").join("app").join("uploads")
    }

    #[must_use]
    pub fn env_path(&self) -> PathBuf {
        self.root.join(".env")
    }

    #[must_use]
    pub fn htaccess_path(&self) -> PathBuf {
        self.root.join("web").join(".htaccess")
    }

    #[must_use]
    pub fn gitignore_path(&self) -> PathBuf {
        self.root.join(".gitignore")
    }

    #[must_use]
    pub fn config_includes_dir(&self) -> PathBuf {
        self.root.join("config").join("includes")
    }

    /// Read a single value from the project `.env` file.
    ///
    /// Returns `Ok(None)` when the file or the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn env_value(&self, key: &str) -> Result<Option<String>> {
        let path = self.env_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        Ok(content.lines().find_map(|line| parse_env_line(line, key)))
    }

    /// Set a value in the project `.env` file, replacing the existing entry
    /// or appending a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn set_env_value(&self, key: &str, value: &str) -> Result<()> {
        let path = self.env_path();
        let content = if path.exists() {
            std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };
        let updated = upsert_env_line(&content, key, value);
        std::fs::write(&path, updated).with_context(|| format!("write {}", path.display()))
    }

    /// The site's canonical base URL, from `WP_HOME` in `.env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `.env` is unreadable or has no `WP_HOME` entry.
    pub fn home_url(&self) -> Result<String> {
        self.env_value("WP_HOME")?
            .ok_or_else(|| anyhow::anyhow!("WP_HOME is not set in {}", self.env_path().display()))
    }

    /// Append `entry` to `.gitignore` unless an identical line already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn ensure_gitignored(&self, entry: &str) -> Result<()> {
        let path = self.gitignore_path();
        let mut content = if path.exists() {
            std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(entry);
        content.push('\n');
        std::fs::write(&path, content).with_context(|| format!("write {}", path.display()))
    }

    /// Write a Bedrock config include to `config/includes/<filename>`.
    ///
    /// The file gets the standard Nebula preamble; `body` supplies the
    /// `Config::define` lines.
    ///
    /// # Errors
    ///
    /// Returns an error if `filename` is not a plain lowercase `.php` name or
    /// the file cannot be written.
    pub fn add_config_include(&self, filename: &str, body: &str) -> Result<()> {
        anyhow::ensure!(
            is_valid_include_name(filename),
            "invalid config include name: {filename}"
        );
        let dir = self.config_includes_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

        let mut content = String::from(
            "<?php\n\nnamespace Eighteen73\\Nebula;\n\nuse Roots\\WPConfig\\Config;\n\n",
        );
        content.push_str(body.trim());
        content.push('\n');

        let path = dir.join(filename);
        std::fs::write(&path, content).with_context(|| format!("write {}", path.display()))
    }

    /// Replace the rules between `# BEGIN WordPress` / `# END WordPress` in
    /// `web/.htaccess`, appending a fresh block when the markers are absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn replace_htaccess_rules(&self, rules: &str) -> Result<()> {
        let path = self.htaccess_path();
        let content = if path.exists() {
            std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };
        let updated = replace_wordpress_block(&content, rules);
        std::fs::write(&path, updated).with_context(|| format!("write {}", path.display()))
    }
}

/// Insert `block` into the file after the first line containing `marker`.
///
/// # Errors
///
/// Returns an error if the marker is absent or the file cannot be read or
/// written.
pub fn insert_after_marker(path: &Path, marker: &str, block: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let updated = insert_block_after_marker(&content, marker, block)
        .with_context(|| format!("no line containing {marker:?} in {}", path.display()))?;
    std::fs::write(path, updated).with_context(|| format!("write {}", path.display()))
}

/// Whether the file contains `needle` anywhere.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_contains(path: &Path, needle: &str) -> Result<bool> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(content.contains(needle))
}

// ── Line-oriented editing primitives ──────────────────────────────────────────

/// Extract the value of `key` from one `.env` line, stripping optional quotes.
fn parse_env_line(line: &str, key: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix(key)?;
    let value = rest.strip_prefix('=')?.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some(value.to_string())
}

/// Replace the first `KEY=` line with `KEY="value"`, or append one.
fn upsert_env_line(content: &str, key: &str, value: &str) -> String {
    let entry = format!("{key}=\"{value}\"");
    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !replaced && line.trim_start().starts_with(&format!("{key}=")) {
                replaced = true;
                entry.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(entry);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Insert `block` after the first line containing `marker`.
/// Returns `None` when no line matches.
fn insert_block_after_marker(content: &str, marker: &str, block: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len() + block.len() + 2);
    let mut inserted = false;
    for line in content.lines() {
        out.push_str(line);
        out.push('\n');
        if !inserted && line.contains(marker) {
            out.push_str(block.trim_end());
            out.push('\n');
            inserted = true;
        }
    }
    inserted.then_some(out)
}

/// Swap the body of the `# BEGIN WordPress` block for `rules`, or append a
/// whole new block when the markers are missing.
fn replace_wordpress_block(content: &str, rules: &str) -> String {
    const BEGIN: &str = "# BEGIN WordPress";
    const END: &str = "# END WordPress";

    let block = format!("{BEGIN}\n{}\n{END}\n", rules.trim_end());

    let Some(start) = content.find(BEGIN) else {
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
        return out;
    };

    let after_start = &content[start..];
    let end = after_start
        .find(END)
        .map_or(content.len(), |idx| start + idx + END.len());

    let mut out = String::with_capacity(content.len() + rules.len());
    out.push_str(&content[..start]);
    out.push_str(block.trim_end());
    out.push_str(&content[end..]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Config include filenames must be plain lowercase `.php` names.
fn is_valid_include_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".php") else {
        return false;
    };
    !stem.is_empty()
        && stem
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
