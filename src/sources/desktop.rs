use crate::error::CatalogError;
use crate::model::{AppRecord, DEFAULT_CATEGORY, LaunchSpec};
use crate::sources::Source;
use directories::BaseDirs;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Placeholders for file and URL arguments, removed from `Exec` before launching.
const ARG_PLACEHOLDERS: [&str; 4] = ["%f", "%F", "%u", "%U"];

pub fn default_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        Path::new("/usr/share/applications").to_path_buf(),
        Path::new("/usr/local/share/applications").to_path_buf(),
    ];
    if let Some(base_dirs) = BaseDirs::new() {
        dirs.push(base_dirs.data_dir().join("applications"));
    }
    dirs
}

/// Linux source: `.desktop` entries under the XDG application directories.
pub struct DesktopSource {
    dirs: Vec<PathBuf>,
    respect_no_display: bool,
}

impl DesktopSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            respect_no_display: false,
        }
    }

    /// Only read the `[Desktop Entry]` group and skip `NoDisplay`/`Hidden` entries.
    pub fn respect_no_display(mut self, enabled: bool) -> Self {
        self.respect_no_display = enabled;
        self
    }
}

impl Source for DesktopSource {
    fn scan(&self) -> Result<Vec<AppRecord>, CatalogError> {
        let mut records = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() {
                debug!("Desktop directory {:?} does not exist, skipping", dir);
                continue;
            }
            debug!("Scanning desktop files in {:?}", dir);

            for entry in WalkDir::new(dir).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("DesktopSource: skipping unreadable entry under {:?}: {}", dir, e);
                        continue;
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|s| s.to_str()) != Some("desktop")
                {
                    continue;
                }

                let content = match fs::read_to_string(path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("DesktopSource: failed to read {:?}: {}", path, e);
                        continue;
                    }
                };
                let id = entry.file_name().to_string_lossy().to_string();
                match parse_desktop_file(&id, &content, self.respect_no_display) {
                    Some(record) => records.push(record),
                    None => debug!("DesktopSource: {:?} has no launchable entry", path),
                }
            }
        }

        info!("DesktopSource: found {} entries", records.len());
        Ok(records)
    }
}

/// Parses a desktop entry. Any file with a non-empty `Name` and `Exec` yields a record, and the
/// first occurrence of a key wins so `[Desktop Action]` groups never override the entry.
///
/// With `respect_no_display`, only the `[Desktop Entry]` group (and lines before any header) is
/// read, and entries marked `NoDisplay=true` or `Hidden=true` are dropped.
pub fn parse_desktop_file(id: &str, content: &str, respect_no_display: bool) -> Option<AppRecord> {
    let mut name = String::new();
    let mut comment = String::new();
    let mut exec = String::new();
    let mut icon = String::new();
    let mut category = DEFAULT_CATEGORY.to_string();
    let mut keywords = Vec::new();
    let mut hidden = false;
    let mut in_main_group = true;
    let mut seen = HashSet::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_main_group = line == "[Desktop Entry]";
            continue;
        }
        if respect_no_display && !in_main_group {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !seen.insert(key) {
            continue;
        }
        let value = value.trim();
        match key {
            "Name" => name = value.to_string(),
            "Comment" => comment = value.to_string(),
            "Exec" => exec = strip_placeholders(value),
            "Icon" => icon = value.to_string(),
            "Categories" => {
                if let Some(first) = value.split(';').next().filter(|c| !c.is_empty()) {
                    category = first.to_string();
                }
            }
            "Keywords" => {
                keywords = value
                    .split(';')
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "NoDisplay" | "Hidden" => hidden |= value == "true",
            _ => {}
        }
    }

    if (respect_no_display && hidden) || name.is_empty() || exec.is_empty() {
        return None;
    }

    let words = split_exec(&exec)
        .into_iter()
        .filter(|w| !is_field_code(w))
        .map(|w| w.replace("%%", "%"))
        .collect();
    let launch = LaunchSpec::from_words(words)?;

    let mut record = AppRecord::new(id.to_string(), name, exec, launch);
    record.description = comment;
    record.icon = icon;
    record.category = category;
    record.keywords = keywords;
    Some(record)
}

fn strip_placeholders(exec: &str) -> String {
    ARG_PLACEHOLDERS
        .iter()
        .fold(exec.to_string(), |acc, code| acc.replace(code, ""))
        .trim()
        .to_string()
}

fn is_field_code(word: &str) -> bool {
    word.len() == 2 && word.starts_with('%') && word != "%%"
}

/// Splits an `Exec` value into words. Double quotes group words; inside them a backslash
/// escapes the next character.
pub fn split_exec(exec: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = exec.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
