use crate::error::CatalogError;
use crate::model::{AppRecord, LaunchSpec};
use crate::sources::Source;
use log::{debug, info, warn};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const LAUNCHABLE_EXTENSIONS: [&str; 2] = ["exe", "lnk"];

pub fn default_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from(r"C:\Program Files"),
        PathBuf::from(r"C:\Program Files (x86)"),
    ];
    for var in ["APPDATA", "ProgramData"] {
        if let Some(base) = env::var_os(var) {
            dirs.push(Path::new(&base).join(r"Microsoft\Windows\Start Menu\Programs"));
        }
    }
    dirs
}

/// Windows source: executables and shortcuts under the program and start menu folders.
pub struct WindowsSource {
    dirs: Vec<PathBuf>,
}

impl WindowsSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl Source for WindowsSource {
    fn scan(&self) -> Result<Vec<AppRecord>, CatalogError> {
        let mut records = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() {
                debug!("Program folder {:?} does not exist, skipping", dir);
                continue;
            }
            debug!("Scanning programs in {:?}", dir);

            for entry in WalkDir::new(dir) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        if let Some(record) = parse_program(entry.path()) {
                            records.push(record);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WindowsSource: skipping unreadable entry under {:?}: {}", dir, e)
                    }
                }
            }
        }

        info!("WindowsSource: found {} entries", records.len());
        Ok(records)
    }
}

fn is_launchable(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| LAUNCHABLE_EXTENSIONS.iter().any(|l| ext.eq_ignore_ascii_case(l)))
        .unwrap_or(false)
}

fn parse_program(path: &Path) -> Option<AppRecord> {
    if !is_launchable(path) {
        return None;
    }
    let name = path.file_stem()?.to_string_lossy().to_string();
    if name.is_empty() {
        return None;
    }

    let mut record = AppRecord::new(
        name.clone(),
        name.clone(),
        path.to_string_lossy().to_string(),
        LaunchSpec::Open(path.to_path_buf()),
    );
    record.icon = "🖥️".to_string();
    record.description = format!("Windows application: {}", name);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    #[test]
    fn extensions_match_case_insensitively() {
        assert!(is_launchable(Path::new("Tool.EXE")));
        assert!(is_launchable(Path::new("Shortcut.Lnk")));
        assert!(!is_launchable(Path::new("readme.txt")));
        assert!(!is_launchable(Path::new("exe")));
    }

    #[test]
    fn scan_recurses_into_program_folders() {
        let root = tempfile::tempdir().unwrap();
        let vendor = root.path().join("Vendor").join("bin");
        fs::create_dir_all(&vendor).unwrap();
        fs::write(vendor.join("Editor.exe"), b"MZ").unwrap();
        fs::write(root.path().join("Browser.LNK"), b"L").unwrap();
        fs::write(vendor.join("helper.dll"), b"MZ").unwrap();

        let records = WindowsSource::new(vec![root.path().to_path_buf()]).scan().unwrap();
        let names: HashSet<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["Editor", "Browser"]));

        let editor = records.iter().find(|r| r.id == "Editor").unwrap();
        assert_eq!(editor.description, "Windows application: Editor");
        assert_eq!(editor.launch, LaunchSpec::Open(vendor.join("Editor.exe")));
    }
}
