use crate::error::CatalogError;
use crate::model::AppRecord;
use std::fmt;
use std::path::PathBuf;

pub mod bundle;
pub mod desktop;
pub mod fallback;
pub mod windows;

/// Produces catalog records from one kind of install metadata.
///
/// Scans are best-effort: unreadable locations and malformed files are logged and skipped.
pub trait Source: Send + Sync {
    fn scan(&self) -> Result<Vec<AppRecord>, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl Os {
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => Os::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => f.write_str("linux"),
            Os::MacOs => f.write_str("macos"),
            Os::Windows => f.write_str("windows"),
            Os::Other(name) => f.write_str(name),
        }
    }
}

/// Picks the source for `os`, scanning its default locations followed by `extra_dirs`.
pub struct HostSource {
    os: Os,
    extra_dirs: Vec<PathBuf>,
    respect_no_display: bool,
}

impl HostSource {
    pub fn new(os: Os, extra_dirs: Vec<PathBuf>) -> Self {
        Self {
            os,
            extra_dirs,
            respect_no_display: false,
        }
    }

    /// Passed to the Linux source, see [`desktop::DesktopSource::respect_no_display`].
    pub fn respect_no_display(mut self, enabled: bool) -> Self {
        self.respect_no_display = enabled;
        self
    }

    fn dirs(&self, defaults: Vec<PathBuf>) -> Vec<PathBuf> {
        defaults.into_iter().chain(self.extra_dirs.iter().cloned()).collect()
    }
}

impl Source for HostSource {
    fn scan(&self) -> Result<Vec<AppRecord>, CatalogError> {
        match &self.os {
            Os::Linux => desktop::DesktopSource::new(self.dirs(desktop::default_dirs()))
                .respect_no_display(self.respect_no_display)
                .scan(),
            Os::MacOs => bundle::BundleSource::new(self.dirs(bundle::default_dirs())).scan(),
            Os::Windows => windows::WindowsSource::new(self.dirs(windows::default_dirs())).scan(),
            Os::Other(name) => Err(CatalogError::UnsupportedOs(name.clone())),
        }
    }
}
