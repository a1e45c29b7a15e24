//! Configuration for bilirename.
//!
//! A [`Config`] is loaded once at startup and never mutated afterwards; the
//! pieces of it that the library needs are passed down explicitly.
//!
//! Sources are layered with [figment], later sources overriding earlier ones:
//!
//! 1. Built-in defaults (every key except `root` has one).
//! 2. A configuration file: either the one given explicitly, or the first of
//!    `bilirename.{toml,yaml,yml,json}` found in the working directory and
//!    then in the platform configuration directory.
//! 3. Environment variables prefixed with `BILIRENAME_`, using `__` to
//!    separate nested keys (`BILIRENAME_API__TIMEOUT_SECS=30`).
//! 4. Command-line [`Overrides`].
//!
//! ```toml
//! root = "/home/me/Videos/bilibili"
//! limit = "all"
//! template = "index-title-(yyyy-MM-dd-hh-mm-ss)"
//! window_size = 5
//! max_attempts = 3
//! utc_offset = "+08:00"
//!
//! [api]
//! timeout_secs = 10
//! ```

pub mod error;
mod limit;

pub use crate::limit::Limit;
use crate::error::{ErrorKind, Result};
use bilirename_api::ClientOptions;
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcOffset;
use time::macros::format_description;

pub const DEFAULT_TEMPLATE: &str = "index-title-(yyyy-MM-dd-hh-mm-ss)";
pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const ENV_PREFIX: &str = "BILIRENAME_";
const FILE_STEM: &str = "bilirename";
const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directory whose subdirectories are named by identifier.
    pub root: PathBuf,
    #[serde(default)]
    pub limit: Limit,
    #[serde(default = "default_template")]
    pub template: String,
    /// Identifiers resolved concurrently; the next window waits for the
    /// previous one to finish completely.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Only directories named entirely by ASCII digits are identifiers.
    #[serde(default = "default_true")]
    pub numeric_only: bool,
    /// Drop identifiers that never got a usable answer instead of aborting.
    #[serde(default)]
    pub skip_unresolved: bool,
    /// `+08:00` style offset used to render publish times. Local time when unset.
    #[serde(default)]
    pub utc_offset: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub referer: String,
    pub timeout_secs: u64,
}
impl Default for ApiConfig {
    fn default() -> Self {
        let options = ClientOptions::default();
        Self {
            endpoint: options.endpoint,
            user_agent: options.user_agent,
            referer: options.referer,
            timeout_secs: options.timeout.as_secs(),
        }
    }
}
impl ApiConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            endpoint: self.endpoint.clone(),
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}
fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_true() -> bool {
    true
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Loads, merges and validates every configuration layer.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::from_figment(Self::figment(file)?.merge(Serialized::defaults(overrides)))
    }

    /// Builds the figment for the file and environment layers.
    ///
    /// An explicit `file` must exist; otherwise discovery silently skips
    /// anything missing.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::new();
        let figment = match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                merge_file(figment, path)?
            },
            None => match Self::discover() {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "Using discovered configuration file");
                    merge_file(figment, &path)?
                },
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates a configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| exn::Exn::from(ErrorKind::Extract(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// First existing `bilirename.<ext>` in the working directory, then in
    /// the platform configuration directory.
    fn discover() -> Option<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];
        if let Some(project) = ProjectDirs::from("", "", FILE_STEM) {
            dirs.push(project.config_dir().to_path_buf());
        }
        dirs.into_iter()
            .flat_map(|dir| EXTENSIONS.map(|ext| dir.join(format!("{FILE_STEM}.{ext}"))))
            .find(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            exn::bail!(ErrorKind::Invalid {
                field: "root",
                reason: format!("must be an absolute path, got {}", self.root.display()),
            });
        }
        if self.template.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "template", reason: "must not be empty".to_string() });
        }
        if self.window_size == 0 {
            exn::bail!(ErrorKind::Invalid { field: "window_size", reason: "must be at least 1".to_string() });
        }
        if self.max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid { field: "max_attempts", reason: "must be at least 1".to_string() });
        }
        if self.api.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid { field: "api.timeout_secs", reason: "must be at least 1".to_string() });
        }
        self.utc_offset()?;
        Ok(())
    }

    /// The configured offset, or `None` when local time should be used.
    pub fn utc_offset(&self) -> Result<Option<UtcOffset>> {
        self.utc_offset.as_deref().map(parse_offset).transpose()
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match ext.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

fn parse_offset(s: &str) -> Result<UtcOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(s, format_description!("[offset_hour sign:mandatory]:[offset_minute]")).map_err(|e| {
        exn::Exn::from(ErrorKind::Invalid { field: "utc_offset", reason: format!("{s}: {e}") })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::num::NonZeroUsize;

    fn root() -> PathBuf {
        std::env::temp_dir()
    }

    fn minimal() -> Figment {
        Figment::from(Serialized::defaults(Overrides { root: Some(root()), ..Overrides::default() }))
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_figment(minimal()).unwrap();
        assert_eq!(config.root, root());
        assert_eq!(config.limit, Limit::All);
        assert_eq!(config.template, "index-title-(yyyy-MM-dd-hh-mm-ss)");
        assert_eq!(config.window_size, 5);
        assert_eq!(config.max_attempts, 3);
        assert!(config.numeric_only);
        assert!(!config.skip_unresolved);
        assert_eq!(config.utc_offset().unwrap(), None);
        assert_eq!(config.api.client_options(), ClientOptions::default());
    }

    #[test]
    fn test_root_is_required() {
        let err = Config::from_figment(Figment::new()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extract(_)));
    }

    #[rstest]
    #[case(Overrides { window_size: Some(0), ..Overrides::default() }, "window_size")]
    #[case(Overrides { max_attempts: Some(0), ..Overrides::default() }, "max_attempts")]
    #[case(Overrides { template: Some("  ".to_string()), ..Overrides::default() }, "template")]
    #[case(Overrides { root: Some(PathBuf::from("relative")), ..Overrides::default() }, "root")]
    fn test_rejects_invalid_values(#[case] overrides: Overrides, #[case] expected: &str) {
        let err = Config::from_figment(minimal().merge(Serialized::defaults(overrides))).unwrap_err();
        match &*err {
            ErrorKind::Invalid { field, .. } => assert_eq!(*field, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case("+08:00", Some(UtcOffset::from_hms(8, 0, 0).unwrap()))]
    #[case("-05:30", Some(UtcOffset::from_hms(-5, -30, 0).unwrap()))]
    #[case("UTC", Some(UtcOffset::UTC))]
    #[case("z", Some(UtcOffset::UTC))]
    #[case("08:00", None)]
    #[case("tomorrow", None)]
    fn test_parse_offset(#[case] input: &str, #[case] expected: Option<UtcOffset>) {
        assert_eq!(parse_offset(input).ok(), expected);
    }

    #[test]
    fn test_file_env_and_override_layers() {
        Jail::expect_with(|jail| {
            let root = jail.directory().to_path_buf();
            jail.create_file(
                "settings.toml",
                &format!(
                    "root = {root:?}\nlimit = 10\nwindow_size = 2\ntemplate = \"title\"\n[api]\ntimeout_secs = 30\n"
                ),
            )?;
            jail.set_env("BILIRENAME_WINDOW_SIZE", "4");
            jail.set_env("BILIRENAME_API__REFERER", "https://example.com/");
            let overrides = Overrides { template: Some("index-title".to_string()), ..Overrides::default() };
            let config = Config::load(Some(Path::new("settings.toml")), &overrides).unwrap();
            assert_eq!(config.root, root);
            assert_eq!(config.limit, Limit::First(NonZeroUsize::new(10).unwrap()));
            assert_eq!(config.window_size, 4);
            assert_eq!(config.template, "index-title");
            assert_eq!(config.api.timeout_secs, 30);
            assert_eq!(config.api.referer, "https://example.com/");
            Ok(())
        });
    }

    #[test]
    fn test_discovers_yaml_in_working_directory() {
        Jail::expect_with(|jail| {
            let root = jail.directory().display().to_string();
            jail.create_file("bilirename.yaml", &format!("root: '{root}'\nlimit: all\nmax_attempts: 5\n"))?;
            let config = Config::load(None, &Overrides::default()).unwrap();
            assert_eq!(config.max_attempts, 5);
            assert_eq!(config.limit, Limit::All);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let err = Config::figment(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_explicit_file_must_have_known_format() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = Config::figment(Some(file.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }
}
