use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_STEM: &str = "flake-tracker";
const EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Configuration file structure for flake-tracker.
///
/// Lets users keep the dashboard, board and token settings out of the
/// command line. Files are loaded from the current directory, the user
/// config directory or an explicit path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// TestGrid instance and dashboard
    #[serde(default)]
    pub testgrid: TestGridConfig,

    /// Project board holding the reported flakes
    #[serde(default)]
    pub github: GitHubConfig,

    /// Issue body parsing
    #[serde(default)]
    pub issues: IssuesConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestGridConfig {
    /// TestGrid base URL
    #[serde(default = "default_testgrid_base_url")]
    pub base_url: String,

    /// Dashboard to collect
    #[serde(default = "default_dashboard")]
    pub dashboard: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// Project board id
    #[serde(default = "default_board_id")]
    pub board_id: u64,

    /// Column ids to read; every column when empty
    #[serde(default)]
    pub columns: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IssuesConfig {
    /// Host of the dashboard links quoted in issue bodies
    #[serde(default = "default_link_host")]
    pub link_host: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Markdown,
    Csv,
    Json,
}

impl Default for TestGridConfig {
    fn default() -> Self {
        Self {
            base_url: default_testgrid_base_url(),
            dashboard: default_dashboard(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            board_id: default_board_id(),
            columns: Vec::new(),
        }
    }
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            link_host: default_link_host(),
        }
    }
}

fn default_testgrid_base_url() -> String {
    "https://testgrid.k8s.io".to_string()
}

fn default_dashboard() -> String {
    "sig-release-master-informing".to_string()
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_board_id() -> u64 {
    2_093_513
}

fn default_link_host() -> String {
    crate::flakes::DEFAULT_LINK_HOST.to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./flake-tracker.{toml,json,yaml,yml}
    /// 3. `<user config dir>/flake-tracker/flake-tracker.{toml,json,yaml,yml}`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let mut search_dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            search_dirs.push(config_dir.join(FILE_STEM));
        }

        match find_config(&search_dirs) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// First `flake-tracker.<ext>` found, scanning `dirs` in order.
fn find_config(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{FILE_STEM}.{ext}")))
        })
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.testgrid.base_url, "https://testgrid.k8s.io");
        assert_eq!(config.testgrid.dashboard, "sig-release-master-informing");
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert_eq!(config.github.board_id, 2_093_513);
        assert!(config.github.columns.is_empty());
        assert_eq!(config.issues.link_host, "testgrid.k8s.io");
        assert_eq!(config.output.format, OutputFormat::Summary);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[testgrid]
dashboard = "sig-release-master-blocking"

[github]
token = "ghp-test-token"
board-id = 42
columns = [1, 2]

[output]
format = "markdown"
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.testgrid.dashboard, "sig-release-master-blocking");
        assert_eq!(config.testgrid.base_url, "https://testgrid.k8s.io");
        assert_eq!(config.github.token, Some("ghp-test-token".to_string()));
        assert_eq!(config.github.board_id, 42);
        assert_eq!(config.github.columns, vec![1, 2]);
        assert_eq!(config.output.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "issues": {
    "link-host": "testgrid.example.com"
  },
  "output": {
    "format": "csv",
    "pretty": true
  }
}"#;
        write!(temp_file, "{json_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.issues.link_host, "testgrid.example.com");
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(
            temp_file,
            "testgrid:\n  base-url: http://localhost:8080\ngithub:\n  board-id: 7\n"
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.testgrid.base_url, "http://localhost:8080");
        assert_eq!(config.github.board_id, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = Config::load(Some(Path::new("nonexistent.toml"))).unwrap_err();
        assert!(err.to_string().contains("nonexistent.toml"));
    }

    #[test]
    fn test_find_config_respects_directory_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("flake-tracker.yaml"), "{}").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_config(&dirs),
            Some(second.path().join("flake-tracker.yaml"))
        );

        std::fs::write(first.path().join("flake-tracker.json"), "{}").unwrap();
        assert_eq!(
            find_config(&dirs),
            Some(first.path().join("flake-tracker.json"))
        );

        std::fs::write(first.path().join("flake-tracker.toml"), "").unwrap();
        assert_eq!(
            find_config(&dirs),
            Some(first.path().join("flake-tracker.toml"))
        );
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flake-tracker.toml");

        let mut config = Config::default();
        config.github.token = Some("ghp-saved".to_string());
        config.github.columns = vec![9];
        config.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("board-id = 2093513"));

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.github.token, Some("ghp-saved".to_string()));
        assert_eq!(loaded.github.columns, vec![9]);
    }
}
