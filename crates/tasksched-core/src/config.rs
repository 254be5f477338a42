use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info
};

use crate::api::DEFAULT_API_URL;
use crate::datetime::DisplayZone;

pub const API_URL_ENV_VAR: &str =
  "TASKSCHED_API_URL";
const CONFIG_ENV_VAR: &str =
  "TASKSCHED_CONFIG";
const CONFIG_DIR_NAME: &str =
  "tasksched";
const CONFIG_FILE_NAME: &str =
  "config.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
  api:     ApiSection,
  display: DisplaySection
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ApiSection {
  url: Option<String>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DisplaySection {
  color:    Option<bool>,
  timezone: Option<String>
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub api_url:     String,
  pub color:       bool,
  pub timezone:    Option<String>,
  pub loaded_file: Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url:     DEFAULT_API_URL
        .to_string(),
      color:       true,
      timezone:    None,
      loaded_file: None
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    path_override
  ))]
  pub fn load(
    path_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let Some(path) =
      resolve_config_path(path_override)
    else {
      debug!(
        "no config file found; using \
         defaults"
      );
      return Ok(cfg);
    };

    info!(file = %path.display(), "loading config");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let file: ConfigFile =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;

    if let Some(url) = file.api.url {
      cfg.api_url = url;
    }
    if let Some(color) =
      file.display.color
    {
      cfg.color = color;
    }
    cfg.timezone =
      file.display.timezone;
    cfg.loaded_file = Some(path);

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      match key.as_str() {
        | "api.url" => {
          self.api_url = v
        }
        | "display.color" => {
          self.color = parse_bool(&v)
        }
        | "display.timezone" => {
          self.timezone = Some(v)
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }
    Ok(())
  }

  /// Applies `TASKSCHED_API_URL` when
  /// it is set and non-blank.
  pub fn apply_env(&mut self) {
    self.apply_api_url_env(
      std::env::var(API_URL_ENV_VAR)
        .ok()
    );
  }

  fn apply_api_url_env(
    &mut self,
    value: Option<String>
  ) {
    if let Some(url) = value
      .filter(|url| {
        !url.trim().is_empty()
      })
    {
      debug!(url = %url, "api url taken from environment");
      self.api_url = url;
    }
  }

  pub fn display_zone(
    &self
  ) -> anyhow::Result<DisplayZone> {
    DisplayZone::resolve(
      self.timezone.as_deref()
    )
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  candidate
    .exists()
    .then_some(candidate)
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
