use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::grid::{
  DEFAULT_WEEK_COUNT,
  clamp_week_count
};
use crate::calendar::height::LayoutMetrics;
use crate::datetime::parse_week_start;

pub const CONFIG_ENV_VAR: &str =
  "SPANBOARD_CONFIG";
const CONFIG_DIR_NAME: &str =
  "spanboard";
const CONFIG_FILE_NAME: &str =
  "calendar.toml";
const DEFAULT_ITEMS_PATH: &str =
  "~/.spanboard/items.jsonl";
const MIN_COLUMN_WIDTH: usize = 6;

#[derive(
  Debug, Clone, Deserialize, PartialEq,
)]
#[serde(default)]
pub struct CalendarConfig {
  pub timezone: Option<String>,
  pub grid:     GridConfig,
  pub layout:   LayoutMetrics,
  pub render:   RenderConfig,
  pub store:    StoreConfig,
  #[serde(skip)]
  pub source:   Option<PathBuf>
}

#[derive(
  Debug, Clone, Deserialize, PartialEq,
)]
#[serde(default)]
pub struct GridConfig {
  pub week_count: u32,
  pub week_start: String
}

#[derive(
  Debug, Clone, Deserialize, PartialEq,
)]
#[serde(default)]
pub struct RenderConfig {
  pub column_width: usize,
  pub color:        bool
}

#[derive(
  Debug, Clone, Deserialize, PartialEq,
)]
#[serde(default)]
pub struct StoreConfig {
  pub items: String
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      timezone: None,
      grid:     GridConfig::default(),
      layout:   LayoutMetrics::default(),
      render:   RenderConfig::default(),
      store:    StoreConfig::default(),
      source:   None
    }
  }
}

impl Default for GridConfig {
  fn default() -> Self {
    Self {
      week_count: DEFAULT_WEEK_COUNT,
      week_start: default_week_start()
    }
  }
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      column_width: 16,
      color:        true
    }
  }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      items: DEFAULT_ITEMS_PATH
        .to_string()
    }
  }
}

fn default_week_start() -> String {
  "sunday".to_string()
}

impl CalendarConfig {
  /// Loads the config from an explicit
  /// path, `SPANBOARD_CONFIG`, or the
  /// platform config dir, in that order.
  /// Only a missing discovered file falls
  /// back to defaults.
  #[tracing::instrument(skip(
    override_path
  ))]
  pub fn load(
    override_path: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = match resolve_config_path(
      override_path
    ) {
      | Some(path) => path,
      | None => {
        warn!(
          "no calendar config found; \
           using defaults"
        );
        return Ok(Self::default());
      }
    };

    info!(config = %path.display(), "loading calendar config");
    Self::from_file(&path)
  }

  pub fn from_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg.source = Some(path.to_path_buf());
    Ok(cfg)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<CalendarConfig>(
        text
      )?;
    cfg.sanitize();
    debug!(
      week_count = cfg.grid.week_count,
      week_start = %cfg.grid.week_start,
      timezone = ?cfg.timezone,
      "parsed calendar config"
    );
    Ok(cfg)
  }

  pub fn sanitize(&mut self) {
    let clamped = clamp_week_count(
      self.grid.week_count
    );
    if clamped != self.grid.week_count {
      warn!(
        configured = self.grid.week_count,
        clamped,
        "week_count out of range"
      );
      self.grid.week_count = clamped;
    }

    if parse_week_start(
      &self.grid.week_start
    )
    .is_none()
    {
      warn!(
        week_start = %self.grid.week_start,
        "unknown week_start; using sunday"
      );
      self.grid.week_start =
        default_week_start();
    }

    if self.render.column_width
      < MIN_COLUMN_WIDTH
    {
      self.render.column_width =
        MIN_COLUMN_WIDTH;
    }

    let defaults =
      LayoutMetrics::default();
    let layout = &mut self.layout;
    sanitize_length(
      &mut layout.cell_width,
      defaults.cell_width
    );
    sanitize_length(
      &mut layout.bar_height,
      defaults.bar_height
    );
    sanitize_length(
      &mut layout.min_row_height,
      defaults.min_row_height
    );
    if !layout.day_header_height.is_finite()
      || layout.day_header_height < 0.0
    {
      layout.day_header_height =
        defaults.day_header_height;
    }
    if !layout.bar_gap.is_finite()
      || layout.bar_gap < 0.0
    {
      layout.bar_gap = defaults.bar_gap;
    }

    if self
      .store
      .items
      .trim()
      .is_empty()
    {
      self.store.items =
        DEFAULT_ITEMS_PATH.to_string();
    }

    if let Some(tz) = &self.timezone
      && tz.trim().is_empty()
    {
      self.timezone = None;
    }
  }

  pub fn week_start(&self) -> Weekday {
    parse_week_start(
      &self.grid.week_start
    )
    .unwrap_or(Weekday::Sun)
  }

  pub fn items_path(&self) -> PathBuf {
    expand_tilde(Path::new(
      &self.store.items
    ))
  }
}

fn sanitize_length(
  value: &mut f64,
  fallback: f64
) {
  if !value.is_finite() || *value <= 0.0
  {
    *value = fallback;
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Some(candidate);
  }

  debug!(candidate = %candidate.display(), "default config not present");
  None
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

pub fn ensure_parent_dir(
  path: &Path
) -> anyhow::Result<()> {
  let Some(parent) = path.parent() else {
    return Err(anyhow!(
      "path has no parent: {}",
      path.display()
    ));
  };
  if parent.as_os_str().is_empty()
    || parent.exists()
  {
    return Ok(());
  }

  info!(dir = %parent.display(), "creating data directory");
  fs::create_dir_all(parent)
    .with_context(|| {
      format!(
        "failed to create {}",
        parent.display()
      )
    })
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::Weekday;
  use tempfile::NamedTempFile;

  use super::CalendarConfig;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg =
      CalendarConfig::from_toml("")
        .expect("parse empty");
    assert_eq!(cfg.grid.week_count, 6);
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert_eq!(
      cfg.render.column_width,
      16
    );
    assert!(cfg.timezone.is_none());
  }

  #[test]
  fn out_of_range_values_are_sanitized()
   {
    let cfg = CalendarConfig::from_toml(
      r#"
timezone = "  "

[grid]
week_count = 12
week_start = "friday"

[layout]
bar_height = -4.0
bar_gap = 3.5

[render]
column_width = 2
"#
    )
    .expect("parse config");

    assert_eq!(cfg.grid.week_count, 8);
    assert_eq!(
      cfg.grid.week_start,
      "sunday"
    );
    assert_eq!(cfg.layout.bar_height, 20.0);
    assert_eq!(cfg.layout.bar_gap, 3.5);
    assert_eq!(
      cfg.render.column_width,
      6
    );
    assert!(cfg.timezone.is_none());
  }

  #[test]
  fn loads_explicit_file() {
    let mut file = NamedTempFile::new()
      .expect("temp file");
    writeln!(
      file,
      "timezone = \"America/Mexico_City\"\n[grid]\nweek_start = \"monday\"\nweek_count = 5\n[store]\nitems = \"/tmp/board.jsonl\""
    )
    .expect("write config");

    let cfg = CalendarConfig::load(Some(
      file.path()
    ))
    .expect("load config");
    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
    assert_eq!(cfg.grid.week_count, 5);
    assert_eq!(
      cfg.items_path(),
      std::path::PathBuf::from(
        "/tmp/board.jsonl"
      )
    );
    assert_eq!(
      cfg.source.as_deref(),
      Some(file.path())
    );
  }

  #[test]
  fn invalid_explicit_file_is_an_error() {
    let mut file = NamedTempFile::new()
      .expect("temp file");
    writeln!(file, "[grid\nweek_count =")
      .expect("write config");
    assert!(
      CalendarConfig::load(Some(
        file.path()
      ))
      .is_err()
    );
  }
}
