use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::calendar::host::{DateCommit, ItemSource, item_touches};
use crate::config::ensure_parent_dir;
use crate::item::{DateRange, Item, ItemId};

/// File-backed card collection, one JSON object per line.
#[derive(Debug, Clone)]
pub struct ItemStore {
    pub items_path: PathBuf,
}

impl ItemStore {
    #[tracing::instrument(skip(items_path))]
    pub fn open(items_path: &Path) -> anyhow::Result<Self> {
        let items_path = items_path.to_path_buf();
        ensure_parent_dir(&items_path)?;

        if !items_path.exists() {
            fs::write(&items_path, "")
                .with_context(|| format!("failed to create {}", items_path.display()))?;
        }

        info!(items = %items_path.display(), "opened item store");
        Ok(Self { items_path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_items(&self) -> anyhow::Result<Vec<Item>> {
        load_jsonl(&self.items_path)
            .with_context(|| format!("failed to load {}", self.items_path.display()))
    }

    #[tracing::instrument(skip(self, items))]
    pub fn save_items(&self, items: &[Item]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.items_path, items)
            .with_context(|| format!("failed to save {}", self.items_path.display()))
    }

    pub fn find(&self, id: ItemId) -> anyhow::Result<Item> {
        self.load_items()?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| anyhow!("item not found: {id}"))
    }

    /// Writes a committed range back onto its card. Both bounds are stored,
    /// so a card that only had one date becomes an explicit range.
    #[tracing::instrument(skip(self, commit), fields(item = %commit.item_id))]
    pub fn apply_commit(&self, commit: &DateCommit) -> anyhow::Result<Item> {
        let mut items = self.load_items()?;
        let item = items
            .iter_mut()
            .find(|item| item.id == commit.item_id)
            .ok_or_else(|| anyhow!("item not found: {}", commit.item_id))?;

        item.start_date = Some(commit.new_start);
        item.end_date = Some(commit.new_end);
        let updated = item.clone();

        self.save_items(&items)?;
        info!(
            start = %commit.new_start,
            end = %commit.new_end,
            kind = ?commit.kind,
            "persisted date change"
        );
        Ok(updated)
    }
}

impl ItemSource for ItemStore {
    fn list_items_for_visible_range(&self, range: DateRange) -> anyhow::Result<Vec<Item>> {
        let items = self.load_items()?;
        let total = items.len();
        let visible = items
            .into_iter()
            .filter(|item| item_touches(item, range))
            .collect::<Vec<_>>();
        debug!(total, visible = visible.len(), range = %range, "listed items for range");
        Ok(visible)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Item>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: Item = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded items from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic(path: &Path, items: &[Item]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
