use crate::error::PreferenceError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, io::ErrorKind, path::PathBuf};
use tracing::{debug, info};

/// How much detail KPI cards show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Compact,
    Detailed,
}

impl ActiveView {
    pub fn next(&self) -> ActiveView {
        match self {
            ActiveView::Compact => ActiveView::Detailed,
            ActiveView::Detailed => ActiveView::Compact,
        }
    }
}

impl fmt::Display for ActiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveView::Compact => write!(f, "compact"),
            ActiveView::Detailed => write!(f, "detailed"),
        }
    }
}

/// Which KPI groups are shown, expanded and in what order. Persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KpiPreferences {
    /// Groups to show. Empty means every group is visible.
    pub visible_groups: Vec<SmolStr>,
    pub expanded_groups: Vec<SmolStr>,
    pub active_view: ActiveView,
    pub group_order: Vec<SmolStr>,
}

impl KpiPreferences {
    pub fn is_visible(&self, group: &str) -> bool {
        self.visible_groups.is_empty() || self.visible_groups.iter().any(|g| g == group)
    }

    pub fn is_expanded(&self, group: &str) -> bool {
        self.expanded_groups.iter().any(|g| g == group)
    }

    /// Make sure every group in `groups` is known: unknown groups are appended to the order
    /// and start visible and expanded. Returns whether anything changed.
    pub fn reconcile(&mut self, groups: &[SmolStr]) -> bool {
        let mut changed = false;
        for group in groups {
            if self.group_order.contains(group) {
                continue;
            }
            self.group_order.push(group.clone());
            if !self.visible_groups.is_empty() {
                self.visible_groups.push(group.clone());
            }
            if !self.expanded_groups.contains(group) {
                self.expanded_groups.push(group.clone());
            }
            changed = true;
        }
        changed
    }

    /// Show or hide `group` among `all_groups`. Hiding from the "everything visible" state
    /// materialises the visible list first.
    pub fn toggle_visible(&mut self, group: &str, all_groups: &[SmolStr]) {
        if self.visible_groups.is_empty() {
            self.visible_groups = all_groups.to_vec();
        }

        match self.visible_groups.iter().position(|g| g == group) {
            Some(index) => {
                self.visible_groups.remove(index);
            }
            None => self.visible_groups.push(SmolStr::new(group)),
        }

        // Everything visible again collapses back to the empty form
        if all_groups.iter().all(|g| self.visible_groups.contains(g))
            && self.visible_groups.len() == all_groups.len()
        {
            self.visible_groups.clear();
        }
    }

    pub fn toggle_expanded(&mut self, group: &str) {
        match self.expanded_groups.iter().position(|g| g == group) {
            Some(index) => {
                self.expanded_groups.remove(index);
            }
            None => self.expanded_groups.push(SmolStr::new(group)),
        }
    }

    pub fn cycle_view(&mut self) {
        self.active_view = self.active_view.next();
    }

    /// Move `group` by `delta` positions within `group_order`, clamped to the ends.
    pub fn move_group(&mut self, group: &str, delta: isize) {
        let index = match self.group_order.iter().position(|g| g == group) {
            Some(index) => index,
            None => {
                self.group_order.push(SmolStr::new(group));
                self.group_order.len() - 1
            }
        };

        let last = self.group_order.len() as isize - 1;
        let target = (index as isize + delta).clamp(0, last) as usize;
        let moved = self.group_order.remove(index);
        self.group_order.insert(target, moved);
    }
}

/// Storage collaborator for [`KpiPreferences`].
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<KpiPreferences, PreferenceError>;

    fn save(&self, prefs: &KpiPreferences) -> Result<(), PreferenceError>;
}

/// Preferences stored as pretty printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PreferenceStore for JsonFileStore {
    /// A missing file yields the default preferences.
    fn load(&self) -> Result<KpiPreferences, PreferenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                debug!(path = %self.path.display(), "loaded KPI preferences");
                Ok(serde_json::from_str(&contents)?)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no KPI preferences yet, using defaults");
                Ok(KpiPreferences::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn save(&self, prefs: &KpiPreferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(prefs)?)?;
        debug!(path = %self.path.display(), "saved KPI preferences");
        Ok(())
    }
}

/// In-memory store, for tests and for running without a preference file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    prefs: Mutex<Option<KpiPreferences>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<KpiPreferences> {
        self.prefs.lock().clone()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<KpiPreferences, PreferenceError> {
        Ok(self.prefs.lock().clone().unwrap_or_default())
    }

    fn save(&self, prefs: &KpiPreferences) -> Result<(), PreferenceError> {
        *self.prefs.lock() = Some(prefs.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<SmolStr> {
        names.iter().map(|name| SmolStr::new(name)).collect()
    }

    #[test]
    fn test_toggle_visible_materialises_and_collapses() {
        let all = groups(&["price", "volume", "volatility"]);
        let mut prefs = KpiPreferences::default();
        assert!(prefs.is_visible("volume"));

        prefs.toggle_visible("volume", &all);
        assert!(!prefs.is_visible("volume"));
        assert!(prefs.is_visible("price"));
        assert_eq!(prefs.visible_groups, groups(&["price", "volatility"]));

        prefs.toggle_visible("volume", &all);
        assert!(prefs.visible_groups.is_empty());
        assert!(prefs.is_visible("volume"));
    }

    #[test]
    fn test_toggle_expanded_and_cycle_view() {
        let mut prefs = KpiPreferences::default();
        prefs.toggle_expanded("price");
        assert!(prefs.is_expanded("price"));
        prefs.toggle_expanded("price");
        assert!(!prefs.is_expanded("price"));

        prefs.cycle_view();
        assert_eq!(prefs.active_view, ActiveView::Detailed);
        prefs.cycle_view();
        assert_eq!(prefs.active_view, ActiveView::Compact);
    }

    #[test]
    fn test_move_group() {
        let mut prefs = KpiPreferences {
            group_order: groups(&["a", "b", "c"]),
            ..Default::default()
        };

        prefs.move_group("c", -1);
        assert_eq!(prefs.group_order, groups(&["a", "c", "b"]));
        prefs.move_group("a", -5);
        assert_eq!(prefs.group_order, groups(&["a", "c", "b"]));
        prefs.move_group("a", 10);
        assert_eq!(prefs.group_order, groups(&["c", "b", "a"]));
        prefs.move_group("d", -1);
        assert_eq!(prefs.group_order, groups(&["c", "b", "d", "a"]));
    }

    #[test]
    fn test_reconcile() {
        let mut prefs = KpiPreferences::default();
        assert!(prefs.reconcile(&groups(&["price", "volume"])));
        assert_eq!(prefs.group_order, groups(&["price", "volume"]));
        assert!(prefs.is_expanded("volume"));
        assert!(!prefs.reconcile(&groups(&["volume"])));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let prefs = KpiPreferences {
            visible_groups: groups(&["price"]),
            expanded_groups: Vec::new(),
            active_view: ActiveView::Detailed,
            group_order: groups(&["price", "volume"]),
        };

        assert_eq!(
            serde_json::to_value(&prefs).unwrap(),
            serde_json::json!({
                "visibleGroups": ["price"],
                "expandedGroups": [],
                "activeView": "detailed",
                "groupOrder": ["price", "volume"],
            })
        );
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("chartdeck-prefs-{}", std::process::id()));
        let store = JsonFileStore::new(dir.join("nested").join("prefs.json"));

        assert_eq!(store.load().unwrap(), KpiPreferences::default());

        let mut prefs = KpiPreferences::default();
        prefs.reconcile(&groups(&["price"]));
        prefs.cycle_view();
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let path = std::env::temp_dir().join(format!("chartdeck-garbage-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(PreferenceError::Json(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), KpiPreferences::default());
        let prefs = KpiPreferences {
            active_view: ActiveView::Detailed,
            ..Default::default()
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.saved(), Some(prefs));
    }
}
