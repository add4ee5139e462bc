//! Layout catalog.
//!
//! The [`LayoutCatalog`] holds three ordered lists:
//!
//! * user layouts: persisted, each optionally bound to Ctrl+Alt+key;
//! * the 25 quick positions: fixed, rebuilt identically on every start;
//! * app shortcuts: persisted, each with its own modifier set and key.
//!
//! plus the [`ExclusionList`] of process-name substrings.
//!
//! List order is externally visible: hotkey ids for layouts and apps are
//! derived from it.

use crate::hotkey::{KeyCode, Modifiers};

/// A named rectangle expressed as fractions of a monitor's work area.
///
/// `x + width` may exceed 1 (off-screen layouts are legal).
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Key bound together with Ctrl+Alt.
    pub hotkey: Option<KeyCode>,
}

impl Layout {
    pub fn new(name: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            width,
            height,
            hotkey: None,
        }
    }

    pub fn with_hotkey(mut self, key: KeyCode) -> Self {
        self.hotkey = Some(key);
        self
    }
}

/// A program launched by hotkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppShortcut {
    pub name: String,
    pub path: String,
    pub modifiers: Modifiers,
    pub hotkey: Option<KeyCode>,
}

impl AppShortcut {
    /// Modifier set assumed when none is stored.
    pub const DEFAULT_MODIFIERS: Modifiers = Modifiers::CTRL_ALT;

    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            modifiers: Self::DEFAULT_MODIFIERS,
            hotkey: None,
        }
    }
}

/// Ordered set of process-name substrings whose windows are left alone by
/// every "all windows" operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList(Vec<String>);

impl ExclusionList {
    /// Add `pattern` unless it is already present.  Returns whether it was
    /// added.
    pub fn add(&mut self, pattern: impl Into<String>) -> bool {
        let pattern = pattern.into();
        if pattern.is_empty() || self.0.contains(&pattern) {
            return false;
        }
        self.0.push(pattern);
        true
    }

    /// Whether `process_name` contains any listed substring (case-sensitive).
    pub fn matches(&self, process_name: &str) -> bool {
        self.0.iter().any(|p| process_name.contains(p.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Error from mutating the catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid name {0:?}: names may not be empty or contain '|' or line breaks")]
    InvalidName(String),
    #[error("invalid layout size {width}x{height}: both must be positive")]
    InvalidSize { width: f32, height: f32 },
    #[error("index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

fn check_field(value: &str) -> Result<(), CatalogError> {
    if value.is_empty() || value.contains(['|', '\n', '\r']) {
        return Err(CatalogError::InvalidName(value.to_string()));
    }
    Ok(())
}

//  Defaults

/// `(name, x, y, width, height)` of the default user layouts.
const DEFAULT_LAYOUTS: [(&str, f32, f32, f32, f32); 22] = [
    ("Left Half", 0.0, 0.0, 0.5, 1.0),
    ("Right Half", 0.5, 0.0, 0.5, 1.0),
    ("Top Half", 0.0, 0.0, 1.0, 0.5),
    ("Bottom Half", 0.0, 0.5, 1.0, 0.5),
    ("Top Left", 0.0, 0.0, 0.5, 0.5),
    ("Top Right", 0.5, 0.0, 0.5, 0.5),
    ("Bottom Left", 0.0, 0.5, 0.5, 0.5),
    ("Bottom Right", 0.5, 0.5, 0.5, 0.5),
    ("Left Third", 0.0, 0.0, 0.333, 1.0),
    ("Middle Third", 0.333, 0.0, 0.334, 1.0),
    ("Right Third", 0.667, 0.0, 0.333, 1.0),
    ("Top Third", 0.0, 0.0, 1.0, 0.333),
    ("Horizontal Middle Third", 0.0, 0.333, 1.0, 0.334),
    ("Bottom Third", 0.0, 0.667, 1.0, 0.333),
    ("Left Two Thirds", 0.0, 0.0, 0.667, 1.0),
    ("Right Two Thirds", 0.333, 0.0, 0.667, 1.0),
    ("Wide Center (70%)", 0.15, 0.0, 0.7, 1.0),
    ("Tall Center (70%)", 0.0, 0.15, 1.0, 0.7),
    ("Left Sidebar", 0.0, 0.0, 0.25, 1.0),
    ("Right Sidebar", 0.75, 0.0, 0.25, 1.0),
    ("Reading Center", 0.15, 0.1, 0.7, 0.8),
    ("Maximized", 0.0, 0.0, 1.0, 1.0),
];

/// Index of the full-work-area default layout.
pub const MAXIMIZED_LAYOUT: usize = 21;

/// The 25 quick positions, five conceptual rows of five.
const QUICK_POSITIONS: [(f32, f32, f32, f32); 25] = [
    // left-anchored: half, third, quarter, mid band, float
    (0.0, 0.0, 0.5, 1.0),
    (0.0, 0.0, 0.33, 1.0),
    (0.0, 0.0, 0.25, 1.0),
    (0.0, 0.2, 0.5, 0.6),
    (0.0, 0.1, 0.4, 0.8),
    // right-anchored mirrors
    (0.5, 0.0, 0.5, 1.0),
    (0.67, 0.0, 0.33, 1.0),
    (0.75, 0.0, 0.25, 1.0),
    (0.5, 0.2, 0.5, 0.6),
    (0.6, 0.1, 0.4, 0.8),
    // centered and floating
    (0.15, 0.1, 0.7, 0.8),
    (0.25, 0.25, 0.5, 0.5),
    (0.1, 0.1, 0.8, 0.8),
    (0.0, 0.0, 1.0, 1.0),
    (0.1, 0.1, 0.5, 0.5),
    // horizontal bands
    (0.0, 0.0, 1.0, 0.5),
    (0.0, 0.5, 1.0, 0.5),
    (0.0, 0.0, 1.0, 0.33),
    (0.0, 0.33, 1.0, 0.34),
    (0.0, 0.67, 1.0, 0.33),
    // quadrants and a centered ninth
    (0.0, 0.0, 0.5, 0.5),
    (0.5, 0.0, 0.5, 0.5),
    (0.0, 0.5, 0.5, 0.5),
    (0.5, 0.5, 0.5, 0.5),
    (0.33, 0.33, 0.33, 0.33),
];

/// Number of quick positions.
pub const QUICK_POSITION_COUNT: usize = QUICK_POSITIONS.len();

/// The default user layouts.
pub fn default_layouts() -> Vec<Layout> {
    DEFAULT_LAYOUTS
        .iter()
        .map(|&(name, x, y, w, h)| Layout::new(name, x, y, w, h))
        .collect()
}

/// The fixed quick-position set, named `"row.column"` (1-based).
pub fn quick_positions() -> Vec<Layout> {
    QUICK_POSITIONS
        .iter()
        .enumerate()
        .map(|(i, &(x, y, w, h))| Layout::new(format!("{}.{}", i / 5 + 1, i % 5 + 1), x, y, w, h))
        .collect()
}

//  Catalog

/// All layout, quick-position, app-shortcut and exclusion data.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCatalog {
    layouts: Vec<Layout>,
    quick: Vec<Layout>,
    apps: Vec<AppShortcut>,
    exclusions: ExclusionList,
}

impl Default for LayoutCatalog {
    /// Default layouts, no apps, no exclusions.
    fn default() -> Self {
        Self::new(default_layouts(), Vec::new(), ExclusionList::default())
    }
}

impl LayoutCatalog {
    pub fn new(layouts: Vec<Layout>, apps: Vec<AppShortcut>, exclusions: ExclusionList) -> Self {
        Self {
            layouts,
            quick: quick_positions(),
            apps,
            exclusions,
        }
    }

    //  Accessors

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn layout(&self, index: usize) -> Option<&Layout> {
        self.layouts.get(index)
    }

    pub fn quick_positions(&self) -> &[Layout] {
        &self.quick
    }

    pub fn apps(&self) -> &[AppShortcut] {
        &self.apps
    }

    pub fn app(&self, index: usize) -> Option<&AppShortcut> {
        self.apps.get(index)
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    //  Mutation

    /// Append a user layout.  Returns its index.
    pub fn add_layout(&mut self, layout: Layout) -> Result<usize, CatalogError> {
        check_field(&layout.name)?;
        if !(layout.width > 0.0 && layout.height > 0.0) {
            return Err(CatalogError::InvalidSize {
                width: layout.width,
                height: layout.height,
            });
        }
        self.layouts.push(layout);
        Ok(self.layouts.len() - 1)
    }

    /// Remove user layout `index`; later layouts shift down by one.
    pub fn remove_layout(&mut self, index: usize) -> Result<Layout, CatalogError> {
        if index >= self.layouts.len() {
            return Err(CatalogError::IndexOutOfRange {
                index,
                len: self.layouts.len(),
            });
        }
        Ok(self.layouts.remove(index))
    }

    /// Append an app shortcut.  Returns its index.
    pub fn add_app(&mut self, app: AppShortcut) -> Result<usize, CatalogError> {
        check_field(&app.name)?;
        check_field(&app.path)?;
        self.apps.push(app);
        Ok(self.apps.len() - 1)
    }

    pub fn remove_app(&mut self, index: usize) -> Result<AppShortcut, CatalogError> {
        if index >= self.apps.len() {
            return Err(CatalogError::IndexOutOfRange {
                index,
                len: self.apps.len(),
            });
        }
        Ok(self.apps.remove(index))
    }

    /// Add a process-name substring to the exclusion list.  Returns whether
    /// it was new.
    pub fn add_exclusion(&mut self, pattern: &str) -> Result<bool, CatalogError> {
        check_field(pattern)?;
        Ok(self.exclusions.add(pattern))
    }
}
