//! Catalog file: settings, layouts, app shortcuts and exclusions.
//!
//! # Format
//!
//! Line oriented, pipe delimited, record type in the first field:
//!
//! ```text
//! S|sounds|animations|tray|margin|transparency|logging|autostart
//! L|name|x|y|width|height|hotkey
//! A|name|path|modifier|hotkey
//! E|processNameSubstring
//! ```
//!
//! Booleans are `1`/`0`; `hotkey` is a virtual key code with `0` meaning
//! unbound; `modifier` is the integer form of [`Modifiers`].  The older
//! `A|name|path|hotkey` record is still accepted and gets the default
//! Ctrl+Alt modifier set.  Unknown record types and blank lines are skipped.

use crate::catalog::{AppShortcut, ExclusionList, Layout, LayoutCatalog};
use crate::hotkey::{KeyCode, Modifiers};
use log::debug;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Persisted user preferences (the `S` record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Play cues on game-mode transitions.
    pub sounds: bool,
    /// Animate placements.
    pub animations: bool,
    /// Show a tray icon (kept for the settings front end).
    pub tray_icon: bool,
    /// Inset applied to every computed rectangle, in device units.
    pub margin: i32,
    /// Alpha used by the transparency toggle.
    pub transparency: u8,
    /// Log at info level when `RUST_LOG` is unset.
    pub logging: bool,
    /// Start with the user session (kept for the settings front end).
    pub autostart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sounds: true,
            animations: true,
            tray_icon: true,
            margin: 6,
            transparency: 180,
            logging: false,
            autostart: false,
        }
    }
}

/// Everything stored in the catalog file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFile {
    pub settings: Settings,
    pub catalog: LayoutCatalog,
}

/// Error from reading or writing a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl StoreError {
    /// Whether the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

//  Parsing

fn field<T: FromStr>(fields: &[&str], i: usize, what: &str) -> Result<T, String> {
    let raw = fields.get(i).ok_or_else(|| format!("missing {}", what))?;
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {} {:?}", what, raw))
}

fn flag(fields: &[&str], i: usize, what: &str) -> Result<bool, String> {
    match fields.get(i).map(|s| s.trim()) {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        Some(other) => Err(format!("invalid {} {:?}", what, other)),
        None => Err(format!("missing {}", what)),
    }
}

fn key(fields: &[&str], i: usize) -> Result<Option<KeyCode>, String> {
    let code: u32 = field(fields, i, "hotkey")?;
    Ok((code != 0).then_some(KeyCode(code)))
}

fn expect_len(fields: &[&str], n: usize) -> Result<(), String> {
    if fields.len() != n {
        return Err(format!("expected {} fields, got {}", n, fields.len()));
    }
    Ok(())
}

fn parse_settings(f: &[&str]) -> Result<Settings, String> {
    expect_len(f, 8)?;
    Ok(Settings {
        sounds: flag(f, 1, "sounds")?,
        animations: flag(f, 2, "animations")?,
        tray_icon: flag(f, 3, "tray")?,
        margin: field(f, 4, "margin")?,
        transparency: field(f, 5, "transparency")?,
        logging: flag(f, 6, "logging")?,
        autostart: flag(f, 7, "autostart")?,
    })
}

fn parse_layout(f: &[&str]) -> Result<Layout, String> {
    expect_len(f, 7)?;
    let layout = Layout {
        name: f[1].to_string(),
        x: field(f, 2, "x")?,
        y: field(f, 3, "y")?,
        width: field(f, 4, "width")?,
        height: field(f, 5, "height")?,
        hotkey: key(f, 6)?,
    };
    if !(layout.width > 0.0 && layout.height > 0.0) {
        return Err(format!("layout {:?} has an empty size", layout.name));
    }
    Ok(layout)
}

fn parse_app(f: &[&str]) -> Result<AppShortcut, String> {
    match f.len() {
        5 => {
            let bits: u32 = field(f, 3, "modifier")?;
            Ok(AppShortcut {
                name: f[1].to_string(),
                path: f[2].to_string(),
                modifiers: Modifiers::from_bits_truncate(bits),
                hotkey: key(f, 4)?,
            })
        }
        4 => Ok(AppShortcut {
            name: f[1].to_string(),
            path: f[2].to_string(),
            modifiers: AppShortcut::DEFAULT_MODIFIERS,
            hotkey: key(f, 3)?,
        }),
        n => Err(format!("expected 4 or 5 fields, got {}", n)),
    }
}

impl CatalogFile {
    /// Parse the catalog text.
    ///
    /// A missing `S` record leaves [`Settings::default`] in place.  An empty
    /// layout list is returned as-is; [`load_or_default`] is where defaults
    /// are filled in.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut settings = Settings::default();
        let mut layouts = Vec::new();
        let mut apps = Vec::new();
        let mut exclusions = ExclusionList::default();

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('|').collect();
            let result = match fields[0] {
                "S" => parse_settings(&fields).map(|s| settings = s),
                "L" => parse_layout(&fields).map(|l| layouts.push(l)),
                "A" => parse_app(&fields).map(|a| apps.push(a)),
                "E" => expect_len(&fields, 2).map(|()| {
                    exclusions.add(fields[1]);
                }),
                other => {
                    debug!("skipping unknown record {:?} on line {}", other, n + 1);
                    Ok(())
                }
            };
            result.map_err(|reason| StoreError::Malformed { line: n + 1, reason })?;
        }

        Ok(Self {
            settings,
            catalog: LayoutCatalog::new(layouts, apps, exclusions),
        })
    }

    /// Render the catalog text.
    pub fn render(&self) -> String {
        let s = &self.settings;
        let b = |v: bool| if v { 1 } else { 0 };
        let mut out = String::new();
        let _ = writeln!(
            out,
            "S|{}|{}|{}|{}|{}|{}|{}",
            b(s.sounds),
            b(s.animations),
            b(s.tray_icon),
            s.margin,
            s.transparency,
            b(s.logging),
            b(s.autostart)
        );
        for l in self.catalog.layouts() {
            let _ = writeln!(
                out,
                "L|{}|{}|{}|{}|{}|{}",
                l.name,
                l.x,
                l.y,
                l.width,
                l.height,
                l.hotkey.map_or(0, |k| k.0)
            );
        }
        for a in self.catalog.apps() {
            let _ = writeln!(
                out,
                "A|{}|{}|{}|{}",
                a.name,
                a.path,
                a.modifiers.bits(),
                a.hotkey.map_or(0, |k| k.0)
            );
        }
        for e in self.catalog.exclusions().iter() {
            let _ = writeln!(out, "E|{}", e);
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Write the file, replacing any previous contents.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// How [`load_or_default`] obtained its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The file had no layouts; defaults were added and written back.
    Seeded,
    /// The file could not be used; defaults are in memory only.
    Defaulted,
}

/// Load the catalog file, falling back to defaults.
///
/// A missing file or one without layouts is (re)written with defaults.  A
/// malformed or unreadable file is left untouched so that a hand edit is
/// not lost; the returned defaults live in memory only.
pub fn load_or_default(path: &Path) -> (CatalogFile, LoadOutcome) {
    match CatalogFile::load(path) {
        Ok(file) if !file.catalog.layouts().is_empty() => (file, LoadOutcome::Loaded),
        Ok(file) => {
            let seeded = CatalogFile {
                settings: file.settings,
                catalog: LayoutCatalog::new(
                    crate::catalog::default_layouts(),
                    file.catalog.apps().to_vec(),
                    file.catalog.exclusions().clone(),
                ),
            };
            write_seed(&seeded, path);
            (seeded, LoadOutcome::Seeded)
        }
        Err(e) if e.is_not_found() => {
            let seeded = CatalogFile::default();
            write_seed(&seeded, path);
            (seeded, LoadOutcome::Seeded)
        }
        Err(e) => {
            log::warn!("cannot use {} ({}), using defaults", path.display(), e);
            (CatalogFile::default(), LoadOutcome::Defaulted)
        }
    }
}

fn write_seed(file: &CatalogFile, path: &Path) {
    match file.save(path) {
        Ok(()) => log::info!("wrote default layouts to {}", path.display()),
        Err(e) => log::warn!("could not write {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_layouts;

    #[test]
    fn legacy_app_record_gets_default_modifier() {
        let file = CatalogFile::parse("A|Notes|C:\\Notes.exe|74\n").unwrap();
        let app = &file.catalog.apps()[0];
        assert_eq!(app.hotkey, Some(KeyCode(74)));
        assert_eq!(app.modifiers, Modifiers::CTRL_ALT);
        assert_eq!(app.path, "C:\\Notes.exe");
    }

    #[test]
    fn app_record_with_modifier_field() {
        let file = CatalogFile::parse("A|Notes|C:\\Notes.exe|3|74\n").unwrap();
        let app = &file.catalog.apps()[0];
        assert_eq!(app.hotkey, Some(KeyCode('J' as u32)));
        assert_eq!(app.modifiers, Modifiers::CONTROL | Modifiers::ALT);

        let file = CatalogFile::parse("A|Term|wt.exe|12|84\n").unwrap();
        assert_eq!(
            file.catalog.apps()[0].modifiers,
            Modifiers::SHIFT | Modifiers::WIN
        );
    }

    #[test]
    fn round_trip_preserves_every_field_and_order() {
        let mut catalog = LayoutCatalog::default();
        catalog
            .add_layout(Layout::new("Odd", 0.1234567, 0.3333333, 0.45, 0.875).with_hotkey(KeyCode('5' as u32)))
            .unwrap();
        let mut app = AppShortcut::new("Editor", r"C:\Program Files\Editor\edit.exe");
        app.modifiers = Modifiers::CONTROL | Modifiers::SHIFT;
        app.hotkey = Some(KeyCode('E' as u32));
        catalog.add_app(app).unwrap();
        catalog.add_app(AppShortcut::new("Unbound", "calc.exe")).unwrap();
        catalog.add_exclusion("steam").unwrap();
        catalog.add_exclusion("obs64").unwrap();

        let file = CatalogFile {
            settings: Settings {
                sounds: false,
                margin: 12,
                transparency: 200,
                logging: true,
                ..Settings::default()
            },
            catalog,
        };
        let reloaded = CatalogFile::parse(&file.render()).unwrap();
        assert_eq!(reloaded, file);
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("window_layouts.cfg");
        let file = CatalogFile::default();
        file.save(&path).unwrap();
        assert_eq!(CatalogFile::load(&path).unwrap(), file);
    }

    #[test]
    fn settings_line_parses() {
        let file = CatalogFile::parse("S|0|1|0|10|150|1|1\n").unwrap();
        assert_eq!(
            file.settings,
            Settings {
                sounds: false,
                animations: true,
                tray_icon: false,
                margin: 10,
                transparency: 150,
                logging: true,
                autostart: true,
            }
        );
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let err = CatalogFile::parse("S|1|1|1|6|180|0|0\nL|Broken|0|0|abc|1|0\n").unwrap_err();
        match err {
            StoreError::Malformed { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("width"), "{}", reason);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(CatalogFile::parse("A|x\n").is_err());
        assert!(CatalogFile::parse("S|1|1\n").is_err());
        assert!(CatalogFile::parse("L|Flat|0|0|0|1|0\n").is_err());
    }

    #[test]
    fn unknown_records_and_blank_lines_are_skipped() {
        let file = CatalogFile::parse("\nX|future|thing\r\nE|game\r\n").unwrap();
        assert!(file.catalog.exclusions().matches("game.exe"));
    }

    #[test]
    fn missing_file_is_seeded_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window_layouts.cfg");
        let (file, outcome) = load_or_default(&path);
        assert_eq!(outcome, LoadOutcome::Seeded);
        assert_eq!(file.catalog.layouts(), default_layouts().as_slice());
        assert!(path.exists());
        let (_, again) = load_or_default(&path);
        assert_eq!(again, LoadOutcome::Loaded);
    }

    #[test]
    fn file_without_layouts_keeps_apps_and_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window_layouts.cfg");
        std::fs::write(&path, "A|Notes|notes.exe|3|74\n").unwrap();
        let (file, outcome) = load_or_default(&path);
        assert_eq!(outcome, LoadOutcome::Seeded);
        assert_eq!(file.catalog.layouts().len(), 22);
        assert_eq!(file.catalog.apps().len(), 1);
    }

    #[test]
    fn malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window_layouts.cfg");
        std::fs::write(&path, "L|bad\n").unwrap();
        let (file, outcome) = load_or_default(&path);
        assert_eq!(outcome, LoadOutcome::Defaulted);
        assert_eq!(file, CatalogFile::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "L|bad\n");
    }
}
