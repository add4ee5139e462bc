//! Saving and restoring window geometry across restarts.
//!
//! The session file holds one `title|x|y|width|height` line per window.
//! Records are split from the right, so titles may contain `|`.  Windows
//! are matched by exact title only, which makes restore best-effort: a
//! window whose title changed, or a second window with the same title, is
//! simply not matched.

use crate::command::{Rect, WindowId};
use crate::placement::{EngineError, PlacementEngine};
use crate::traits::Desktop;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One captured window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub title: String,
    pub rect: Rect,
}

/// Parse a whole session file.  Blank lines are skipped.
pub fn parse(text: &str) -> Result<Vec<SessionRecord>, SessionError> {
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: &str| SessionError::Malformed {
            line: i + 1,
            reason: reason.to_string(),
        };
        let mut parts = line.rsplitn(5, '|');
        let mut number = |what: &str| -> Result<i32, SessionError> {
            parts
                .next()
                .ok_or_else(|| malformed(&format!("missing {}", what)))?
                .trim()
                .parse()
                .map_err(|_| malformed(&format!("invalid {}", what)))
        };
        let height = number("height")?;
        let width = number("width")?;
        let y = number("y")?;
        let x = number("x")?;
        let title = parts.next().ok_or_else(|| malformed("missing title"))?;
        records.push(SessionRecord {
            title: title.to_string(),
            rect: Rect::new(x, y, width, height),
        });
    }
    Ok(records)
}

pub fn render(records: &[SessionRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}|{}|{}|{}|{}\n",
                r.title, r.rect.x, r.rect.y, r.rect.width, r.rect.height
            )
        })
        .collect()
}

/// The session file and the operations on it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture every eligible window, replacing the previous file.
    /// Returns the number of records written.
    pub fn save<D: Desktop>(&self, engine: &PlacementEngine<D>) -> Result<usize, SessionError> {
        let desktop = engine.desktop();
        let mut records = Vec::new();
        for window in engine.eligible_windows()? {
            let (Ok(title), Ok(rect)) = (desktop.window_title(window), desktop.window_rect(window))
            else {
                debug!("{} vanished while saving", window);
                continue;
            };
            if title.contains(['\n', '\r']) {
                debug!("skipping multi-line title {:?}", title);
                continue;
            }
            records.push(SessionRecord { title, rect });
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, render(&records))?;
        info!("saved {} windows to {}", records.len(), self.path.display());
        Ok(records.len())
    }

    /// Move each open window whose title matches a saved record back to
    /// the saved rectangle.  A missing file restores nothing.
    /// Returns the number of windows moved.
    pub fn restore<D: Desktop>(&self, engine: &PlacementEngine<D>) -> Result<usize, SessionError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no session at {}", self.path.display());
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let records = parse(&text)?;
        let windows = engine.eligible_windows()?;
        let titles: Vec<(WindowId, String)> = windows
            .into_iter()
            .filter_map(|w| engine.desktop().window_title(w).ok().map(|t| (w, t)))
            .collect();

        let mut restored = 0;
        for record in &records {
            let Some(&(window, _)) = titles.iter().find(|(_, t)| *t == record.title) else {
                debug!("no window titled {:?}", record.title);
                continue;
            };
            match engine.move_window_to(window, record.rect) {
                Ok(()) => restored += 1,
                Err(e) => warn!("could not restore {:?}: {}", record.title, e),
            }
        }
        info!("restored {} of {} windows", restored, records.len());
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LayoutCatalog;
    use crate::placement::animation::Animation;
    use crate::testing::FakeDesktop;

    fn engine(desktop: FakeDesktop) -> PlacementEngine<FakeDesktop> {
        let mut engine = PlacementEngine::new(desktop, LayoutCatalog::default());
        engine.set_animation(Animation {
            enabled: false,
            ..Animation::default()
        });
        engine
    }

    #[test]
    fn titles_may_contain_pipes() {
        let records = parse("a|b - Editor|10|20|300|400\r\n\n").unwrap();
        assert_eq!(
            records,
            vec![SessionRecord {
                title: "a|b - Editor".into(),
                rect: Rect::new(10, 20, 300, 400),
            }]
        );
        assert_eq!(render(&records), "a|b - Editor|10|20|300|400\n");
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let err = parse("ok|1|2|3|4\nbad|1|2|x|4\n").unwrap_err();
        assert!(matches!(err, SessionError::Malformed { line: 2, .. }));
        assert!(matches!(
            parse("1|2|3").unwrap_err(),
            SessionError::Malformed { line: 1, .. }
        ));
    }

    #[test]
    fn save_then_restore_moves_matching_windows() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.cfg"));

        let desktop = FakeDesktop::single_monitor();
        let a = desktop.add_window("Notes", Rect::new(10, 20, 300, 400));
        let b = desktop.add_window("Mail", Rect::new(500, 20, 600, 400));
        let e = engine(desktop);
        assert_eq!(store.save(&e).unwrap(), 2);

        e.desktop().set_window_rect(a, Rect::new(0, 0, 100, 100)).unwrap();
        e.desktop().set_window_rect(b, Rect::new(0, 0, 100, 100)).unwrap();
        assert_eq!(store.restore(&e).unwrap(), 2);
        assert_eq!(e.desktop().rect_of(a), Rect::new(10, 20, 300, 400));
        assert_eq!(e.desktop().rect_of(b), Rect::new(500, 20, 600, 400));
    }

    #[test]
    fn first_title_match_wins_and_unknown_titles_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cfg");
        std::fs::write(&path, "Dup|1|2|300|300\nGone|5|5|300|300\n").unwrap();

        let desktop = FakeDesktop::single_monitor();
        let first = desktop.add_window("Dup", Rect::new(0, 0, 200, 200));
        let second = desktop.add_window("Dup", Rect::new(0, 0, 200, 200));
        let e = engine(desktop);
        assert_eq!(SessionStore::new(&path).restore(&e).unwrap(), 1);
        assert_eq!(e.desktop().rect_of(first), Rect::new(1, 2, 300, 300));
        assert_eq!(e.desktop().rect_of(second), Rect::new(0, 0, 200, 200));
    }

    #[test]
    fn missing_file_restores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let e = engine(FakeDesktop::single_monitor());
        let store = SessionStore::new(dir.path().join("none.cfg"));
        assert_eq!(store.restore(&e).unwrap(), 0);
    }

    #[test]
    fn multi_line_titles_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cfg");
        let desktop = FakeDesktop::single_monitor();
        desktop.add_window("two\nlines", Rect::new(0, 0, 200, 200));
        desktop.add_window("fine", Rect::new(0, 0, 200, 200));
        let e = engine(desktop);
        assert_eq!(SessionStore::new(&path).save(&e).unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fine|0|0|200|200\n");
    }
}
