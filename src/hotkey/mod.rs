//! Global hotkeys: the key grammar, the id plan and the [`HotkeyRegistry`].
//!
//! Hotkey ids are partitioned into fixed ranges so that no two concerns can
//! collide.  Layout and app-shortcut ids are derived from list position
//! (`LAYOUT_BASE + index`, `APP_BASE + index`), so reordering either list
//! invalidates previously bound ids; [`Command::ReloadHotkeys`] rebinds them.
//!
//! [`Command::ReloadHotkeys`]: crate::command::Command::ReloadHotkeys

pub mod keys;
pub mod registry;

pub use keys::{Hotkey, HotkeyParseError, KeyCode, Modifiers};
pub use registry::{ActionError, DispatchOutcome, HotkeyRegistry, RegisterError};

/// The hotkey id plan.
pub mod ids {
    use std::ops::Range;

    //  Navigation (100..120)
    pub const FOCUS_PREVIOUS: i32 = 100;
    pub const FOCUS_NEXT: i32 = 101;
    pub const BRING_TO_FRONT: i32 = 102;
    pub const SEND_TO_BACK: i32 = 103;

    //  Window operations (120..140)
    pub const CYCLE_POSITION: i32 = 120;
    pub const RESTORE_PREVIOUS: i32 = 121;
    pub const ARRANGE_NO_OVERLAP: i32 = 122;
    pub const SAFE_CLOSE: i32 = 123;
    pub const TOGGLE_TRANSPARENCY: i32 = 124;

    //  System (140..200)
    pub const OPEN_SETTINGS: i32 = 140;
    pub const GAME_MODE: i32 = 141;

    //  Dynamic
    pub const LAYOUT_BASE: i32 = 200;
    pub const APP_BASE: i32 = 300;
    /// Slots reserved for each dynamic range.
    pub const DYNAMIC_SLOTS: usize = 100;

    pub const NAVIGATION: Range<i32> = 100..120;
    pub const WINDOW_OPS: Range<i32> = 120..140;
    pub const SYSTEM: Range<i32> = 140..200;
    pub const LAYOUTS: Range<i32> = LAYOUT_BASE..LAYOUT_BASE + DYNAMIC_SLOTS as i32;
    pub const APPS: Range<i32> = APP_BASE..APP_BASE + DYNAMIC_SLOTS as i32;

    /// Hotkey id for user layout `index`, if it fits in the layout range.
    pub fn layout(index: usize) -> Option<i32> {
        (index < DYNAMIC_SLOTS).then(|| LAYOUT_BASE + index as i32)
    }

    /// Hotkey id for app shortcut `index`, if it fits in the app range.
    pub fn app(index: usize) -> Option<i32> {
        (index < DYNAMIC_SLOTS).then(|| APP_BASE + index as i32)
    }

    /// Whether `id` belongs to one of the list-derived ranges.
    pub fn is_dynamic(id: i32) -> bool {
        LAYOUTS.contains(&id) || APPS.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::ids;

    #[test]
    fn ranges_do_not_overlap() {
        let ranges = [
            ids::NAVIGATION,
            ids::WINDOW_OPS,
            ids::SYSTEM,
            ids::LAYOUTS,
            ids::APPS,
        ];
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                assert!(a.end <= b.start || b.end <= a.start, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn fixed_ids_sit_in_their_ranges() {
        assert!(ids::NAVIGATION.contains(&ids::SEND_TO_BACK));
        assert!(ids::WINDOW_OPS.contains(&ids::TOGGLE_TRANSPARENCY));
        assert!(ids::SYSTEM.contains(&ids::GAME_MODE));
    }

    #[test]
    fn dynamic_ids_are_bounded() {
        assert_eq!(ids::layout(0), Some(200));
        assert_eq!(ids::layout(99), Some(299));
        assert_eq!(ids::layout(100), None);
        assert_eq!(ids::app(4), Some(304));
        assert!(ids::is_dynamic(250));
        assert!(ids::is_dynamic(399));
        assert!(!ids::is_dynamic(141));
    }
}
