//! Logical hotkey table layered over an OS [`HotkeyBackend`].
//!
//! The registry owns one binding per id and refuses two bindings for the
//! same `(modifiers, key)` tuple.  Conflict detection is local: the registry
//! cannot see combinations held by other processes, so an OS registration
//! failure is the only signal for those.
//!
//! [`dispatch`](HotkeyRegistry::dispatch) runs the bound callback behind a
//! panic guard.  A failing or panicking action is logged and reported in the
//! returned [`DispatchOutcome`]; it never reaches the caller's event loop.

use super::keys::{Hotkey, HotkeyParseError};
use crate::traits::HotkeyBackend;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Error type returned by hotkey callbacks.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// The action bound to a hotkey.  Receives the id that fired.
pub type Callback = Box<dyn FnMut(i32) -> Result<(), ActionError>>;

/// Why a registration was refused.  No state changes on any of these.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("hotkey id {0} is already bound")]
    DuplicateId(i32),
    #[error("{hotkey} is already bound to id {existing}")]
    Conflict { hotkey: Hotkey, existing: i32 },
    #[error(transparent)]
    Parse(#[from] HotkeyParseError),
    #[error("OS refused {hotkey} for id {id}: {reason}")]
    Os {
        id: i32,
        hotkey: Hotkey,
        reason: String,
    },
}

/// Result of delivering a fired hotkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// The callback returned an error (already logged).
    Failed(String),
    /// The callback panicked (already logged).
    Panicked,
    /// No binding for this id.
    Unknown,
}

struct Binding {
    hotkey: Hotkey,
    callback: Callback,
    /// Whether the OS registration currently holds.
    registered: bool,
}

/// Maps hotkey ids to `(modifiers, key)` bindings and their actions.
///
/// Dropping the registry releases every OS registration it still holds.
pub struct HotkeyRegistry<B: HotkeyBackend> {
    backend: B,
    bindings: BTreeMap<i32, Binding>,
}

impl<B: HotkeyBackend> HotkeyRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `hotkey` to `callback` under `id` and claim it from the OS.
    pub fn register(
        &mut self,
        id: i32,
        hotkey: Hotkey,
        callback: impl FnMut(i32) -> Result<(), ActionError> + 'static,
    ) -> Result<(), RegisterError> {
        if self.bindings.contains_key(&id) {
            return Err(RegisterError::DuplicateId(id));
        }
        if let Some((&existing, _)) = self.bindings.iter().find(|(_, b)| b.hotkey == hotkey) {
            return Err(RegisterError::Conflict { hotkey, existing });
        }
        self.backend
            .register(id, hotkey)
            .map_err(|e| RegisterError::Os {
                id,
                hotkey,
                reason: e.to_string(),
            })?;
        debug!("registered hotkey {} as {}", id, hotkey);
        self.bindings.insert(
            id,
            Binding {
                hotkey,
                callback: Box::new(callback),
                registered: true,
            },
        );
        Ok(())
    }

    /// Parse `hotkey` (e.g. `"Ctrl+Alt+J"`) and [`register`](Self::register) it.
    pub fn register_str(
        &mut self,
        id: i32,
        hotkey: &str,
        callback: impl FnMut(i32) -> Result<(), ActionError> + 'static,
    ) -> Result<(), RegisterError> {
        let hotkey: Hotkey = hotkey.parse()?;
        self.register(id, hotkey, callback)
    }

    /// Release `id`.  Returns `false` if it was not bound.
    pub fn unregister(&mut self, id: i32) -> bool {
        let Some(binding) = self.bindings.remove(&id) else {
            return false;
        };
        if binding.registered {
            if let Err(e) = self.backend.unregister(id) {
                warn!("failed to release hotkey {} ({}): {}", id, binding.hotkey, e);
            }
        }
        debug!("unregistered hotkey {}", id);
        true
    }

    /// Release every binding.
    pub fn unregister_all(&mut self) {
        let ids: Vec<i32> = self.bindings.keys().copied().collect();
        for id in ids {
            self.unregister(id);
        }
    }

    /// Release every binding whose id satisfies `pred`.
    pub fn unregister_where(&mut self, mut pred: impl FnMut(i32) -> bool) -> usize {
        let ids: Vec<i32> = self.bindings.keys().copied().filter(|&id| pred(id)).collect();
        for &id in &ids {
            self.unregister(id);
        }
        ids.len()
    }

    /// Run the action bound to `id`.
    pub fn dispatch(&mut self, id: i32) -> DispatchOutcome {
        let Some(binding) = self.bindings.get_mut(&id) else {
            info!("hotkey {} fired but is not bound, ignoring", id);
            return DispatchOutcome::Unknown;
        };
        debug!("hotkey {} ({}) fired", id, binding.hotkey);
        let callback = &mut binding.callback;
        match panic::catch_unwind(AssertUnwindSafe(|| callback(id))) {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                error!("hotkey {} action failed: {}", id, e);
                DispatchOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic".into());
                error!("hotkey {} action panicked: {}", id, msg);
                DispatchOutcome::Panicked
            }
        }
    }

    //  Queries

    pub fn is_registered(&self, id: i32) -> bool {
        self.bindings.get(&id).is_some_and(|b| b.registered)
    }

    /// Bound ids in ascending order.
    pub fn registered_ids(&self) -> Vec<i32> {
        self.bindings.keys().copied().collect()
    }

    pub fn hotkey(&self, id: i32) -> Option<Hotkey> {
        self.bindings.get(&id).map(|b| b.hotkey)
    }

    /// Human-readable form of `id`'s binding, e.g. `"Ctrl+Alt+J"`.
    pub fn hotkey_string(&self, id: i32) -> Option<String> {
        self.hotkey(id).map(|hk| hk.to_string())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: HotkeyBackend> Drop for HotkeyRegistry<B> {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
