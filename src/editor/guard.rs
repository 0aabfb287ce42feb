use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{trace, warn};

use super::undo::UndoSnapshot;

/// Capabilities the surrounding editing host lends to the review engine.
pub trait EditorHost {
    fn set_undo_enabled(&mut self, enabled: bool);
    fn undo_enabled(&self) -> bool;
    fn set_input_dispatch_suppressed(&mut self, suppressed: bool);
    fn input_dispatch_suppressed(&self) -> bool;

    /// Called after every caret or selection change.
    fn selection_changed(&mut self, _user_initiated: bool) {}

    /// Called with every snapshot the engine records, so a host can mirror
    /// the history on its own undo stack. Typing snapshots arrive one per
    /// edit even when the engine merges them.
    fn record_undo(&mut self, _snapshot: &UndoSnapshot) {}
}

pub type SharedHost = Rc<RefCell<dyn EditorHost>>;

/// Host that records nothing and accepts every toggle.
#[derive(Debug)]
pub struct DetachedHost {
    undo_enabled: bool,
    input_dispatch_suppressed: bool,
}

impl Default for DetachedHost {
    fn default() -> Self {
        Self {
            undo_enabled: true,
            input_dispatch_suppressed: false,
        }
    }
}

impl DetachedHost {
    pub fn shared() -> SharedHost {
        Rc::new(RefCell::new(Self::default()))
    }
}

impl EditorHost for DetachedHost {
    fn set_undo_enabled(&mut self, enabled: bool) {
        self.undo_enabled = enabled;
    }

    fn undo_enabled(&self) -> bool {
        self.undo_enabled
    }

    fn set_input_dispatch_suppressed(&mut self, suppressed: bool) {
        self.input_dispatch_suppressed = suppressed;
    }

    fn input_dispatch_suppressed(&self) -> bool {
        self.input_dispatch_suppressed
    }
}

#[derive(Clone, Copy, Debug)]
struct HostToggles {
    undo_enabled: bool,
    input_dispatch_suppressed: bool,
}

struct GuardState {
    depth: Cell<usize>,
    saved: Cell<Option<HostToggles>>,
    host: SharedHost,
}

/// Reentrant suppression of host undo recording and input dispatch while the
/// engine mutates the surface itself. Clones share one depth counter.
#[derive(Clone)]
pub struct MutationGuard {
    state: Rc<GuardState>,
}

impl MutationGuard {
    pub fn new(host: SharedHost) -> Self {
        Self {
            state: Rc::new(GuardState {
                depth: Cell::new(0),
                saved: Cell::new(None),
                host,
            }),
        }
    }

    pub fn depth(&self) -> usize {
        self.state.depth.get()
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Runs `f` with the guard held. The depth is released and the host
    /// toggles restored when `f` returns or unwinds.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter();
        f()
    }

    fn enter(&self) -> GuardScope {
        let state = &self.state;
        let depth = state.depth.get();
        if depth == 0 {
            match state.host.try_borrow_mut() {
                Ok(mut host) => {
                    state.saved.set(Some(HostToggles {
                        undo_enabled: host.undo_enabled(),
                        input_dispatch_suppressed: host.input_dispatch_suppressed(),
                    }));
                    host.set_undo_enabled(false);
                    host.set_input_dispatch_suppressed(true);
                }
                Err(_) => warn!(target: "editor.guard", "host_busy_on_enter"),
            }
        }
        state.depth.set(depth + 1);
        trace!(target: "editor.guard", depth = depth + 1, "enter");
        GuardScope {
            state: Rc::clone(state),
        }
    }
}

struct GuardScope {
    state: Rc<GuardState>,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        let depth = self.state.depth.get().saturating_sub(1);
        self.state.depth.set(depth);
        trace!(target: "editor.guard", depth, "exit");
        if depth > 0 {
            return;
        }
        let Some(saved) = self.state.saved.take() else {
            return;
        };
        match self.state.host.try_borrow_mut() {
            Ok(mut host) => {
                host.set_undo_enabled(saved.undo_enabled);
                host.set_input_dispatch_suppressed(saved.input_dispatch_suppressed);
            }
            Err(_) => warn!(target: "editor.guard", "host_busy_on_restore"),
        }
    }
}
