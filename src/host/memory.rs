//! In-memory page and widget.
//!
//! `MemoryPage` keeps globals and script tags in a map and a list;
//! `MemoryWidget` records every refresh call and stamps its own clock the way
//! the real widget does. Used by the test suites and `sharebridge simulate`.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use super::{GlobalSlot, Page, ScriptPlacement, Widget};

/// A script tag appended to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptTag {
    pub src: String,
    pub placement: ScriptPlacement,
}

#[derive(Default)]
struct PageState {
    globals: HashMap<GlobalSlot, Value>,
    scripts: Vec<ScriptTag>,
    widget: Option<Arc<MemoryWidget>>,
}

/// Page backed by plain collections.
#[derive(Default)]
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a global, as if the page markup defined it.
    pub fn with_global(self, slot: GlobalSlot, value: Value) -> Self {
        self.lock().globals.insert(slot, value);
        self
    }

    /// Pre-populate a script tag, as if the page markup included it.
    pub fn with_script(self, src: impl Into<String>, placement: ScriptPlacement) -> Self {
        self.lock().scripts.push(ScriptTag {
            src: src.into(),
            placement,
        });
        self
    }

    /// Make the widget handle visible, as if its script finished loading.
    pub fn install_widget(&self, widget: Arc<MemoryWidget>) {
        self.lock().widget = Some(widget);
    }

    pub fn remove_widget(&self) {
        self.lock().widget = None;
    }

    pub fn memory_widget(&self) -> Option<Arc<MemoryWidget>> {
        self.lock().widget.clone()
    }

    pub fn scripts(&self) -> Vec<ScriptTag> {
        self.lock().scripts.clone()
    }

    /// All defined globals keyed by their page name.
    pub fn globals(&self) -> serde_json::Map<String, Value> {
        let state = self.lock();
        GlobalSlot::ALL
            .iter()
            .filter_map(|slot| {
                state
                    .globals
                    .get(slot)
                    .map(|value| (slot.global_name().to_string(), value.clone()))
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Page for MemoryPage {
    fn widget(&self) -> Option<Arc<dyn Widget>> {
        self.lock()
            .widget
            .clone()
            .map(|widget| widget as Arc<dyn Widget>)
    }

    fn global(&self, slot: GlobalSlot) -> Option<Value> {
        self.lock().globals.get(&slot).cloned()
    }

    fn set_global(&self, slot: GlobalSlot, value: Value) {
        self.lock().globals.insert(slot, value);
    }

    fn has_script(&self, src_fragment: &str) -> bool {
        self.lock()
            .scripts
            .iter()
            .any(|tag| tag.src.contains(src_fragment))
    }

    fn append_script(&self, src: &str, placement: ScriptPlacement) {
        self.lock().scripts.push(ScriptTag {
            src: src.to_string(),
            placement,
        });
    }
}

/// One call to the widget's refresh entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshCall {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(skip)]
    pub at: Instant,
}

struct WidgetState {
    can_refresh: bool,
    last_refresh_at: Option<Instant>,
    calls: Vec<RefreshCall>,
}

/// Widget that records refresh calls.
pub struct MemoryWidget {
    state: Mutex<WidgetState>,
}

impl MemoryWidget {
    /// A widget whose refresh entry point is available.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WidgetState {
                can_refresh: true,
                last_refresh_at: None,
                calls: Vec::new(),
            }),
        }
    }

    /// A widget that loaded but has not bootstrapped its refresh API.
    pub fn without_refresh() -> Self {
        let widget = Self::new();
        widget.set_can_refresh(false);
        widget
    }

    pub fn set_can_refresh(&self, can_refresh: bool) {
        self.lock().can_refresh = can_refresh;
    }

    /// Pretend the widget refreshed itself at `at`.
    pub fn set_last_refresh_at(&self, at: Option<Instant>) {
        self.lock().last_refresh_at = at;
    }

    pub fn calls(&self) -> Vec<RefreshCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for MemoryWidget {
    fn can_refresh(&self) -> bool {
        self.lock().can_refresh
    }

    fn last_refresh_at(&self) -> Option<Instant> {
        self.lock().last_refresh_at
    }

    fn refresh(&self, url: Option<&str>, title: Option<&str>) {
        let now = Instant::now();
        let mut state = self.lock();
        state.last_refresh_at = Some(now);
        state.calls.push(RefreshCall {
            url: url.map(str::to_string),
            title: title.map(str::to_string),
            at: now,
        });
    }
}
