//! Fan-out of application lifecycle events to registered listeners.

use std::sync::{Arc, Mutex, MutexGuard};

/// Identity of the application, delivered when it attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// The application package, e.g. `com.example.app`.
    pub package_name: String,
    /// `Build.VERSION.SDK_INT`, `0` when unknown.
    pub api_level: u32,
}

/// Screen orientation of a [`Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Not reported.
    Undefined,
    /// Taller than wide.
    Portrait,
    /// Wider than tall.
    Landscape,
}

/// The device configuration values an application usually reacts to.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// BCP 47 tag of the primary locale.
    pub locale: String,
    /// Screen orientation.
    pub orientation: Orientation,
    /// Whether the dark theme is active.
    pub night_mode: bool,
    /// User font scaling factor.
    pub font_scale: f32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            locale: String::from("en-US"),
            orientation: Orientation::Undefined,
            night_mode: false,
            font_scale: 1.0,
        }
    }
}

/// How hard the system is asking the application to release memory, from
/// `ComponentCallbacks2.onTrimMemory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimLevel {
    /// `TRIM_MEMORY_RUNNING_MODERATE`
    RunningModerate,
    /// `TRIM_MEMORY_RUNNING_LOW`
    RunningLow,
    /// `TRIM_MEMORY_RUNNING_CRITICAL`
    RunningCritical,
    /// `TRIM_MEMORY_UI_HIDDEN`
    UiHidden,
    /// `TRIM_MEMORY_BACKGROUND`
    Background,
    /// `TRIM_MEMORY_MODERATE`
    Moderate,
    /// `TRIM_MEMORY_COMPLETE`
    Complete,
}

impl TrimLevel {
    /// Maps the raw Android `TRIM_MEMORY_*` value.
    pub fn from_raw(level: i32) -> Option<Self> {
        Some(match level {
            5 => TrimLevel::RunningModerate,
            10 => TrimLevel::RunningLow,
            15 => TrimLevel::RunningCritical,
            20 => TrimLevel::UiHidden,
            40 => TrimLevel::Background,
            60 => TrimLevel::Moderate,
            80 => TrimLevel::Complete,
            _ => return None,
        })
    }
}

/// Receives application lifecycle events. Every method defaults to doing
/// nothing.
pub trait LifecycleListener: Send + Sync {
    /// See [`Lifecycle::attach`].
    fn on_attach(&self, _info: &AppInfo) {}
    /// See [`Lifecycle::create`].
    fn on_create(&self) {}
    /// See [`Lifecycle::terminate`].
    fn on_terminate(&self) {}
    /// See [`Lifecycle::configuration_changed`].
    fn on_configuration_changed(&self, _config: &Configuration) {}
    /// See [`Lifecycle::low_memory`].
    fn on_low_memory(&self) {}
    /// See [`Lifecycle::trim_memory`].
    fn on_trim_memory(&self, _level: TrimLevel) {}
}

#[derive(Debug, Clone, Default)]
enum Stage {
    #[default]
    Launching,
    Attached(AppInfo),
    Created(Option<AppInfo>),
    Terminated,
}

#[derive(Default)]
struct Registry {
    listeners: Vec<Arc<dyn LifecycleListener>>,
    stage: Stage,
}

/// Registry of lifecycle listeners.
///
/// Events reach listeners in registration order. A listener registered after
/// the application attached or was created is first brought up to date with
/// a synthetic `on_attach` (and `on_create`) before `register` returns, so it
/// sees the catch-up before any later event dispatched from the same thread.
/// An event dispatched concurrently from another thread may reach it before
/// its catch-up does.
///
/// Listeners cannot be removed. A panicking listener is not isolated from the
/// others. The lock is never held while listeners run, so a listener may
/// register further listeners from inside a callback.
#[derive(Default)]
pub struct Lifecycle {
    registry: Mutex<Registry>,
}

impl Lifecycle {
    /// An empty registry in the launching stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener` after the existing ones and brings it up to date.
    pub fn register(&self, listener: Arc<dyn LifecycleListener>) {
        let stage = {
            let mut registry = self.lock();
            registry.listeners.push(Arc::clone(&listener));
            registry.stage.clone()
        };

        match stage {
            Stage::Launching => {}
            Stage::Attached(info) => listener.on_attach(&info),
            Stage::Created(info) => {
                if let Some(info) = info {
                    listener.on_attach(&info);
                }
                listener.on_create();
            }
            Stage::Terminated => {
                log::warn!("listener registered after the application terminated");
            }
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `create` ran and `terminate` has not.
    pub fn is_created(&self) -> bool {
        matches!(self.lock().stage, Stage::Created(_))
    }

    /// The application object was attached to its base context.
    pub fn attach(&self, info: AppInfo) {
        log::debug!("application {} attached", info.package_name);
        let stage = Stage::Attached(info.clone());
        self.dispatch(|_| Some(stage), |l| l.on_attach(&info));
    }

    /// The application finished creating. Keeps the [`AppInfo`] of an
    /// earlier `attach` for listeners that register later.
    pub fn create(&self) {
        let created = |stage: &Stage| {
            let info = match stage {
                Stage::Attached(info) => Some(info.clone()),
                Stage::Created(info) => info.clone(),
                Stage::Launching | Stage::Terminated => None,
            };
            Some(Stage::Created(info))
        };
        self.dispatch(created, |l| l.on_create());
    }

    /// The application is terminating. Later registrations get no catch-up.
    pub fn terminate(&self) {
        self.dispatch(|_| Some(Stage::Terminated), |l| l.on_terminate());
    }

    /// The device configuration changed.
    pub fn configuration_changed(&self, config: &Configuration) {
        self.dispatch(|_| None, |l| l.on_configuration_changed(config));
    }

    /// The whole system is running low on memory.
    pub fn low_memory(&self) {
        self.dispatch(|_| None, |l| l.on_low_memory());
    }

    /// The system asks the application to release memory.
    pub fn trim_memory(&self, level: TrimLevel) {
        self.dispatch(|_| None, |l| l.on_trim_memory(level));
    }

    // Applies `transition` and snapshots the listeners under one lock, then
    // notifies the snapshot.
    fn dispatch(
        &self,
        transition: impl FnOnce(&Stage) -> Option<Stage>,
        event: impl Fn(&dyn LifecycleListener),
    ) {
        let listeners = {
            let mut registry = self.lock();
            if let Some(next) = transition(&registry.stage) {
                registry.stage = next;
            }
            registry.listeners.clone()
        };
        for listener in &listeners {
            event(listener.as_ref());
        }
    }

    // The registry is consistent between statements, so a panic in another
    // thread holding the lock leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock();
        f.debug_struct("Lifecycle")
            .field("listeners", &registry.listeners.len())
            .field("stage", &registry.stage)
            .finish()
    }
}
