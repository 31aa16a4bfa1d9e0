//! Post-run release of process-wide resource hubs.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// A process-wide pool of shared connections or clients.
pub trait ResourceHub {
    fn name(&self) -> &str;

    /// Close every instance held by the hub.
    fn clear_all(&self) -> anyhow::Result<()>;
}

struct HubSlot {
    name: String,
    hub: Option<Arc<dyn ResourceHub>>,
}

/// Outcome of [`ResourceReleaser::release_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub cleared: Vec<String>,
    /// Slots that were declared but never instantiated.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Releases a fixed set of named hubs after the run loop finishes.
///
/// Slots may be declared before their hub exists (optional integrations);
/// an empty slot is skipped. Each hub is released independently.
#[derive(Default)]
pub struct ResourceReleaser {
    slots: Vec<HubSlot>,
}

impl ResourceReleaser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a slot that may or may not be filled later.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.slots.iter().any(|slot| slot.name == name) {
            self.slots.push(HubSlot { name, hub: None });
        }
    }

    /// Fill the slot matching the hub's name, declaring it if needed.
    pub fn install(&mut self, hub: Arc<dyn ResourceHub>) {
        match self.slots.iter_mut().find(|slot| slot.name == hub.name()) {
            Some(slot) => slot.hub = Some(hub),
            None => self.slots.push(HubSlot {
                name: hub.name().to_string(),
                hub: Some(hub),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn release_all(&self) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();

        for slot in &self.slots {
            let Some(hub) = slot.hub.as_ref() else {
                debug!(hub = %slot.name, "Hub never instantiated, nothing to release");
                summary.skipped.push(slot.name.clone());
                continue;
            };

            match catch_unwind(AssertUnwindSafe(|| hub.clear_all())) {
                Ok(Ok(())) => {
                    debug!(hub = %slot.name, "Hub released");
                    summary.cleared.push(slot.name.clone());
                }
                Ok(Err(err)) => {
                    warn!(hub = %slot.name, error = %err, "Failed to release hub");
                    summary.failed.push(slot.name.clone());
                }
                Err(_) => {
                    warn!(hub = %slot.name, "Hub panicked while releasing");
                    summary.failed.push(slot.name.clone());
                }
            }
        }

        summary
    }
}

type Factory<T> = Box<dyn Fn(&str) -> anyhow::Result<T>>;
type Closer<T> = Box<dyn Fn(&str, &T) -> anyhow::Result<()>>;

/// Lazily created instances keyed by name, e.g. one client per database URL.
///
/// `clear_all` drains the pool and runs the close hook on every instance,
/// even if an earlier one fails. Handles already handed out stay valid until
/// dropped, but the hub no longer returns them.
pub struct SingletonHub<T> {
    name: String,
    factory: Factory<T>,
    close: Closer<T>,
    instances: Mutex<BTreeMap<String, Arc<T>>>,
}

impl<T> SingletonHub<T> {
    pub fn new<F, C>(name: impl Into<String>, factory: F, close: C) -> Self
    where
        F: Fn(&str) -> anyhow::Result<T> + 'static,
        C: Fn(&str, &T) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            close: Box::new(close),
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the instance for `key`, creating it on first use.
    pub fn get(&self, key: &str) -> anyhow::Result<Arc<T>> {
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(key) {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new((self.factory)(key)?);
        instances.insert(key.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl<T> ResourceHub for SingletonHub<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn clear_all(&self) -> anyhow::Result<()> {
        let drained = std::mem::take(&mut *self.instances.lock());

        let mut failed = Vec::new();
        for (key, instance) in drained {
            if let Err(err) = (self.close)(key.as_str(), &*instance) {
                debug!(hub = %self.name, key = %key, error = %err, "Failed to close instance");
                failed.push(key);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("failed to close {}", failed.join(", "))
        }
    }
}
