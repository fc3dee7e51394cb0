//! Control id → handler routing
//!
//! The dispatcher lives on the orchestration thread and is driven by the
//! poll loop. Lookup is a single hash probe; nothing is allocated per event.
//! Unknown ids are dropped, and a failing handler is logged without
//! affecting any other binding.

use std::collections::HashMap;

use thiserror::Error;

use crate::error::SiggenResult;
use crate::types::{ControlId, ControlValue};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Control {0} is already bound")]
    AlreadyBound(ControlId),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Boxed handler invoked with the raw control value
pub type ControlHandler = Box<dyn FnMut(ControlValue) -> SiggenResult<()>>;

#[derive(Default)]
pub struct ControlDispatcher {
    handlers: HashMap<ControlId, ControlHandler>,
}

impl ControlDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `id`; an existing binding is never overwritten
    pub fn register<F>(&mut self, id: ControlId, handler: F) -> DispatchResult<()>
    where
        F: FnMut(ControlValue) -> SiggenResult<()> + 'static,
    {
        use std::collections::hash_map::Entry;

        match self.handlers.entry(id) {
            Entry::Occupied(_) => Err(DispatchError::AlreadyBound(id)),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(handler));
                log::debug!("Bound control {}", id);
                Ok(())
            }
        }
    }

    /// Remove the binding for `id`, if any
    pub fn unregister(&mut self, id: ControlId) {
        if self.handlers.remove(&id).is_some() {
            log::debug!("Unbound control {}", id);
        }
    }

    pub fn is_bound(&self, id: ControlId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route one event; returns whether a handler was found
    pub fn dispatch(&mut self, id: ControlId, value: ControlValue) -> bool {
        let Some(handler) = self.handlers.get_mut(&id) else {
            log::debug!("Ignoring unbound control {} = {}", id, value);
            return false;
        };

        log::trace!("control {} = {}", id, value);
        if let Err(e) = handler(value) {
            log::warn!("Control {} handler failed: {}", id, e);
        }
        true
    }
}

impl std::fmt::Debug for ControlDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("ControlDispatcher").field("bound", &ids).finish()
    }
}
