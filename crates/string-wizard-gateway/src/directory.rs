//! Handler directory
//!
//! Resolves the handler addresses written into the routing table to the
//! dispatchers that serve them.

use std::collections::HashMap;
use std::sync::Arc;

use string_wizard_binder::{BindingError, HandlerAddress, HandlerSet};
use string_wizard_handlers::Dispatcher;

#[derive(Clone, Default)]
pub struct HandlerDirectory {
    entries: HashMap<HandlerAddress, Arc<Dispatcher>>,
}

impl HandlerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: HandlerAddress, dispatcher: Arc<Dispatcher>) {
        self.entries.insert(address, dispatcher);
    }

    /// Register `local://<operation>` for every operation the dispatcher
    /// handles, returning the matching handler set for the binder
    pub fn register_local(
        &mut self,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<HandlerSet, BindingError> {
        let pairs: Vec<_> = dispatcher
            .operations()
            .map(|operation| (operation.clone(), HandlerAddress::local(operation)))
            .collect();
        let handlers = HandlerSet::from_pairs(pairs)?;
        for (_, address) in handlers.iter() {
            self.entries.insert(address.clone(), Arc::clone(&dispatcher));
        }
        Ok(handlers)
    }

    pub fn resolve(&self, address: &HandlerAddress) -> Option<&Arc<Dispatcher>> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
