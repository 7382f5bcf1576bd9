//! Model factory: the registry of locally-available model types.
//!
//! Model plugins may load at any time, including after entities referencing
//! them have arrived on the feed. Registration fires a `registered`
//! observer event so the demultiplexer can attach models to entities that
//! were constructed before the type became available.

use crate::{Model, ModelConstructor, ModelError, ModelResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use weft_types::EntityId;

type RegisteredCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Registry of model constructors, keyed by model type.
#[derive(Default)]
pub struct ModelFactory {
    constructors: Mutex<HashMap<String, ModelConstructor>>,
    registered_observers: Mutex<Vec<RegisteredCallback>>,
}

impl ModelFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for a model type and fires the `registered`
    /// event. Re-registration of a known type is an error, not a replace.
    pub fn register_model(
        &self,
        model_type: impl Into<String>,
        ctor: impl Fn(&EntityId) -> Box<dyn Model> + Send + Sync + 'static,
    ) -> ModelResult<()> {
        let model_type = model_type.into();
        {
            let mut constructors = self.constructors.lock().expect("factory lock poisoned");
            if constructors.contains_key(&model_type) {
                return Err(ModelError::AlreadyRegistered(model_type));
            }
            constructors.insert(model_type.clone(), Arc::new(ctor));
        }
        debug!(model_type = %model_type, "model type registered");

        // Observers run outside the constructor lock: an observer may call
        // back into create_model synchronously.
        let observers = self.registered_observers.lock().expect("factory lock poisoned");
        for observer in observers.iter() {
            observer(&model_type);
        }
        Ok(())
    }

    /// Returns true if a constructor for the type is registered.
    #[must_use]
    pub fn is_registered(&self, model_type: &str) -> bool {
        self.constructors
            .lock()
            .expect("factory lock poisoned")
            .contains_key(model_type)
    }

    /// Instantiates a model for an entity.
    pub fn create_model(&self, model_type: &str, id: &EntityId) -> ModelResult<Box<dyn Model>> {
        let ctor = self
            .constructors
            .lock()
            .expect("factory lock poisoned")
            .get(model_type)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel(model_type.to_string()))?;
        Ok(ctor(id))
    }

    /// Subscribes to the `registered` event, fired once per newly available
    /// model type with the type name.
    pub fn on_registered(&self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.registered_observers
            .lock()
            .expect("factory lock poisoned")
            .push(Box::new(observer));
    }
}
