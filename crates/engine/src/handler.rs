//! Consumer of successfully evaluated instances.

use serde_json::Value;

use crate::instance::Instance;

/// Receives each successful evaluation exactly once.
///
/// Called concurrently from evaluation tasks; implementations synchronize
/// their own shared state.
pub trait InstanceHandler: Send + Sync {
    /// Consume the value of one instance.
    fn handle(&self, instance: &Instance, value: &Value);
}

impl<F> InstanceHandler for F
where
    F: Fn(&Instance, &Value) + Send + Sync,
{
    fn handle(&self, instance: &Instance, value: &Value) {
        self(instance, value);
    }
}
