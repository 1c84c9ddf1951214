//! Per-operator kernel tables.
//!
//! An [`OperatorHandle`] maps dispatch keys to kernels for one named
//! operator. The [`DispatchKey::None`] slot exists from construction and
//! holds the fallback kernel once one is registered.

use std::collections::HashMap;

use crate::backend::DispatchKey;
use crate::error::{DispatchError, Result};
use crate::kernel::Kernel;

/// Kernel table of a single operator.
#[derive(Debug, Clone)]
pub struct OperatorHandle {
    name: String,
    kernels: HashMap<DispatchKey, Option<Kernel>>,
}

impl OperatorHandle {
    /// Creates an operator with an empty fallback slot.
    pub fn new(name: impl Into<String>) -> Self {
        let mut kernels = HashMap::new();
        kernels.insert(DispatchKey::None, None);
        Self {
            name: name.into(),
            kernels,
        }
    }

    /// Operator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `key` has a kernel installed.
    ///
    /// For [`DispatchKey::None`] this reports whether a fallback exists.
    pub fn has_definition(&self, key: DispatchKey) -> bool {
        matches!(self.kernels.get(&key), Some(Some(_)))
    }

    /// Installs `kernel` for `key`.
    ///
    /// Re-registering an identical kernel is a no-op. Returns whether the
    /// kernel was newly installed.
    ///
    /// # Errors
    /// - [`DispatchError::ConflictingRegistration`] if a different kernel is
    ///   already installed. The installed kernel stays in effect.
    pub fn register(&mut self, key: DispatchKey, kernel: Kernel) -> Result<bool> {
        let slot = self.kernels.entry(key).or_insert(None);
        match slot {
            Some(existing) if existing.is_identical(&kernel) => Ok(false),
            Some(_) => Err(DispatchError::ConflictingRegistration {
                operator: self.name.clone(),
                key,
            }),
            None => {
                *slot = Some(kernel);
                Ok(true)
            }
        }
    }

    /// Resolves the kernel for `key`, falling back to the `None` slot.
    ///
    /// Returns `None` when neither exists.
    pub fn get(&self, key: DispatchKey) -> Option<&Kernel> {
        self.kernels
            .get(&key)
            .and_then(Option::as_ref)
            .or_else(|| self.fallback())
    }

    /// The fallback kernel, if registered.
    pub fn fallback(&self) -> Option<&Kernel> {
        self.kernels.get(&DispatchKey::None).and_then(Option::as_ref)
    }

    /// Keys with an installed kernel, in index order.
    pub fn keys(&self) -> Vec<DispatchKey> {
        let mut keys: Vec<_> = self
            .kernels
            .iter()
            .filter(|(_, kernel)| kernel.is_some())
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_impl() -> &'static str {
        "cpu"
    }
    fn other_cpu_impl() -> &'static str {
        "other"
    }
    fn fallback_impl() -> &'static str {
        "fallback"
    }

    fn call(kernel: Option<&Kernel>) -> Option<&'static str> {
        kernel.and_then(|k| k.invoke::<(), &'static str>(()))
    }

    #[test]
    fn new_operator_has_empty_fallback_slot() {
        let op = OperatorHandle::new("foo");
        assert_eq!(op.name(), "foo");
        assert!(!op.has_definition(DispatchKey::None));
        assert!(!op.has_definition(DispatchKey::Cpu));
        assert!(op.get(DispatchKey::Cpu).is_none());
        assert!(op.keys().is_empty());
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut op = OperatorHandle::new("foo");
        assert_eq!(op.register(DispatchKey::Cpu, Kernel::new(cpu_impl)), Ok(true));
        assert_eq!(op.register(DispatchKey::Cpu, Kernel::new(cpu_impl)), Ok(false));
        assert_eq!(op.keys(), vec![DispatchKey::Cpu]);
        assert_eq!(call(op.get(DispatchKey::Cpu)), Some("cpu"));
    }

    #[test]
    fn conflicting_registration_keeps_first() {
        let mut op = OperatorHandle::new("foo");
        op.register(DispatchKey::Cpu, Kernel::new(cpu_impl)).unwrap();
        let err = op
            .register(DispatchKey::Cpu, Kernel::new(other_cpu_impl))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::ConflictingRegistration {
                operator: "foo".to_owned(),
                key: DispatchKey::Cpu,
            }
        );
        assert_eq!(call(op.get(DispatchKey::Cpu)), Some("cpu"));
    }

    #[test]
    fn exact_match_wins_over_fallback() {
        let mut op = OperatorHandle::new("foo");
        op.register(DispatchKey::None, Kernel::new(fallback_impl)).unwrap();
        op.register(DispatchKey::Cpu, Kernel::new(cpu_impl)).unwrap();
        assert!(op.has_definition(DispatchKey::None));
        assert_eq!(call(op.get(DispatchKey::Cpu)), Some("cpu"));
        assert_eq!(call(op.get(DispatchKey::Cuda)), Some("fallback"));
        assert_eq!(call(op.get(DispatchKey::None)), Some("fallback"));
        assert_eq!(op.keys(), vec![DispatchKey::Cpu, DispatchKey::None]);
    }

    #[test]
    fn fallback_conflicts_too() {
        let mut op = OperatorHandle::new("foo");
        op.register(DispatchKey::None, Kernel::new(fallback_impl)).unwrap();
        assert!(op.register(DispatchKey::None, Kernel::new(cpu_impl)).is_err());
    }
}
