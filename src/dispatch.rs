//! Operator Dispatch Layer
//!
//! The [`Dispatcher`] owns every [`OperatorHandle`] and routes calls by
//! operator name and [`DispatchKey`]. Resolution order for a call is:
//! 1. the kernel registered for the exact key,
//! 2. the operator's fallback (`DispatchKey::None`) kernel,
//! 3. otherwise [`DispatchError::NoKernelForKey`].
//!
//! # Concurrency
//! Registration takes the table's write lock; dispatch takes the read lock
//! only long enough to clone the resolved kernel, then calls it unlocked.
//! A kernel may therefore dispatch other operators. Operators are inserted
//! fully built, so readers never see one without its fallback slot.
//!
//! # Example
//! ```rust
//! use briny_dispatch::{Dispatcher, DispatchKey, Kernel};
//!
//! fn relu_cpu(x: f32) -> f32 {
//!     x.max(0.0)
//! }
//!
//! let registry = Dispatcher::new();
//! registry.register("relu", DispatchKey::Cpu, Kernel::new(relu_cpu)).unwrap();
//! let y: f32 = registry.call("relu", DispatchKey::Cpu, (-2.0f32,)).unwrap();
//! assert_eq!(y, 0.0);
//! ```

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::backend::{default_key, DispatchKey};
use crate::error::{DispatchError, Result};
use crate::kernel::{Kernel, Signature};
use crate::operator::OperatorHandle;

/// Registry of operators and their per-key kernels.
#[derive(Debug, Default)]
pub struct Dispatcher {
    ops: RwLock<HashMap<String, OperatorHandle>>,
    units: Mutex<HashSet<&'static str>>,
}

#[cfg(feature = "global")]
lazy_static::lazy_static! {
    static ref GLOBAL_DISPATCHER: Dispatcher = Dispatcher::new();
}

impl Dispatcher {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    ///
    /// Created on first use and never torn down. Nothing in this crate
    /// requires it; pass an explicit [`Dispatcher`] where isolation matters.
    #[cfg(feature = "global")]
    pub fn global() -> &'static Dispatcher {
        &GLOBAL_DISPATCHER
    }

    /// Ensures an operator named `name` exists. Defining twice is a no-op.
    pub fn define_operator(&self, name: &str) {
        let mut ops = self.ops.write();
        if !ops.contains_key(name) {
            debug!(operator = name, "defining operator");
            ops.insert(name.to_owned(), OperatorHandle::new(name));
        }
    }

    /// Whether an operator named `name` exists.
    pub fn has_definition(&self, name: &str) -> bool {
        self.ops.read().contains_key(name)
    }

    /// Whether `name` has a kernel installed for exactly `key`.
    pub fn has_kernel(&self, name: &str, key: DispatchKey) -> bool {
        self.ops
            .read()
            .get(name)
            .is_some_and(|op| op.has_definition(key))
    }

    /// Registers `kernel` for `name` under `key`, defining the operator if
    /// needed.
    ///
    /// # Errors
    /// - [`DispatchError::ConflictingRegistration`] if a different kernel is
    ///   already registered for the pair.
    pub fn register(&self, name: &str, key: DispatchKey, kernel: Kernel) -> Result<()> {
        let mut ops = self.ops.write();
        let op = ops
            .entry(name.to_owned())
            .or_insert_with(|| OperatorHandle::new(name));
        let signature = kernel.signature();
        match op.register(key, kernel) {
            Ok(true) => {
                debug!(operator = name, %key, %signature, "registered kernel");
                Ok(())
            }
            Ok(false) => {
                trace!(operator = name, %key, "kernel already registered");
                Ok(())
            }
            Err(err) => {
                warn!(operator = name, %key, "conflicting kernel registration");
                Err(err)
            }
        }
    }

    /// Resolves the kernel `call` would run, without running it.
    ///
    /// # Errors
    /// - [`DispatchError::UnknownOperator`] if `name` was never defined.
    /// - [`DispatchError::NoKernelForKey`] if no kernel or fallback exists.
    pub fn resolve(&self, name: &str, key: DispatchKey) -> Result<Kernel> {
        let ops = self.ops.read();
        let op = ops.get(name).ok_or_else(|| DispatchError::UnknownOperator {
            operator: name.to_owned(),
        })?;
        match op.get(key) {
            Some(kernel) => {
                if !op.has_definition(key) {
                    trace!(operator = name, %key, "using fallback kernel");
                }
                Ok(kernel.clone())
            }
            None => Err(DispatchError::NoKernelForKey {
                operator: name.to_owned(),
                key,
            }),
        }
    }

    /// Invokes operator `name` for `key` with the argument tuple `args`.
    ///
    /// `Args` and `R` must match the signature the kernel was registered
    /// with exactly.
    ///
    /// # Errors
    /// - [`DispatchError::UnknownOperator`] if `name` was never defined.
    /// - [`DispatchError::NoKernelForKey`] if no kernel or fallback exists.
    /// - [`DispatchError::SignatureMismatch`] if `Args -> R` differs from the
    ///   registered signature. The kernel is not called.
    pub fn call<Args: 'static, R: 'static>(
        &self,
        name: &str,
        key: DispatchKey,
        args: Args,
    ) -> Result<R> {
        let kernel = self.resolve(name, key)?;
        trace!(operator = name, %key, "dispatching");
        kernel.invoke::<Args, R>(args).ok_or_else(|| {
            let requested = Signature::of::<Args, R>();
            warn!(
                operator = name,
                %key,
                registered = %kernel.signature(),
                %requested,
                "kernel signature mismatch"
            );
            DispatchError::SignatureMismatch {
                operator: name.to_owned(),
                key,
                registered: kernel.signature().to_string(),
                requested: requested.to_string(),
            }
        })
    }

    /// Like [`Dispatcher::call`] with the process default key.
    pub fn call_default<Args: 'static, R: 'static>(&self, name: &str, args: Args) -> Result<R> {
        self.call(name, default_key(), args)
    }

    /// Whether a registration unit named `unit` already completed against
    /// this registry.
    pub fn has_run_unit(&self, unit: &str) -> bool {
        self.units.lock().contains(unit)
    }

    pub(crate) fn mark_unit(&self, unit: &'static str) {
        self.units.lock().insert(unit);
    }

    /// Names of all defined operators, sorted.
    pub fn operators(&self) -> Vec<String> {
        let mut names: Vec<_> = self.ops.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Keys with an installed kernel for `name`, or `None` if undefined.
    pub fn registered_keys(&self, name: &str) -> Option<Vec<DispatchKey>> {
        self.ops.read().get(name).map(OperatorHandle::keys)
    }

    /// Number of defined operators.
    pub fn len(&self) -> usize {
        self.ops.read().len()
    }

    /// Whether no operator is defined.
    pub fn is_empty(&self) -> bool {
        self.ops.read().is_empty()
    }
}
