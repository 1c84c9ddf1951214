//! Explicit registration phase.
//!
//! Backend modules expose named [`RegistrationUnit`]s. The host program
//! collects them into a [`Bootstrap`] and runs it once, before the first
//! dispatch. Units run in the order they were added, but each must be
//! correct in any order: [`Dispatcher::register`] defines missing operators,
//! so a kernel unit may run before the unit declaring its operator.
//!
//! A conflicting registration stops the bootstrap immediately and is
//! returned to the host, so two units can never silently shadow each other.
//!
//! # Example
//! ```rust
//! use briny_dispatch::{define_operators, register_kernels, Bootstrap, Dispatcher, DispatchKey};
//!
//! fn relu_cpu(x: f32) -> f32 {
//!     x.max(0.0)
//! }
//!
//! define_operators!(fn define_activations: "relu");
//! register_kernels! {
//!     fn register_cpu {
//!         "relu" @ Cpu => relu_cpu,
//!     }
//! }
//!
//! let registry = Dispatcher::new();
//! Bootstrap::new()
//!     .unit("cpu", register_cpu)
//!     .unit("activations", define_activations)
//!     .run(&registry)
//!     .unwrap();
//! assert!(registry.has_kernel("relu", DispatchKey::Cpu));
//! ```

use tracing::{debug, error};

use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Signature of a registration entry point.
pub type RegistrationFn = fn(&Dispatcher) -> Result<()>;

/// A named registration entry point of one backend module.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationUnit {
    name: &'static str,
    register: RegistrationFn,
}

impl RegistrationUnit {
    /// Pairs a unit name with its entry point.
    pub const fn new(name: &'static str, register: RegistrationFn) -> Self {
        Self { name, register }
    }

    /// Unit name, used in diagnostics and for de-duplication.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the entry point against `registry`.
    pub fn run(&self, registry: &Dispatcher) -> Result<()> {
        (self.register)(registry)
    }
}

/// Ordered set of registration units.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    units: Vec<RegistrationUnit>,
}

impl Bootstrap {
    /// Creates an empty bootstrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry point under `name`.
    pub fn unit(self, name: &'static str, register: RegistrationFn) -> Self {
        self.with(RegistrationUnit::new(name, register))
    }

    /// Adds a unit. A unit whose name is already present is skipped.
    pub fn with(mut self, unit: RegistrationUnit) -> Self {
        if self.units.iter().any(|u| u.name == unit.name) {
            debug!(unit = unit.name, "registration unit already queued");
        } else {
            self.units.push(unit);
        }
        self
    }

    /// Adds several units in order.
    pub fn extend(self, units: impl IntoIterator<Item = RegistrationUnit>) -> Self {
        units.into_iter().fold(self, Self::with)
    }

    /// Queued units, in run order.
    pub fn units(&self) -> &[RegistrationUnit] {
        &self.units
    }

    /// Runs every unit once, in order, stopping at the first failure.
    ///
    /// The registry remembers completed units by name, so a unit that
    /// already succeeded against `registry` (in this or an earlier
    /// bootstrap) is skipped. A failed unit is not recorded.
    ///
    /// # Errors
    /// - The first error returned by a unit, typically
    ///   [`DispatchError::ConflictingRegistration`](crate::error::DispatchError::ConflictingRegistration).
    pub fn run(self, registry: &Dispatcher) -> Result<()> {
        for unit in &self.units {
            if registry.has_run_unit(unit.name) {
                debug!(unit = unit.name, "registration unit already ran");
                continue;
            }
            debug!(unit = unit.name, "running registration unit");
            if let Err(err) = unit.run(registry) {
                error!(unit = unit.name, %err, "registration unit failed");
                return Err(err);
            }
            registry.mark_unit(unit.name);
        }
        debug!(
            units = self.units.len(),
            operators = registry.len(),
            "bootstrap complete"
        );
        Ok(())
    }

    /// Runs every unit against [`Dispatcher::global`].
    ///
    /// Units completed by an earlier global bootstrap are skipped, so each
    /// named unit runs at most once per process.
    #[cfg(feature = "global")]
    pub fn run_global(self) -> Result<&'static Dispatcher> {
        let registry = Dispatcher::global();
        self.run(registry)?;
        Ok(registry)
    }
}

/// Generates a registration unit that defines operators by name.
///
/// ```rust
/// use briny_dispatch::{define_operators, Dispatcher};
///
/// define_operators!(fn define_ops: "foo", "foo2");
///
/// let registry = Dispatcher::new();
/// define_ops(&registry).unwrap();
/// assert_eq!(registry.operators(), ["foo", "foo2"]);
/// ```
#[macro_export]
macro_rules! define_operators {
    ($(#[$meta:meta])* $vis:vis fn $unit:ident: $($op:expr),+ $(,)?) => {
        $(#[$meta])*
        $vis fn $unit(registry: &$crate::dispatch::Dispatcher) -> $crate::error::Result<()> {
            $( registry.define_operator($op); )+
            Ok(())
        }
    };
}

/// Generates a registration unit that installs kernels.
///
/// Each entry reads `operator @ KEY => callable`, where `KEY` is a
/// [`DispatchKey`](crate::backend::DispatchKey) variant.
#[macro_export]
macro_rules! register_kernels {
    ($(#[$meta:meta])* $vis:vis fn $unit:ident { $($op:literal @ $key:ident => $kernel:expr),+ $(,)? }) => {
        $(#[$meta])*
        $vis fn $unit(registry: &$crate::dispatch::Dispatcher) -> $crate::error::Result<()> {
            $(
                registry.register(
                    $op,
                    $crate::backend::DispatchKey::$key,
                    $crate::kernel::Kernel::new($kernel),
                )?;
            )+
            Ok(())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DispatchKey;
    use crate::error::DispatchError;

    fn one() -> u32 {
        1
    }
    fn two() -> u32 {
        2
    }

    define_operators!(fn define_num: "num");
    register_kernels! {
        fn register_one {
            "num" @ Cpu => one,
        }
    }
    register_kernels! {
        fn register_two {
            "num" @ Cpu => two,
        }
    }
    register_kernels! {
        fn register_fallback {
            "num" @ None => two,
            "other" @ Vulkan => one,
        }
    }

    #[test]
    fn kernel_unit_before_definition_unit() {
        let d = Dispatcher::new();
        Bootstrap::new()
            .unit("one", register_one)
            .unit("define", define_num)
            .run(&d)
            .unwrap();
        assert_eq!(d.call::<(), u32>("num", DispatchKey::Cpu, ()), Ok(1));
    }

    #[test]
    fn duplicate_unit_names_run_once() {
        let b = Bootstrap::new()
            .unit("one", register_one)
            .unit("one", register_two);
        assert_eq!(b.units().len(), 1);
        let d = Dispatcher::new();
        b.run(&d).unwrap();
        assert_eq!(d.call::<(), u32>("num", DispatchKey::Cpu, ()), Ok(1));
    }

    #[test]
    fn conflict_stops_bootstrap() {
        let d = Dispatcher::new();
        let err = Bootstrap::new()
            .unit("one", register_one)
            .unit("two", register_two)
            .unit("fallback", register_fallback)
            .run(&d)
            .unwrap_err();
        assert!(matches!(err, DispatchError::ConflictingRegistration { .. }));
        // units after the failing one never ran
        assert!(!d.has_definition("other"));
        assert!(!d.has_kernel("num", DispatchKey::None));
    }

    #[test]
    fn completed_units_are_skipped_by_later_bootstraps() {
        let d = Dispatcher::new();
        Bootstrap::new().unit("num", register_one).run(&d).unwrap();
        assert!(d.has_run_unit("num"));
        // same name, conflicting body: never runs again
        Bootstrap::new().unit("num", register_two).run(&d).unwrap();
        assert_eq!(d.call::<(), u32>("num", DispatchKey::Cpu, ()), Ok(1));
    }

    #[test]
    fn failed_unit_is_not_recorded() {
        let d = Dispatcher::new();
        register_one(&d).unwrap();
        assert!(Bootstrap::new().unit("two", register_two).run(&d).is_err());
        assert!(!d.has_run_unit("two"));
    }

    #[test]
    fn multi_entry_unit_registers_all() {
        let d = Dispatcher::new();
        register_fallback(&d).unwrap();
        assert_eq!(d.registered_keys("num"), Some(vec![DispatchKey::None]));
        assert_eq!(d.call::<(), u32>("num", DispatchKey::Rocm, ()), Ok(2));
        assert!(d.has_kernel("other", DispatchKey::Vulkan));
    }
}
