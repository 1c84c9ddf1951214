//! briny_dispatch: a minimal multi-backend operator dispatch registry.
//!
//! Independently written backend modules register concrete kernels of a
//! named operator for a [`DispatchKey`], and callers invoke the operator by
//! name and key without knowing which implementation runs.
//!
//! # Features
//!
//! - Per-operator kernel tables with a shared fallback (`DispatchKey::None`) slot.
//! - Conflict detection: two different kernels can never shadow each other.
//! - Typed dispatch: every kernel carries its signature, checked on each call.
//! - An explicit, ordered [`Bootstrap`] phase instead of static initializers.
//!
//! # Modules
//!
//! - [`backend`] — Dispatch keys and the process default key.
//! - [`kernel`] — Type-erased kernels and signature descriptors.
//! - [`operator`] — Kernel table of one operator.
//! - [`dispatch`] — The registry and typed dispatch.
//! - [`bootstrap`] — Registration units and the registration phase.
//! - [`error`] — The error type shared by all of the above.
//!
//! # Feature Flags
//!
//! - `global` *(default)* — Enables [`Dispatcher::global`], a lazily created
//!   process-wide registry.
//!
//! # Example
//!
//! ```rust
//! use briny_dispatch::{DispatchError, DispatchKey, Dispatcher, Kernel};
//!
//! fn double_cpu(x: f64) -> f64 {
//!     x * 2.0
//! }
//! fn double_any(x: f64) -> f64 {
//!     x + x
//! }
//!
//! let registry = Dispatcher::new();
//! registry.register("double", DispatchKey::Cpu, Kernel::new(double_cpu))?;
//! registry.register("double", DispatchKey::None, Kernel::new(double_any))?;
//!
//! let y: f64 = registry.call("double", DispatchKey::Vulkan, (1.5,))?;
//! assert_eq!(y, 3.0);
//!
//! let missing = registry.call::<(f64,), f64>("triple", DispatchKey::Cpu, (1.0,));
//! assert!(matches!(missing, Err(DispatchError::UnknownOperator { .. })));
//! # Ok::<(), DispatchError>(())
//! ```

pub mod backend;
pub mod error;
pub mod kernel;
pub mod operator;
pub mod dispatch;
pub mod bootstrap;

pub use backend::DispatchKey;
pub use bootstrap::{Bootstrap, RegistrationFn, RegistrationUnit};
pub use dispatch::Dispatcher;
pub use error::{DispatchError, Result};
pub use kernel::{IntoKernel, Kernel, Signature};
pub use operator::OperatorHandle;
