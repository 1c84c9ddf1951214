//! Dispatch key module.
//!
//! This module defines the closed set of execution backends an operator
//! kernel can be registered for, and holds the process default key used by
//! [`Dispatcher::call_default`](crate::dispatch::Dispatcher::call_default).
//!
//! # Keys
//!
//! - `Cpu` — host execution (default).
//! - `Cuda` — NVIDIA accelerators.
//! - `Rocm` — AMD accelerators.
//! - `Vulkan` — portable GPU compute.
//! - `None` — not a target; the fallback slot of every operator.
//!
//! The default key is stored globally using an `AtomicU8`, so switching it
//! at runtime is cheap and never blocks a dispatch.

use crate::error::DispatchError;
use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

/// Identifier of an execution backend.
///
/// Discriminants are stable and double as table indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum DispatchKey {
    /// Host CPU (default).
    #[default]
    Cpu = 0,
    /// NVIDIA CUDA devices.
    Cuda = 1,
    /// AMD ROCm devices.
    Rocm = 2,
    /// Vulkan compute.
    Vulkan = 3,
    /// No backend specified; selects the fallback kernel.
    None = 31,
}

impl DispatchKey {
    /// Every real execution target, in index order. Excludes [`DispatchKey::None`].
    pub const BACKENDS: [Self; 4] = [Self::Cpu, Self::Cuda, Self::Rocm, Self::Vulkan];

    /// Stable numeric index of the key.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Diagnostic name of the key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Cuda => "CUDA",
            Self::Rocm => "ROCM",
            Self::Vulkan => "VULKAN",
            Self::None => "NONE",
        }
    }

    /// Whether the key names a real execution target.
    pub const fn is_backend(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for DispatchKey {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Cuda),
            2 => Ok(Self::Rocm),
            3 => Ok(Self::Vulkan),
            31 => Ok(Self::None),
            _ => Err(()),
        }
    }
}

impl FromStr for DispatchKey {
    type Err = DispatchError;

    /// Looks a key up by name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BACKENDS_AND_NONE
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DispatchError::UnknownDispatchKey { name: s.to_owned() })
    }
}

const BACKENDS_AND_NONE: [DispatchKey; 5] = [
    DispatchKey::Cpu,
    DispatchKey::Cuda,
    DispatchKey::Rocm,
    DispatchKey::Vulkan,
    DispatchKey::None,
];

/// Internal global state for the default dispatch key.
///
/// Relaxed ordering would do as well; the key only changes between
/// dispatches, never during one.
#[cfg(target_has_atomic = "8")]
static GLOBAL_DEFAULT_KEY: AtomicU8 = AtomicU8::new(DispatchKey::Cpu as u8);

/// A mutable non-atomic unsynchronized key for targets without 8-bit atomics.
///
/// It is assumed that this will not be accessed concurrently.
#[cfg(not(target_has_atomic = "8"))]
static mut UNSAFE_GLOBAL_KEY: u8 = DispatchKey::Cpu as u8;

/// Sets the key used by [`Dispatcher::call_default`](crate::dispatch::Dispatcher::call_default).
///
/// # Example
///
/// ```
/// use briny_dispatch::backend::{default_key, set_default_key, DispatchKey};
/// set_default_key(DispatchKey::Cuda);
/// assert_eq!(default_key(), DispatchKey::Cuda);
/// set_default_key(DispatchKey::Cpu);
/// ```
pub fn set_default_key(key: DispatchKey) {
    #[cfg(not(target_has_atomic = "8"))]
    unsafe {
        UNSAFE_GLOBAL_KEY = key as u8;
    }
    #[cfg(target_has_atomic = "8")]
    GLOBAL_DEFAULT_KEY.store(key as u8, Ordering::Release);
}

/// Returns the current default dispatch key.
///
/// If the stored value is invalid, defaults to [`DispatchKey::Cpu`].
pub fn default_key() -> DispatchKey {
    #[cfg(not(target_has_atomic = "8"))]
    {
        DispatchKey::try_from(unsafe { UNSAFE_GLOBAL_KEY }).unwrap_or_default()
    }
    #[cfg(target_has_atomic = "8")]
    DispatchKey::try_from(GLOBAL_DEFAULT_KEY.load(Ordering::Acquire)).unwrap_or_default()
}
