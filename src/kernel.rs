//! Type-erased kernels with signature descriptors.
//!
//! A [`Kernel`] stores any `Fn(A1, .., An) -> R` behind an `Arc<dyn Any>`
//! together with the [`Signature`] it was built from. Dispatch recovers the
//! concrete callable only when the caller asks for exactly that signature,
//! so an incorrectly typed call is reported instead of executed.
//!
//! # Identity
//!
//! Registering the same kernel twice for one operator and key is allowed.
//! "The same" means:
//!
//! - for function pointers (`fn(A) -> R`), the same address;
//! - for zero-sized callables (function items, non-capturing closures), the
//!   same type;
//! - for anything else, a clone of the same [`Kernel`] value.
//!
//! A function item and a pointer to the same function are different kernels:
//! generic code cannot coerce an item to its pointer. Register one form per
//! function, e.g. always `foo as fn()` when kernels come from a table.
//!
//! # Arguments
//!
//! Argument and return types must be `'static`, since signatures are keyed
//! on [`TypeId`]. Kernels cannot borrow their inputs (`fn(&[f32]) -> f32` is
//! not accepted); pass owned or shared data such as `Vec<f32>` or
//! `Arc<[f32]>` instead.
//!
//! # Example
//!
//! ```rust
//! use briny_dispatch::kernel::Kernel;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let kernel = Kernel::new(add);
//! assert_eq!(kernel.invoke::<(i32, i32), i32>((2, 3)), Some(5));
//! assert_eq!(kernel.invoke::<(i64, i64), i64>((2, 3)), None);
//! assert!(kernel.is_identical(&Kernel::new(add)));
//! ```

use core::any::{type_name, Any, TypeId};
use core::fmt;
use std::sync::Arc;

/// The boxed callable a kernel erases. Arguments travel as one tuple.
pub type KernelFn<Args, R> = dyn Fn(Args) -> R + Send + Sync;

/// Argument and return types captured when a kernel is built.
#[derive(Clone, Copy)]
pub struct Signature {
    args: TypeId,
    ret: TypeId,
    args_name: &'static str,
    ret_name: &'static str,
}

impl Signature {
    /// Signature of a kernel taking the tuple `Args` and returning `R`.
    pub fn of<Args: 'static, R: 'static>() -> Self {
        Self {
            args: TypeId::of::<Args>(),
            ret: TypeId::of::<R>(),
            args_name: type_name::<Args>(),
            ret_name: type_name::<R>(),
        }
    }

    /// Type name of the argument tuple.
    pub fn args_name(&self) -> &'static str {
        self.args_name
    }

    /// Type name of the return value.
    pub fn return_name(&self) -> &'static str {
        self.ret_name
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.args == other.args && self.ret == other.ret
    }
}

impl Eq for Signature {}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // one-element tuples render as `(T,)`
        match self.args_name.strip_suffix(",)") {
            Some(single) => write!(f, "fn{single}) -> {}", self.ret_name),
            None => write!(f, "fn{} -> {}", self.args_name, self.ret_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KernelId {
    Pointer(usize),
    Item(TypeId),
    Instance(usize),
}

/// A registered implementation of an operator for one dispatch key.
#[derive(Clone)]
pub struct Kernel {
    signature: Signature,
    id: KernelId,
    func: Arc<dyn Any + Send + Sync>,
}

impl Kernel {
    /// Wraps a callable, capturing its signature.
    pub fn new<Args, R, F>(f: F) -> Self
    where
        Args: 'static,
        R: 'static,
        F: IntoKernel<Args, R>,
    {
        let known = match f.fn_ptr_addr() {
            Some(addr) => Some(KernelId::Pointer(addr)),
            None => (core::mem::size_of::<F>() == 0).then(|| KernelId::Item(TypeId::of::<F>())),
        };
        let func: Arc<dyn Any + Send + Sync> = Arc::new(f.into_kernel_fn());
        let id = known
            .unwrap_or_else(|| KernelId::Instance(Arc::as_ptr(&func) as *const () as usize));
        Self {
            signature: Signature::of::<Args, R>(),
            id,
            func,
        }
    }

    /// Signature captured at construction.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Whether `other` is the same implementation as `self`.
    pub fn is_identical(&self, other: &Self) -> bool {
        self.id == other.id && self.signature == other.signature
    }

    /// Calls the kernel if `Args -> R` is its signature.
    ///
    /// Returns `None` without calling anything on a mismatch.
    pub fn invoke<Args: 'static, R: 'static>(&self, args: Args) -> Option<R> {
        if self.signature != Signature::of::<Args, R>() {
            return None;
        }
        let f = self.func.downcast_ref::<Box<KernelFn<Args, R>>>()?;
        Some(f(args))
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("signature", &self.signature)
            .field("id", &self.id)
            .finish()
    }
}

/// Conversion of a plain callable into an erased kernel body.
///
/// Implemented for every `Fn(A1, .., An) -> R + Send + Sync + 'static` with
/// up to six arguments. `Args` is the argument tuple.
pub trait IntoKernel<Args, R>: Send + Sync + 'static {
    /// Boxes `self` as a tuple-taking callable.
    fn into_kernel_fn(self) -> Box<KernelFn<Args, R>>;

    /// Address of `self` when it is a plain function pointer.
    fn fn_ptr_addr(&self) -> Option<usize>;
}

macro_rules! impl_into_kernel {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> IntoKernel<($($arg,)*), R> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: 'static,
            $($arg: 'static,)*
        {
            #[allow(non_snake_case)]
            fn into_kernel_fn(self) -> Box<KernelFn<($($arg,)*), R>> {
                Box::new(move |($($arg,)*)| self($($arg),*))
            }

            fn fn_ptr_addr(&self) -> Option<usize> {
                (self as &dyn Any)
                    .downcast_ref::<fn($($arg),*) -> R>()
                    .map(|f| *f as usize)
            }
        }
    };
}

impl_into_kernel!();
impl_into_kernel!(A1);
impl_into_kernel!(A1, A2);
impl_into_kernel!(A1, A2, A3);
impl_into_kernel!(A1, A2, A3, A4);
impl_into_kernel!(A1, A2, A3, A4, A5);
impl_into_kernel!(A1, A2, A3, A4, A5, A6);
