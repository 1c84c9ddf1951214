//! Two toy backends registering `foo` and `foo2`, then dispatching each
//! operator on both backends.
//!
//! ```text
//! RUST_LOG=briny_dispatch=debug cargo run --example foo_dispatch
//! ```

use briny_dispatch::{define_operators, Bootstrap, DispatchKey, Dispatcher};

mod cpu {
    use briny_dispatch::register_kernels;

    fn foo_cpu() {
        println!("FOO CPU");
    }

    fn foo2_cpu() {
        println!("FOO2 CPU");
    }

    register_kernels! {
        pub fn register {
            "foo" @ Cpu => foo_cpu,
            "foo2" @ Cpu => foo2_cpu,
        }
    }
}

mod cuda {
    use briny_dispatch::register_kernels;

    fn foo_cuda() {
        println!("FOO CUDA");
    }

    fn foo2_cuda() {
        println!("FOO2 CUDA");
    }

    register_kernels! {
        pub fn register {
            "foo" @ Cuda => foo_cuda,
            "foo2" @ Cuda => foo2_cuda,
        }
    }
}

define_operators!(fn define_foo_ops: "foo", "foo2");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let registry: &Dispatcher = Bootstrap::new()
        .unit("cpu", cpu::register)
        .unit("cuda", cuda::register)
        .unit("ops", define_foo_ops)
        .run_global()?;

    registry.call::<(), ()>("foo", DispatchKey::Cpu, ())?;
    registry.call::<(), ()>("foo", DispatchKey::Cuda, ())?;
    registry.call::<(), ()>("foo2", DispatchKey::Cpu, ())?;
    registry.call::<(), ()>("foo2", DispatchKey::Cuda, ())?;

    Ok(())
}
