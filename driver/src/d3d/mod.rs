//! System HLSL compiler bound at runtime through `libloading`.

mod ffi;
pub mod loader;

pub use loader::{
    default_module_names, default_preloaded_names, D3DCompiler, D3DCompilerLoader,
    COMPILER_PATH_ENV,
};
