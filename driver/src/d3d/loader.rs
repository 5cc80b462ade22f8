//! Locate a module exporting `D3DCompile` and bind it.
//!
//! Search order: modules already mapped into the process (Windows only, and
//! skipped when an explicit override is set), then each candidate name in
//! turn. The first module that opens wins; a module without the entry point
//! is an error rather than a reason to keep looking.

use std::ffi::CString;
use std::ptr;

use libloading::Library;
use tracing::debug;

use super::ffi::{BlobRef, D3DCompileFn, ID3DBlob, D3D_COMPILE_SYMBOL};
use crate::capability::{
    CompileRequest, CompilerLoader, Invocation, LoadOutcome, ShaderBlob, ShaderCompiler,
};
use crate::error::LoadError;
use crate::flags::HResult;

/// Environment variable naming an explicit compiler module to try first.
pub const COMPILER_PATH_ENV: &str = "D3DCOMPILER_PATH";

/// Modules to `LoadLibrary` on this platform.
pub fn default_module_names() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &["d3dcompiler_47.dll"]
    } else if cfg!(target_os = "linux") {
        &["libvkd3d-utils.so.1", "libvkd3d-utils.so"]
    } else if cfg!(target_os = "macos") {
        &["libvkd3d-utils.1.dylib", "libvkd3d-utils.dylib"]
    } else {
        &[]
    };
    names.iter().map(|n| n.to_string()).collect()
}

/// Compiler versions an embedding application may already have loaded.
pub fn default_preloaded_names() -> Vec<String> {
    if cfg!(windows) {
        ["d3dcompiler_47.dll", "d3dcompiler_46.dll", "d3dcompiler_43.dll"]
            .iter()
            .map(|n| n.to_string())
            .collect()
    } else {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D3DCompilerLoader {
    /// Names or paths handed to the dynamic loader, in order.
    pub module_names: Vec<String>,
    /// Names looked up among already-loaded modules before loading anything.
    pub preloaded_names: Vec<String>,
}

impl Default for D3DCompilerLoader {
    fn default() -> Self {
        Self {
            module_names: default_module_names(),
            preloaded_names: default_preloaded_names(),
        }
    }
}

impl D3DCompilerLoader {
    pub fn new(module_names: Vec<String>) -> Self {
        Self {
            module_names,
            preloaded_names: Vec::new(),
        }
    }

    pub fn with_preloaded(mut self, names: Vec<String>) -> Self {
        self.preloaded_names = names;
        self
    }

    /// Platform defaults, with `D3DCOMPILER_PATH` tried first when set.
    pub fn from_env() -> Self {
        Self::default().with_override(std::env::var(COMPILER_PATH_ENV).ok())
    }

    /// Put `path` at the front of the candidate list.
    ///
    /// An explicit module also disables the already-loaded lookup, otherwise
    /// a mapped `d3dcompiler_47.dll` would shadow it.
    pub fn with_override(mut self, path: Option<String>) -> Self {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            self.module_names.retain(|n| *n != path);
            self.module_names.insert(0, path);
            self.preloaded_names.clear();
        }
        self
    }

    /// Preloaded names that are actually looked up on this platform.
    fn searched_preloaded(&self) -> &[String] {
        if cfg!(windows) {
            &self.preloaded_names
        } else {
            &[]
        }
    }

    fn candidates(&self) -> Vec<String> {
        self.searched_preloaded()
            .iter()
            .chain(&self.module_names)
            .cloned()
            .collect()
    }

    #[cfg(windows)]
    fn find_preloaded(&self) -> Option<(String, Library)> {
        use libloading::os::windows;

        self.searched_preloaded().iter().find_map(|name| {
            match windows::Library::open_already_loaded(name) {
                Ok(library) => {
                    debug!(module = %name, "Using already-loaded compiler module");
                    Some((name.clone(), library.into()))
                }
                Err(_) => None,
            }
        })
    }

    #[cfg(not(windows))]
    fn find_preloaded(&self) -> Option<(String, Library)> {
        None
    }

    fn open_first(&self) -> Option<(String, Library)> {
        self.module_names.iter().find_map(|name| {
            // SAFETY: loading runs the module's initializers; compiler modules
            // have no initialization requirements beyond the loader lock.
            match unsafe { Library::new(name) } {
                Ok(library) => {
                    debug!(module = %name, "Loaded compiler module");
                    Some((name.clone(), library))
                }
                Err(e) => {
                    debug!(module = %name, error = %e, "Compiler module not loadable");
                    None
                }
            }
        })
    }
}

impl CompilerLoader for D3DCompilerLoader {
    type Compiler = D3DCompiler;

    fn load(&self) -> Result<LoadOutcome<D3DCompiler>, LoadError> {
        if self.module_names.is_empty() && self.searched_preloaded().is_empty() {
            return Ok(LoadOutcome::Unsupported);
        }

        let (module, library) = self
            .find_preloaded()
            .or_else(|| self.open_first())
            .ok_or_else(|| LoadError::ModuleNotFound {
                candidates: self.candidates(),
            })?;

        D3DCompiler::bind(module, library).map(LoadOutcome::Loaded)
    }
}

/// A loaded compiler module and its resolved `D3DCompile`.
///
/// The function pointer is only valid while `_library` is alive; both live
/// and die together here.
pub struct D3DCompiler {
    module: String,
    compile_fn: D3DCompileFn,
    _library: Library,
}

impl D3DCompiler {
    fn bind(module: String, library: Library) -> Result<Self, LoadError> {
        // SAFETY: the symbol's type matches the documented D3DCompile ABI.
        let compile_fn = unsafe {
            let symbol = library
                .get::<D3DCompileFn>(D3D_COMPILE_SYMBOL)
                .map_err(|e| LoadError::SymbolMissing {
                    module: module.clone(),
                    symbol: "D3DCompile".to_string(),
                    reason: e.to_string(),
                })?;
            *symbol
        };

        Ok(Self {
            module,
            compile_fn,
            _library: library,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

impl std::fmt::Debug for D3DCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3DCompiler")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl ShaderCompiler for D3DCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Invocation {
        let (Ok(source_name), Ok(entry_point), Ok(target)) = (
            CString::new(request.source_name),
            CString::new(request.entry_point),
            CString::new(request.target),
        ) else {
            return Invocation::failed(HResult::E_INVALIDARG)
                .with_diagnostics("compile arguments contain an interior NUL byte");
        };

        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        // SAFETY: every pointer outlives the call; defines and include are
        // allowed to be null.
        let hr = unsafe {
            (self.compile_fn)(
                request.source.as_ptr().cast(),
                request.source.len(),
                source_name.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                entry_point.as_ptr(),
                target.as_ptr(),
                request.flags1.bits(),
                request.flags2,
                &mut code,
                &mut errors,
            )
        };

        // SAFETY: out-parameters are either null or blobs we now own.
        let (code, errors) = unsafe { (BlobRef::from_raw(code), BlobRef::from_raw(errors)) };

        let diagnostics = errors.map(|blob| blob.to_message());
        let blob = code.map(|blob| ShaderBlob::new(blob.as_bytes().to_vec()));

        Invocation::from_hresult(HResult(hr), blob, diagnostics)
    }

    fn describe(&self) -> String {
        format!("D3DCompile from {}", self.module)
    }
}
