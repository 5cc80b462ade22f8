//! Raw `D3DCompile` ABI.
//!
//! Only what one call needs: the function signature and enough of the
//! `ID3DBlob` COM vtable to read and release a blob.

use std::ffi::{c_char, c_void};
use std::ptr::NonNull;

/// `pD3DCompile` from `d3dcompiler.h`.
pub type D3DCompileFn = unsafe extern "system" fn(
    src_data: *const c_void,
    src_data_size: usize,
    source_name: *const c_char,
    defines: *const c_void,
    include: *mut c_void,
    entrypoint: *const c_char,
    target: *const c_char,
    flags1: u32,
    flags2: u32,
    code: *mut *mut ID3DBlob,
    error_msgs: *mut *mut ID3DBlob,
) -> i32;

/// NUL-terminated so libloading can skip its own copy.
pub const D3D_COMPILE_SYMBOL: &[u8] = b"D3DCompile\0";

#[repr(C)]
pub struct ID3DBlob {
    vtbl: *const ID3DBlobVtbl,
}

#[repr(C)]
struct ID3DBlobVtbl {
    _query_interface:
        unsafe extern "system" fn(*mut ID3DBlob, *const c_void, *mut *mut c_void) -> i32,
    _add_ref: unsafe extern "system" fn(*mut ID3DBlob) -> u32,
    release: unsafe extern "system" fn(*mut ID3DBlob) -> u32,
    get_buffer_pointer: unsafe extern "system" fn(*mut ID3DBlob) -> *mut c_void,
    get_buffer_size: unsafe extern "system" fn(*mut ID3DBlob) -> usize,
}

/// Owned blob reference; released on drop.
pub struct BlobRef(NonNull<ID3DBlob>);

impl BlobRef {
    /// Take ownership of a blob returned through an out-parameter.
    ///
    /// # Safety
    /// `ptr` must be null or a live `ID3DBlob` whose reference the caller
    /// owns.
    pub unsafe fn from_raw(ptr: *mut ID3DBlob) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    fn vtbl(&self) -> &ID3DBlobVtbl {
        // SAFETY: a live COM object always points at its vtable.
        unsafe { &*(*self.0.as_ptr()).vtbl }
    }

    pub fn as_bytes(&self) -> &[u8] {
        let vtbl = self.vtbl();
        // SAFETY: the blob owns `size` bytes at `ptr` for as long as we hold it.
        unsafe {
            let ptr = (vtbl.get_buffer_pointer)(self.0.as_ptr());
            let size = (vtbl.get_buffer_size)(self.0.as_ptr());
            if ptr.is_null() || size == 0 {
                &[]
            } else {
                std::slice::from_raw_parts(ptr.cast::<u8>(), size)
            }
        }
    }

    /// Compiler messages are NUL-terminated ANSI text.
    pub fn to_message(&self) -> String {
        String::from_utf8_lossy(self.as_bytes())
            .trim_end_matches('\0')
            .to_string()
    }
}

impl Drop for BlobRef {
    fn drop(&mut self) {
        let release = self.vtbl().release;
        // SAFETY: we own exactly one reference.
        unsafe {
            release(self.0.as_ptr());
        }
    }
}

/// Heap-backed `ID3DBlob` for exercising the FFI path without a compiler.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::Cell;
    use std::ffi::c_void;

    use super::{ID3DBlob, ID3DBlobVtbl};

    thread_local! {
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    #[repr(C)]
    struct FakeBlob {
        base: ID3DBlob,
        data: Vec<u8>,
        null_buffer: bool,
    }

    static VTBL: ID3DBlobVtbl = ID3DBlobVtbl {
        _query_interface: query_interface,
        _add_ref: add_ref,
        release,
        get_buffer_pointer,
        get_buffer_size,
    };

    unsafe extern "system" fn query_interface(
        _this: *mut ID3DBlob,
        _iid: *const c_void,
        out: *mut *mut c_void,
    ) -> i32 {
        *out = std::ptr::null_mut();
        // E_NOINTERFACE
        0x8000_4002_u32 as i32
    }

    unsafe extern "system" fn add_ref(_this: *mut ID3DBlob) -> u32 {
        2
    }

    unsafe extern "system" fn release(this: *mut ID3DBlob) -> u32 {
        drop(Box::from_raw(this.cast::<FakeBlob>()));
        RELEASED.with(|n| n.set(n.get() + 1));
        0
    }

    unsafe extern "system" fn get_buffer_pointer(this: *mut ID3DBlob) -> *mut c_void {
        let blob = &mut *this.cast::<FakeBlob>();
        if blob.null_buffer {
            std::ptr::null_mut()
        } else {
            blob.data.as_mut_ptr().cast()
        }
    }

    unsafe extern "system" fn get_buffer_size(this: *mut ID3DBlob) -> usize {
        (*this.cast::<FakeBlob>()).data.len()
    }

    fn alloc(data: &[u8], null_buffer: bool) -> *mut ID3DBlob {
        let blob = Box::new(FakeBlob {
            base: ID3DBlob { vtbl: &VTBL },
            data: data.to_vec(),
            null_buffer,
        });
        Box::into_raw(blob).cast()
    }

    /// A blob holding `data`; freed by its own `Release`.
    pub(crate) fn blob(data: &[u8]) -> *mut ID3DBlob {
        alloc(data, false)
    }

    /// A blob reporting `len` bytes behind a null buffer pointer.
    pub(crate) fn null_buffer_blob(len: usize) -> *mut ID3DBlob {
        alloc(&vec![0; len], true)
    }

    /// `Release` calls made on this thread so far.
    pub(crate) fn released() -> usize {
        RELEASED.with(Cell::get)
    }
}
