//! Guest side of the wasm-host string convention.
//!
//! Build with `cargo build -p greeter-fixture --target wasm32-unknown-unknown --release`
//! and point `wasm-host` at the resulting `.wasm`.
//!
//! Strings are UTF-16LE. Incoming strings are sized by the allocation header
//! (the host writes no terminator); outgoing strings end with a zero unit.

use std::alloc::{alloc, dealloc, Layout};

/// Bytes in front of every allocation holding its requested size.
const HEADER: usize = 4;

// ---------------------------------------------------------------------------
// Host imports
// ---------------------------------------------------------------------------

#[cfg(target_arch = "wasm32")]
#[link(wasm_import_module = "env")]
extern "C" {
    #[link_name = "abort"]
    fn host_abort(message: *const u16, filename: *const u16, line: u32, column: u32);
}

fn report_abort(message: &str, line: u32, column: u32) {
    let message = to_guest_string(message);
    let filename = to_guest_string(file!());
    #[cfg(target_arch = "wasm32")]
    unsafe {
        host_abort(message.as_ptr(), filename.as_ptr(), line, column);
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (message, filename);
        eprintln!("greeter: abort at {line}:{column}");
    }
}

// ---------------------------------------------------------------------------
// Allocator exports: the host allocates argument buffers through these
// ---------------------------------------------------------------------------

fn layout_for(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.checked_add(HEADER)?, HEADER).ok()
}

/// Allocate `size` bytes of guest memory and return the pointer.
///
/// Returns null (after reporting through `abort`) for negative sizes.
#[no_mangle]
pub extern "C" fn allocate(size: i32) -> *mut u8 {
    let Some(layout) = usize::try_from(size).ok().and_then(layout_for) else {
        report_abort("invalid allocation size", line!(), column!());
        return std::ptr::null_mut();
    };
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            return base;
        }
        (base as *mut u32).write(size as u32);
        base.add(HEADER)
    }
}

/// Free memory returned by [`allocate`].
///
/// # Safety
///
/// `ptr` must come from `allocate` and must not have been freed already.
#[no_mangle]
pub unsafe extern "C" fn deallocate(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let size = allocation_size(ptr);
    if let Some(layout) = layout_for(size) {
        dealloc(ptr.sub(HEADER), layout);
    }
}

/// # Safety
///
/// `ptr` must come from `allocate`.
unsafe fn allocation_size(ptr: *const u8) -> usize {
    (ptr.sub(HEADER) as *const u32).read() as usize
}

// ---------------------------------------------------------------------------
// Guest API
// ---------------------------------------------------------------------------

/// Return a newly allocated, zero-terminated `"Hello, <name>"`.
///
/// # Safety
///
/// `name` must come from `allocate` and hold UTF-16LE code units.
#[no_mangle]
pub unsafe extern "C" fn greet(name: *const u8) -> *mut u8 {
    if name.is_null() {
        report_abort("greet called with a null name", line!(), column!());
        return std::ptr::null_mut();
    }
    let bytes = std::slice::from_raw_parts(name, allocation_size(name));
    let name = read_units(bytes);
    let mut greeting: Vec<u16> = "Hello, ".encode_utf16().collect();
    greeting.extend(name.iter().copied().take_while(|&unit| unit != 0));
    greeting.push(0);
    write_guest_string(&greeting)
}

#[no_mangle]
pub extern "C" fn add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_guest_string(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn read_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn write_guest_string(units: &[u16]) -> *mut u8 {
    let ptr = allocate((units.len() * 2) as i32);
    if ptr.is_null() {
        return ptr;
    }
    let dst = unsafe { std::slice::from_raw_parts_mut(ptr, units.len() * 2) };
    for (slot, unit) in dst.chunks_exact_mut(2).zip(units) {
        slot.copy_from_slice(&unit.to_le_bytes());
    }
    ptr
}
