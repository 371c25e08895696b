//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use todo_sync::{InitOutcome, Store, StoreError, TodoItem};

/// Opaque handle to a `Store` and the runtime that drives it. C callers
/// receive a pointer to this and pass it back into every FFI function.
pub struct FfiTodoStore {
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) store: Store,
}

/// Copy `s` into a heap C string owned by the caller.
///
/// Interior NUL bytes cannot be represented and are dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let c = CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c.into_raw()
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiTodoResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    Auth = 2,
    Signup = 3,
    Storage = 4,
    MissingCredential = 5,
    Api = 6,
    Deserialization = 7,
    Serialization = 8,
    NullArg = 9,
    InvalidArg = 10,
    Panic = 11,
}

/// Tag that tells `todo_free_result` what `FfiTodoResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Todo = 1,
    TodoList = 2,
    InitOutcome = 3,
}

/// How `todo_store_initialize` resolved the persisted session.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiInitOutcome {
    Anonymous = 0,
    Restored = 1,
    Rejected = 2,
}

impl From<InitOutcome> for FfiInitOutcome {
    fn from(outcome: InitOutcome) -> Self {
        match outcome {
            InitOutcome::Anonymous => FfiInitOutcome::Anonymous,
            InitOutcome::Restored => FfiInitOutcome::Restored,
            InitOutcome::Rejected => FfiInitOutcome::Rejected,
        }
    }
}

/// A single todo item exposed to C. Ids travel as text.
#[repr(C)]
pub struct FfiTodo {
    pub id: *mut c_char,
    pub title: *mut c_char,
    pub description: *mut c_char,
}

impl FfiTodo {
    fn from_core(item: TodoItem) -> Self {
        FfiTodo {
            id: into_c_string(item.id.to_string()),
            title: into_c_string(item.title),
            description: into_c_string(item.description),
        }
    }
}

/// A list of todo items exposed to C.
#[repr(C)]
pub struct FfiTodoList {
    pub items: *mut FfiTodo,
    pub len: u32,
}

/// Result envelope for every store operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null. `http_status` is set only
/// for `Api` errors.
#[repr(C)]
pub struct FfiTodoResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiTodoResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiTodoResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn failure(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiTodoResult {
            error_code,
            error_message: into_c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build a success result carrying a single `FfiTodo`.
    pub(crate) fn ok_todo(item: TodoItem) -> *mut Self {
        let ffi_todo = Box::new(FfiTodo::from_core(item));
        Self::ok(FfiDataTag::Todo, Box::into_raw(ffi_todo) as *mut c_void)
    }

    /// Build a success result carrying a `FfiTodoList`.
    pub(crate) fn ok_todo_list(items: Vec<TodoItem>) -> *mut Self {
        let len = items.len() as u32;
        let ffi_todos: Box<[FfiTodo]> = items.into_iter().map(FfiTodo::from_core).collect();
        let items = if ffi_todos.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(ffi_todos) as *mut FfiTodo
        };

        let ffi_list = Box::new(FfiTodoList { items, len });
        Self::ok(FfiDataTag::TodoList, Box::into_raw(ffi_list) as *mut c_void)
    }

    pub(crate) fn ok_init(outcome: InitOutcome) -> *mut Self {
        let outcome = Box::new(FfiInitOutcome::from(outcome));
        Self::ok(FfiDataTag::InitOutcome, Box::into_raw(outcome) as *mut c_void)
    }

    /// Build a success result with no data payload (e.g. delete).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    /// Build an error result from a `StoreError`.
    ///
    /// Auth, signup and API failures carry the server's message verbatim.
    pub(crate) fn from_error(err: StoreError) -> *mut Self {
        let (error_code, http_status) = match &err {
            StoreError::Transport(_) => (FfiErrorCode::Transport, 0),
            StoreError::Auth(_) => (FfiErrorCode::Auth, 0),
            StoreError::Signup(_) => (FfiErrorCode::Signup, 0),
            StoreError::Storage(_) => (FfiErrorCode::Storage, 0),
            StoreError::MissingCredential => (FfiErrorCode::MissingCredential, 0),
            StoreError::Api { status, .. } => (FfiErrorCode::Api, *status),
            StoreError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            StoreError::Serialization(_) => (FfiErrorCode::Serialization, 0),
        };
        let msg = match err {
            StoreError::Auth(message)
            | StoreError::Signup(message)
            | StoreError::Api { message, .. } => message,
            other => other.to_string(),
        };
        Self::failure(error_code, http_status, msg)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for an argument that is not valid UTF-8 or is
    /// otherwise unusable.
    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArg, 0, format!("invalid argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
