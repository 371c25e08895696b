//! C-ABI wrapper around `todo-sync`.
//!
//! # Overview
//! Exposes the session and todo store through `extern "C"` functions so any
//! language with a C FFI can drive it without linking to Rust's async
//! runtime or serde directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The handle owns a current-thread tokio runtime; each operation blocks
//!   the calling thread until the store settles.
//! - A single `FfiTodoResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `todo_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use todo_sync::{FileCredentialStore, NewTodo, Store, StoreConfig, TodoId, TodoItem};

use types::*;

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Run `f`, turning a panic into a `Panic` result for `operation`.
fn guarded(operation: &str, f: impl FnOnce() -> *mut FfiTodoResult) -> *mut FfiTodoResult {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| FfiTodoResult::panic(&format!("panic in {operation}")))
}

fn handle<'a>(store: *const FfiTodoStore) -> Result<&'a FfiTodoStore, *mut FfiTodoResult> {
    if store.is_null() {
        return Err(FfiTodoResult::null_arg("store"));
    }
    Ok(unsafe { &*store })
}

/// Borrow a required C string argument.
fn required<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiTodoResult> {
    if ptr.is_null() {
        return Err(FfiTodoResult::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiTodoResult::invalid_arg(name))
}

/// Borrow an optional C string argument; null reads as empty.
fn optional<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiTodoResult> {
    if ptr.is_null() {
        return Ok("");
    }
    required(ptr, name)
}

fn todo_id(ptr: *const c_char) -> Result<TodoId, *mut FfiTodoResult> {
    let raw = required(ptr, "id")?;
    if raw.is_empty() {
        return Err(FfiTodoResult::invalid_arg("id"));
    }
    Ok(TodoId::parse(raw))
}

/// Unwrap an argument check inside a `guarded` body.
macro_rules! arg {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(result) => return result,
        }
    };
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a `tracing` subscriber that writes to stderr, filtered by
/// `RUST_LOG` (default `todo_sync=info`). Later calls are no-ops.
#[unsafe(no_mangle)]
pub extern "C" fn todo_init_logging() {
    let _ = catch_unwind(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "todo_sync=info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// Store lifecycle
// ---------------------------------------------------------------------------

/// Create a store talking to `base_url` that persists its session token
/// under `storage_dir`.
///
/// Returns null if either argument is null or not UTF-8, if the runtime
/// cannot be started, or if an internal panic occurs.
/// The caller must free the returned pointer with `todo_store_free`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_new(
    base_url: *const c_char,
    storage_dir: *const c_char,
) -> *mut FfiTodoStore {
    catch_unwind(|| {
        if base_url.is_null() || storage_dir.is_null() {
            return std::ptr::null_mut();
        }
        let (Ok(url), Ok(dir)) = (
            unsafe { CStr::from_ptr(base_url) }.to_str(),
            unsafe { CStr::from_ptr(storage_dir) }.to_str(),
        ) else {
            return std::ptr::null_mut();
        };
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(error = %e, "failed to start store runtime");
                return std::ptr::null_mut();
            }
        };
        let store = Store::with_ureq(
            StoreConfig::new(url),
            Arc::new(FileCredentialStore::new(dir)),
        );
        Box::into_raw(Box::new(FfiTodoStore { runtime, store }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a store created by `todo_store_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_free(store: *mut FfiTodoStore) {
    if !store.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(store) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

/// Restore the persisted session, verifying it with the server.
///
/// Returns a result with `data_tag = InitOutcome` on success. Loading is
/// finished whether or not this succeeds.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_initialize(store: *const FfiTodoStore) -> *mut FfiTodoResult {
    guarded("todo_store_initialize", || {
        let h = arg!(handle(store));
        match h.runtime.block_on(h.store.initialize()) {
            Ok(outcome) => FfiTodoResult::ok_init(outcome),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Log in and persist the issued token.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_login(
    store: *const FfiTodoStore,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiTodoResult {
    guarded("todo_store_login", || {
        let h = arg!(handle(store));
        let username = arg!(required(username, "username"));
        let password = arg!(required(password, "password"));
        match h.runtime.block_on(h.store.login(username, password)) {
            Ok(()) => FfiTodoResult::ok_empty(),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Forget the session locally and in storage.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_logout(store: *const FfiTodoStore) -> *mut FfiTodoResult {
    guarded("todo_store_logout", || {
        let h = arg!(handle(store));
        match h.runtime.block_on(h.store.logout()) {
            Ok(()) => FfiTodoResult::ok_empty(),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Register a new account. Does not log in.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_signup(
    store: *const FfiTodoStore,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiTodoResult {
    guarded("todo_store_signup", || {
        let h = arg!(handle(store));
        let username = arg!(required(username, "username"));
        let password = arg!(required(password, "password"));
        match h.runtime.block_on(h.store.signup(username, password)) {
            Ok(()) => FfiTodoResult::ok_empty(),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Todo operations
// ---------------------------------------------------------------------------

/// Refresh the local collection from the server.
///
/// Returns a result with `data_tag = TodoList` holding the collection as it
/// stands afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_fetch_todos(store: *const FfiTodoStore) -> *mut FfiTodoResult {
    guarded("todo_store_fetch_todos", || {
        let h = arg!(handle(store));
        match h.runtime.block_on(h.store.fetch_todos()) {
            Ok(()) => FfiTodoResult::ok_todo_list(h.store.todos().to_vec()),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Create a todo. `description` may be null.
///
/// Returns a result with `data_tag = Todo` holding the server's item.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_add_todo(
    store: *const FfiTodoStore,
    title: *const c_char,
    description: *const c_char,
) -> *mut FfiTodoResult {
    guarded("todo_store_add_todo", || {
        let h = arg!(handle(store));
        let title = arg!(required(title, "title"));
        let description = arg!(optional(description, "description"));
        let new_item = NewTodo::new(title, description);
        match h.runtime.block_on(h.store.add_todo(&new_item)) {
            Ok(item) => FfiTodoResult::ok_todo(item),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Replace the title and description of todo `id`. `description` may be
/// null.
///
/// Returns a result with `data_tag = Todo` holding the server's item.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_update_todo(
    store: *const FfiTodoStore,
    id: *const c_char,
    title: *const c_char,
    description: *const c_char,
) -> *mut FfiTodoResult {
    guarded("todo_store_update_todo", || {
        let h = arg!(handle(store));
        let id = arg!(todo_id(id));
        let title = arg!(required(title, "title"));
        let description = arg!(optional(description, "description"));
        let item = TodoItem {
            id,
            title: title.to_string(),
            description: description.to_string(),
        };
        match h.runtime.block_on(h.store.update_todo(&item)) {
            Ok(item) => FfiTodoResult::ok_todo(item),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

/// Delete todo `id`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_delete_todo(
    store: *const FfiTodoStore,
    id: *const c_char,
) -> *mut FfiTodoResult {
    guarded("todo_store_delete_todo", || {
        let h = arg!(handle(store));
        let id = arg!(todo_id(id));
        match h.runtime.block_on(h.store.delete_todo(&id)) {
            Ok(()) => FfiTodoResult::ok_empty(),
            Err(e) => FfiTodoResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// State reads
// ---------------------------------------------------------------------------

/// Whether a session is held. False for a null store.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_is_authenticated(store: *const FfiTodoStore) -> bool {
    if store.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*store }.store.is_authenticated())).unwrap_or(false)
}

/// Whether `todo_store_initialize` has yet to finish. False for a null store.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_is_loading(store: *const FfiTodoStore) -> bool {
    if store.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*store }.store.is_loading())).unwrap_or(false)
}

/// Snapshot of the local collection, with `data_tag = TodoList`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_todos(store: *const FfiTodoStore) -> *mut FfiTodoResult {
    guarded("todo_store_todos", || {
        let h = arg!(handle(store));
        FfiTodoResult::ok_todo_list(h.store.todos().to_vec())
    })
}

/// The current user's id as text, or null when anonymous.
///
/// The caller must free a non-null result with `todo_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_user_id(store: *const FfiTodoStore) -> *mut c_char {
    if store.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        match unsafe { &*store }.store.session().user_id() {
            Some(id) => into_c_string(id.to_string()),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiTodoResult` and everything it owns. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_result(result: *mut FfiTodoResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_string(result.error_message);

        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::None => {}
            FfiDataTag::Todo => {
                let todo = unsafe { Box::from_raw(result.data as *mut FfiTodo) };
                free_ffi_todo_fields(&todo);
            }
            FfiDataTag::TodoList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiTodoList) };
                if !list.items.is_null() {
                    let items = unsafe {
                        Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                            list.items,
                            list.len as usize,
                        ))
                    };
                    items.iter().for_each(free_ffi_todo_fields);
                }
            }
            FfiDataTag::InitOutcome => {
                drop(unsafe { Box::from_raw(result.data as *mut FfiInitOutcome) });
            }
        }
    });
}

fn free_ffi_todo_fields(todo: &FfiTodo) {
    free_string(todo.id);
    free_string(todo.title);
    free_string(todo.description);
}

fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { std::ffi::CString::from_raw(s) });
    }
}

/// Free a C string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_string(s));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    /// Nothing listens here, so any request fails fast as a transport error.
    const DEAD_URL: &str = "http://127.0.0.1:9";

    fn new_store(dir: &tempfile::TempDir) -> *mut FfiTodoStore {
        let url = CString::new(DEAD_URL).unwrap();
        let path = CString::new(dir.path().to_str().unwrap()).unwrap();
        let store = todo_store_new(url.as_ptr(), path.as_ptr());
        assert!(!store.is_null());
        store
    }

    fn code(result: *mut FfiTodoResult) -> FfiErrorCode {
        assert!(!result.is_null());
        let code = unsafe { &*result }.error_code;
        todo_free_result(result);
        code
    }

    fn message(result: *const FfiTodoResult) -> String {
        let r = unsafe { &*result };
        unsafe { CStr::from_ptr(r.error_message) }
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn store_new_and_free() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);
        todo_store_free(store);
    }

    #[test]
    fn store_new_null_returns_null() {
        let url = CString::new(DEAD_URL).unwrap();
        assert!(todo_store_new(std::ptr::null(), url.as_ptr()).is_null());
        assert!(todo_store_new(url.as_ptr(), std::ptr::null()).is_null());
    }

    #[test]
    fn store_free_null_is_safe() {
        todo_store_free(std::ptr::null_mut());
    }

    #[test]
    fn fresh_store_is_loading_and_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);
        assert!(todo_store_is_loading(store));
        assert!(!todo_store_is_authenticated(store));
        assert!(todo_store_user_id(store).is_null());
        todo_store_free(store);
    }

    #[test]
    fn initialize_without_token_is_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);

        let result = todo_store_initialize(store);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::InitOutcome);
        assert_eq!(unsafe { *(r.data as *const FfiInitOutcome) }, FfiInitOutcome::Anonymous);
        todo_free_result(result);

        assert!(!todo_store_is_loading(store));
        todo_store_free(store);
    }

    #[test]
    fn todo_operations_without_session_report_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);
        let title = CString::new("Buy milk").unwrap();
        let id = CString::new("1").unwrap();

        assert_eq!(code(todo_store_fetch_todos(store)), FfiErrorCode::MissingCredential);
        assert_eq!(
            code(todo_store_add_todo(store, title.as_ptr(), std::ptr::null())),
            FfiErrorCode::MissingCredential
        );
        assert_eq!(
            code(todo_store_update_todo(store, id.as_ptr(), title.as_ptr(), std::ptr::null())),
            FfiErrorCode::MissingCredential
        );
        assert_eq!(code(todo_store_delete_todo(store, id.as_ptr())), FfiErrorCode::MissingCredential);

        todo_store_free(store);
    }

    #[test]
    fn login_against_dead_server_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);
        let user = CString::new("alice").unwrap();
        let pass = CString::new("pw1").unwrap();

        let result = todo_store_login(store, user.as_ptr(), pass.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Transport);
        assert!(!unsafe { &*result }.error_message.is_null());
        todo_free_result(result);
        assert!(!todo_store_is_authenticated(store));

        todo_store_free(store);
    }

    #[test]
    fn null_store_returns_null_arg() {
        let result = todo_store_fetch_todos(std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        assert_eq!(message(result), "null argument: store");
        todo_free_result(result);

        assert_eq!(code(todo_store_initialize(std::ptr::null())), FfiErrorCode::NullArg);
        assert_eq!(code(todo_store_logout(std::ptr::null())), FfiErrorCode::NullArg);
        assert_eq!(code(todo_store_todos(std::ptr::null())), FfiErrorCode::NullArg);
        assert!(!todo_store_is_authenticated(std::ptr::null()));
        assert!(!todo_store_is_loading(std::ptr::null()));
        assert!(todo_store_user_id(std::ptr::null()).is_null());
    }

    #[test]
    fn null_and_invalid_arguments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);
        let user = CString::new("alice").unwrap();
        let empty = CString::new("").unwrap();
        let bad_utf8 = CString::new(vec![0xff, 0xfe]).unwrap();

        let result = todo_store_login(store, user.as_ptr(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        assert_eq!(message(result), "null argument: password");
        todo_free_result(result);

        assert_eq!(
            code(todo_store_signup(store, bad_utf8.as_ptr(), user.as_ptr())),
            FfiErrorCode::InvalidArg
        );
        assert_eq!(code(todo_store_delete_todo(store, empty.as_ptr())), FfiErrorCode::InvalidArg);
        assert_eq!(
            code(todo_store_add_todo(store, std::ptr::null(), std::ptr::null())),
            FfiErrorCode::NullArg
        );

        todo_store_free(store);
    }

    #[test]
    fn todos_of_fresh_store_is_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = new_store(&dir);

        let result = todo_store_todos(store);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::TodoList);
        let list = unsafe { &*(r.data as *const FfiTodoList) };
        assert_eq!(list.len, 0);
        assert!(list.items.is_null());
        todo_free_result(result);

        todo_store_free(store);
    }

    #[test]
    fn error_results_carry_status_and_server_message() {
        let result = FfiTodoResult::from_error(todo_sync::StoreError::Api {
            status: 404,
            message: "Todo not found".to_string(),
        });
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Api);
        assert_eq!(r.http_status, 404);
        assert_eq!(message(result), "Todo not found");
        todo_free_result(result);

        let result = FfiTodoResult::from_error(todo_sync::StoreError::Auth(
            "Invalid credentials".to_string(),
        ));
        assert_eq!(message(result), "Invalid credentials");
        assert_eq!(code(result), FfiErrorCode::Auth);
    }

    #[test]
    fn todo_list_result_round_trips_fields() {
        let result = FfiTodoResult::ok_todo_list(vec![
            TodoItem {
                id: TodoId::Number(1),
                title: "Buy milk".to_string(),
                description: String::new(),
            },
            TodoItem {
                id: TodoId::from("a1"),
                title: "Walk dog".to_string(),
                description: "park".to_string(),
            },
        ]);
        let r = unsafe { &*result };
        let list = unsafe { &*(r.data as *const FfiTodoList) };
        assert_eq!(list.len, 2);
        let items = unsafe { std::slice::from_raw_parts(list.items, list.len as usize) };
        let text = |p: *mut c_char| unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        assert_eq!(text(items[0].id), "1");
        assert_eq!(text(items[1].id), "a1");
        assert_eq!(text(items[1].description), "park");
        todo_free_result(result);
    }

    #[test]
    fn interior_nul_is_dropped() {
        let s = into_c_string("a\0b".to_string());
        assert_eq!(unsafe { CStr::from_ptr(s) }.to_str().unwrap(), "ab");
        todo_free_string(s);
    }

    #[test]
    fn free_result_null_is_safe() {
        todo_free_result(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        todo_free_string(std::ptr::null_mut());
    }

    #[test]
    fn init_logging_twice_is_safe() {
        todo_init_logging();
        todo_init_logging();
    }
}
