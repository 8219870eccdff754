//! C FFI bindings for xport-core
//!
//! This crate provides a C-compatible API so a host application plugin can
//! parse names, resolve export roots and plan exports without linking Rust.
//! Structured results are handed back as JSON strings.

use log::warn;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use xport_core::{ExportMode, ExportSettings, GroupSummary, Scene, SkipBehavior};

/// Opaque handle to a loaded scene snapshot
pub struct FfiScene {
    inner: Scene,
}

/// Opaque handle to resolved export roots
pub struct FfiExportGroups {
    inner: Vec<GroupSummary>,
}

unsafe fn borrow_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

fn parse_mode(mode: Option<&str>) -> Option<ExportMode> {
    match mode.map(str::to_ascii_lowercase).as_deref() {
        None => Some(ExportMode::default()),
        Some("all") => Some(ExportMode::All),
        Some("visible") => Some(ExportMode::Visible),
        Some("renderable") => Some(ExportMode::Renderable),
        Some(_) => None,
    }
}

/// Parse a name into its clean name and directives
///
/// # Safety
/// - `name` must be a valid C string
/// - Returns a JSON object `{"clean_name": ..., "directives": {...}}`, or null on error
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_parse_name(name: *const c_char) -> *mut c_char {
    let name = match borrow_str(name) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    match serde_json::to_string(&xport_core::parse_name(name)) {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Get the clean name of a name with all directives removed
///
/// # Safety
/// - `name` must be a valid C string
/// - Returns null on error
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_clean_name(name: *const c_char) -> *mut c_char {
    match borrow_str(name) {
        Some(s) => into_c_string(xport_core::directive::clean_name(s)),
        None => ptr::null_mut(),
    }
}

/// Load a scene snapshot from JSON
///
/// # Safety
/// - `json` must be a valid C string
/// - Returns null if the snapshot is malformed or has dangling ids or cycles
#[no_mangle]
pub unsafe extern "C" fn xport_scene_from_json(json: *const c_char) -> *mut FfiScene {
    let json = match borrow_str(json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    match Scene::from_json(json) {
        Ok(scene) => Box::into_raw(Box::new(FfiScene { inner: scene })),
        Err(e) => {
            warn!("rejected scene snapshot: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free a scene
///
/// # Safety
/// - `scene` must be a valid pointer returned by `xport_scene_from_json` or null
#[no_mangle]
pub unsafe extern "C" fn xport_free_scene(scene: *mut FfiScene) {
    if !scene.is_null() {
        drop(Box::from_raw(scene));
    }
}

/// Resolve the export roots of a scene
///
/// # Safety
/// - `scene` must be a valid pointer returned by `xport_scene_from_json`
/// - `mode` must be a valid C string (`all`, `visible` or `renderable`) or null for `visible`
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn xport_resolve(
    scene: *const FfiScene,
    mode: *const c_char,
) -> *mut FfiExportGroups {
    if scene.is_null() {
        return ptr::null_mut();
    }
    if !mode.is_null() && borrow_str(mode).is_none() {
        return ptr::null_mut();
    }

    let mode = match parse_mode(borrow_str(mode)) {
        Some(m) => m,
        None => return ptr::null_mut(),
    };

    let scene = &(*scene).inner;
    let groups = xport_core::resolve_export_roots(scene, mode);
    Box::into_raw(Box::new(FfiExportGroups {
        inner: groups.describe(scene),
    }))
}

/// Resolve the export roots of a scene snapshot given as JSON
///
/// # Safety
/// - `scene_json` must be a valid C string
/// - `mode` must be a valid C string or null, as for `xport_resolve`
/// - Returns a JSON list of `{"root": ..., "members": [...]}` by clean name,
///   or null on error
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_resolve_scene(
    scene_json: *const c_char,
    mode: *const c_char,
) -> *mut c_char {
    let scene = xport_scene_from_json(scene_json);
    if scene.is_null() {
        return ptr::null_mut();
    }

    let groups = xport_resolve(scene, mode);
    let json = if groups.is_null() {
        ptr::null_mut()
    } else {
        match serde_json::to_string(&(*groups).inner) {
            Ok(json) => into_c_string(json),
            Err(_) => ptr::null_mut(),
        }
    };

    xport_free_groups(groups);
    xport_free_scene(scene);
    json
}

/// Free resolved export roots
///
/// # Safety
/// - `groups` must be a valid pointer returned by `xport_resolve` or null
#[no_mangle]
pub unsafe extern "C" fn xport_free_groups(groups: *mut FfiExportGroups) {
    if !groups.is_null() {
        drop(Box::from_raw(groups));
    }
}

/// Get the number of export roots
///
/// # Safety
/// - `groups` must be a valid pointer returned by `xport_resolve`
#[no_mangle]
pub unsafe extern "C" fn xport_group_count(groups: *const FfiExportGroups) -> usize {
    if groups.is_null() {
        return 0;
    }
    (*groups).inner.len()
}

/// Get the clean name of an export root by index
///
/// # Safety
/// - `groups` must be a valid pointer returned by `xport_resolve`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_group_root_name(
    groups: *const FfiExportGroups,
    index: usize,
) -> *mut c_char {
    if groups.is_null() {
        return ptr::null_mut();
    }

    (&(*groups).inner)
        .get(index)
        .map(|g| into_c_string(g.root.clone()))
        .unwrap_or(ptr::null_mut())
}

/// Get the number of member collections of an export root
///
/// # Safety
/// - `groups` must be a valid pointer returned by `xport_resolve`
#[no_mangle]
pub unsafe extern "C" fn xport_group_member_count(
    groups: *const FfiExportGroups,
    index: usize,
) -> usize {
    if groups.is_null() {
        return 0;
    }
    (&(*groups).inner).get(index).map_or(0, |g| g.members.len())
}

/// Get the clean name of a member collection
///
/// # Safety
/// - `groups` must be a valid pointer returned by `xport_resolve`
/// - Returns null if either index is out of bounds
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_group_member_name(
    groups: *const FfiExportGroups,
    index: usize,
    member: usize,
) -> *mut c_char {
    if groups.is_null() {
        return ptr::null_mut();
    }

    (&(*groups).inner)
        .get(index)
        .and_then(|g| g.members.get(member))
        .map(|name| into_c_string(name.clone()))
        .unwrap_or(ptr::null_mut())
}

/// Validate the directives of a scene
///
/// # Safety
/// - `scene` must be a valid pointer returned by `xport_scene_from_json`
/// - Returns the validation report as JSON, or null on error
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_validate(scene: *const FfiScene, strict: bool) -> *mut c_char {
    if scene.is_null() {
        return ptr::null_mut();
    }

    let behavior = if strict { SkipBehavior::Strict } else { SkipBehavior::Basic };
    let report = xport_core::validate(&(*scene).inner, behavior);
    match serde_json::to_string(&report) {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Plan the export of a scene
///
/// # Safety
/// - `scene` must be a valid pointer returned by `xport_scene_from_json`
/// - `settings_json` must be a valid C string holding export settings
/// - Returns the export plan as JSON, or null if the settings are invalid or
///   planning fails
/// - Caller must free the returned string with `xport_free_string`
#[no_mangle]
pub unsafe extern "C" fn xport_plan_export(
    scene: *const FfiScene,
    settings_json: *const c_char,
) -> *mut c_char {
    if scene.is_null() {
        return ptr::null_mut();
    }
    let settings_json = match borrow_str(settings_json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let settings: ExportSettings = match serde_json::from_str(settings_json) {
        Ok(s) => s,
        Err(e) => {
            warn!("rejected export settings: {}", e);
            return ptr::null_mut();
        }
    };

    match xport_core::plan_export(&(*scene).inner, &settings) {
        Ok(plan) => match serde_json::to_string(&plan) {
            Ok(json) => into_c_string(json),
            Err(_) => ptr::null_mut(),
        },
        Err(e) => {
            warn!("export planning failed: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by an xport_* function or null
#[no_mangle]
pub unsafe extern "C" fn xport_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
