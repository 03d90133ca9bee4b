//! Browser bindings over the session registry.
//!
//! Scenes, clips and mapping documents cross the boundary as JSON strings.
//! Reports come back as plain JS objects. Errors become thrown strings.

use wasm_bindgen::prelude::*;

use crate::animation::AnimationClip;
use crate::coords::CoordinateSystem;
use crate::error::RetargetError;
use crate::mapping::BoneMapping;
use crate::retarget::RetargetOptions;
use crate::scene::Scene;
use crate::session::{self, RetargetSession, SessionHandle};

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(err: RetargetError) -> JsValue {
    log::warn!("{}", err);
    JsValue::from_str(&err.to_string())
}

fn unknown_session(handle: SessionHandle) -> JsValue {
    JsValue::from_str(&format!("unknown retarget session {}", handle))
}

fn run<R>(
    handle: SessionHandle,
    f: impl FnOnce(&mut RetargetSession) -> Result<R, RetargetError>,
) -> Result<R, JsValue> {
    session::with_session_mut(handle, f)
        .ok_or_else(|| unknown_session(handle))?
        .map_err(js_error)
}

fn parse_descriptor(json: Option<String>) -> Result<Option<CoordinateSystem>, JsValue> {
    json.map(|s| serde_json::from_str(&s).map_err(|e| js_error(e.into())))
        .transpose()
}

/// Create a session. `options_json` may be empty for the defaults.
#[wasm_bindgen]
pub fn create_retarget_session(options_json: &str) -> Result<u32, JsValue> {
    let options = if options_json.trim().is_empty() {
        RetargetOptions::default()
    } else {
        serde_json::from_str(options_json).map_err(|e| js_error(e.into()))?
    };
    Ok(session::create_session(options))
}

#[wasm_bindgen]
pub fn destroy_retarget_session(handle: u32) -> bool {
    session::destroy_session(handle)
}

#[wasm_bindgen]
pub fn load_source_scene(
    handle: u32,
    scene_json: &str,
    descriptor_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let scene = Scene::from_json(scene_json).map_err(js_error)?;
    let descriptor = parse_descriptor(descriptor_json)?;
    let summary = run(handle, |s| s.load_source_scene(scene, descriptor))?;
    to_js(&summary)
}

#[wasm_bindgen]
pub fn load_target_scene(
    handle: u32,
    scene_json: &str,
    descriptor_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let scene = Scene::from_json(scene_json).map_err(js_error)?;
    let descriptor = parse_descriptor(descriptor_json)?;
    let summary = run(handle, |s| s.load_target_scene(scene, descriptor))?;
    to_js(&summary)
}

#[wasm_bindgen]
pub fn set_retarget_options(handle: u32, options_json: &str) -> Result<(), JsValue> {
    let options: RetargetOptions =
        serde_json::from_str(options_json).map_err(|e| js_error(e.into()))?;
    run(handle, |s| {
        s.job.set_options(options);
        Ok(())
    })
}

#[wasm_bindgen]
pub fn get_job_state(handle: u32) -> Option<String> {
    session::with_session(handle, |s| s.job.state().name().to_string())
}

#[wasm_bindgen]
pub fn auto_map_bones(handle: u32) -> Result<JsValue, JsValue> {
    let report = run(handle, |s| s.job.auto_map())?;
    to_js(&report)
}

/// Returns false when a manual entry already claims the target.
#[wasm_bindgen]
pub fn add_manual_mapping(handle: u32, source: &str, target: &str) -> Result<bool, JsValue> {
    run(handle, |s| s.job.add_manual(source, target))
}

#[wasm_bindgen]
pub fn remove_mapping(handle: u32, source: &str) -> Result<bool, JsValue> {
    run(handle, |s| s.job.remove_mapping(source).map(|e| e.is_some()))
}

#[wasm_bindgen]
pub fn clear_mapping(handle: u32) -> Result<(), JsValue> {
    run(handle, |s| s.job.clear_mapping())
}

#[wasm_bindgen]
pub fn export_mapping(handle: u32) -> Result<String, JsValue> {
    run(handle, |s| s.job.mapping().to_json_string())
}

#[wasm_bindgen]
pub fn import_mapping(handle: u32, mapping_json: &str) -> Result<(), JsValue> {
    let mapping = BoneMapping::from_json(mapping_json).map_err(js_error)?;
    run(handle, |s| s.job.set_mapping(mapping))
}

#[wasm_bindgen]
pub fn get_mapping_info(handle: u32) -> Result<JsValue, JsValue> {
    let info = run(handle, |s| s.mapping_info())?;
    to_js(&info)
}

#[wasm_bindgen]
pub fn check_compatibility(handle: u32) -> Result<JsValue, JsValue> {
    let report = run(handle, |s| s.compatibility())?;
    to_js(&report)
}

/// Retarget a clip of the loaded source scene. Returns `{ clip, warnings }`
/// with the clip in three.js JSON form.
#[wasm_bindgen]
pub fn retarget_source_clip(
    handle: u32,
    clip_name: &str,
    rename: Option<String>,
) -> Result<String, JsValue> {
    run(handle, |s| {
        let output = s.retarget_source_clip(clip_name, rename.as_deref())?;
        Ok(serde_json::to_string(&output)?)
    })
}

/// Retarget a clip supplied by the caller instead of the source scene.
#[wasm_bindgen]
pub fn retarget_clip_json(handle: u32, clip_json: &str) -> Result<String, JsValue> {
    let clip = AnimationClip::from_json(clip_json).map_err(js_error)?;
    run(handle, |s| {
        let output = s.job.retarget(&clip)?;
        Ok(serde_json::to_string(&output)?)
    })
}

#[wasm_bindgen]
pub fn finish_job(handle: u32) -> Result<(), JsValue> {
    run(handle, |s| {
        s.job.finish();
        Ok(())
    })
}
