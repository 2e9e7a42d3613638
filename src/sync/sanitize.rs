//! Strip inline media before a project leaves the device.
//!
//! Images generated in the browser start life as `data:` URIs. The remote
//! table only holds references, so anything that is not a remote URL is
//! dropped from the pushed copy. The local record is left untouched.

use crate::entity::Project;
use serde_json::{Map, Value};

/// `data:` and `blob:` values are embedded content, not references.
pub fn is_inline(value: &str) -> bool {
    value.starts_with("data:") || value.starts_with("blob:")
}

/// Absolute http(s) URLs and server-relative paths such as `/api/images/...`.
pub fn is_remote_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with('/')
}

fn keep_remote(url: Option<String>) -> Option<String> {
    url.filter(|u| is_remote_url(u))
}

/// Copy of `project` safe to send to the remote store.
pub fn sanitize_project(project: &Project) -> Project {
    let mut clean = project.clone();
    clean.cover_image = keep_remote(clean.cover_image.take());
    for frame in &mut clean.storyboard {
        frame.image_url = keep_remote(frame.image_url.take());
        strip_inline_map(&mut frame.extra);
    }
    strip_inline_map(&mut clean.extra);
    clean
}

fn strip_inline_map(map: &mut Map<String, Value>) {
    map.retain(|_, v| !matches!(v, Value::String(s) if is_inline(s)));
    for value in map.values_mut() {
        strip_inline(value);
    }
}

fn strip_inline(value: &mut Value) {
    match value {
        Value::Object(map) => strip_inline_map(map),
        Value::Array(items) => {
            items.retain(|v| !matches!(v, Value::String(s) if is_inline(s)));
            items.iter_mut().for_each(strip_inline);
        }
        _ => {}
    }
}
