//! Move `data:` images out of a project and into blob storage.

use crate::entity::Project;
use crate::error::SyncError;
use crate::remote::RemoteStore;
use base64::Engine;
use tracing::debug;

/// Split a base64 `data:` URI into its media type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), SyncError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SyncError::InvalidInlineData("missing data: prefix".into()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| SyncError::InvalidInlineData("missing payload separator".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| SyncError::InvalidInlineData("only base64 payloads are supported".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| SyncError::InvalidInlineData(e.to_string()))?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        _ => "bin",
    }
}

async fn offload_one(
    remote: &dyn RemoteStore,
    project_id: &str,
    slot: &mut Option<String>,
) -> Result<bool, SyncError> {
    let Some(uri) = slot.as_deref().filter(|u| u.starts_with("data:")) else {
        return Ok(false);
    };
    let (mime, bytes) = decode_data_uri(uri)?;
    let key = format!(
        "{}/{}.{}",
        project_id,
        uuid::Uuid::new_v4(),
        extension_for(&mime)
    );
    let blob = remote.upload_blob(&key, &mime, bytes).await?;
    debug!("Offloaded inline image to {}", blob.url);
    *slot = Some(blob.url);
    Ok(true)
}

/// Upload every `data:` image in the cover and storyboard, replacing each
/// with its remote URL. Returns how many were moved.
pub async fn offload_inline_images(
    remote: &dyn RemoteStore,
    project: &mut Project,
) -> Result<usize, SyncError> {
    let mut moved = 0;
    if offload_one(remote, &project.id, &mut project.cover_image).await? {
        moved += 1;
    }
    for frame in &mut project.storyboard {
        if offload_one(remote, &project.id, &mut frame.image_url).await? {
            moved += 1;
        }
    }
    Ok(moved)
}
