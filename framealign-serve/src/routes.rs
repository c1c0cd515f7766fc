use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use framealign_core::{estimate_alignment, AlignError, AlignWarning, Pose, PosePair};
use framealign_marker::estimate_single_pose;

use crate::AppState;

/// Wire format of one pose: `[[x, y, z], [qx, qy, qz, qw]]`.
type PoseDto = ([f64; 3], [f64; 4]);

/// One correspondence as submitted by the client. The absolute frame is
/// frame A, the relative (odometry) frame is frame B.
#[derive(Debug, Deserialize)]
pub struct PosePairDto {
    pub absolute: PoseDto,
    pub relative: PoseDto,
}

impl From<&PosePairDto> for PosePair {
    fn from(dto: &PosePairDto) -> Self {
        PosePair {
            pose_a: Pose {
                position: dto.absolute.0,
                orientation: dto.absolute.1,
            },
            pose_b: Pose {
                position: dto.relative.0,
                orientation: dto.relative.1,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PathFindingRequest {
    pub abs_to_rel: [[f64; 4]; 4],
    pub rel_to_abs: [[f64; 4]; 4],
    pub start: [f64; 3],
    pub destination_id: Value,
}

/// Body shape of `/estimate-pose` replies; errors keep the same shape
/// with null pose fields so clients can parse unconditionally.
fn pose_error(msg: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": msg.into(), "position": null, "rotation": null }))
}

/// POST /api/v0/estimate-pose
///
/// Multipart upload: `file` (image bytes) and `intrinsics` (JSON 3x3
/// calibration matrix). Replies with the camera pose in the marker frame
/// or a null-pose error body when no marker is found.
pub async fn estimate_pose(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut intrinsics_text: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return pose_error(format!("Malformed multipart body: {e}")),
        };
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => return pose_error(format!("Failed to read upload: {e}")),
                }
            }
            Some("intrinsics") => match field.text().await {
                Ok(text) => intrinsics_text = Some(text),
                Err(e) => return pose_error(format!("Failed to read intrinsics: {e}")),
            },
            _ => {}
        }
    }

    let Some(file_bytes) = file_bytes else {
        return pose_error("Missing 'file' field");
    };
    let Some(intrinsics_text) = intrinsics_text else {
        return pose_error("Missing 'intrinsics' field");
    };

    let k: [[f64; 3]; 3] = match serde_json::from_str(&intrinsics_text) {
        Ok(k) => k,
        Err(e) => return pose_error(format!("Failed to parse intrinsics: {e}")),
    };

    archive_upload(&state, &file_bytes, file_name.as_deref());

    let gray = match image::load_from_memory(&file_bytes) {
        Ok(img) => img.to_luma8(),
        Err(e) => return pose_error(format!("Failed to decode image: {e}")),
    };

    match estimate_single_pose(state.detector.as_ref(), &gray, &k, state.marker_side) {
        Ok(Some(pose)) => {
            log::info!(
                "estimated camera pose: position={:?}, orientation={:?}",
                pose.position,
                pose.orientation
            );
            Json(json!({ "position": pose.position, "rotation": pose.orientation }))
        }
        Ok(None) => pose_error("Marker not detected"),
        Err(e) => pose_error(format!("Pose estimation failed: {e}")),
    }
}

/// Write the raw upload next to previous ones under a timestamped name.
/// Archival is best-effort and has no bearing on the estimation result.
fn archive_upload(state: &AppState, bytes: &[u8], file_name: Option<&str>) {
    let Some(dir) = &state.archive_dir else {
        return;
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let stem = file_name
        .and_then(|n| n.split('.').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("captured_image");
    let path = dir.join(format!("{millis}_{stem}.jpg"));
    match std::fs::write(&path, bytes) {
        Ok(()) => log::debug!("archived upload to {}", path.display()),
        Err(e) => log::warn!("failed to archive upload to {}: {e}", path.display()),
    }
}

/// POST /api/v0/match-pairs
///
/// JSON array of pose correspondences; replies with the forward and
/// inverse 4x4 transforms between the absolute and relative frames.
pub async fn match_pairs(
    Json(dtos): Json<Vec<PosePairDto>>,
) -> (StatusCode, Json<Value>) {
    log::info!("matching {} pose pairs", dtos.len());
    let pairs: Vec<PosePair> = dtos.iter().map(PosePair::from).collect();

    match estimate_alignment(&pairs) {
        Ok(alignment) => {
            let warnings: Vec<&str> = alignment
                .warnings
                .iter()
                .map(|w| match w {
                    AlignWarning::LowSampleCount { .. } => "low_sample_count",
                    AlignWarning::InverseUndefined => "inverse_undefined",
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({
                    "abs_to_rel": alignment.a_to_b,
                    "rel_to_abs": alignment.b_to_a,
                    "warnings": warnings,
                })),
            )
        }
        Err(e) => {
            let name = match &e {
                AlignError::InsufficientSamples { .. } => "insufficient_samples",
                AlignError::RotationAveraging(_) => "rotation_averaging",
                AlignError::DegenerateScale { .. } => "degenerate_scale",
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": name, "detail": e.to_string() })),
            )
        }
    }
}

/// POST /api/v0/path-finding
///
/// Path planning is not implemented; the reply is a fixed two-waypoint
/// placeholder so clients can exercise the full round trip.
pub async fn path_finding(Json(req): Json<PathFindingRequest>) -> Json<Value> {
    log::warn!(
        "path-finding is a stub (start={:?}, destination={:?})",
        req.start,
        req.destination_id
    );
    Json(json!([[0.0, 0.0, 0.5], [0.0, 0.0, 1.0]]))
}
