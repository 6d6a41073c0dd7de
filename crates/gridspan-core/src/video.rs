//! Rear-camera acquisition planning.
//!
//! The media stack itself is a platform concern; this module only decides
//! *what to ask for*: the ladder of constraints to try in order, and which
//! enumerated device looks like the rear camera. The app shell executes the
//! plan against the platform API and falls through the ladder on failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera acquisition errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera access is not supported in this environment")]
    Unsupported,
    #[error("camera permission was denied")]
    PermissionDenied,
    #[error("no usable camera was found")]
    NoDevice,
    #[error("camera stream failed: {0}")]
    Stream(String),
}

/// One rung of the constraint ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraConstraint {
    /// `facingMode: { exact: "environment" }`
    ExactEnvironment,
    /// `facingMode: { ideal: "environment" }`
    IdealEnvironment,
    /// A specific enumerated device.
    DeviceId(String),
    /// Any camera at all; last resort.
    Any,
}

/// An enumerated video input device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDevice {
    pub id: String,
    pub label: String,
}

/// Requested capture resolution, relaxed on constrained devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionHint {
    pub width: u32,
    pub height: u32,
}

impl ResolutionHint {
    pub fn for_device_class(is_mobile: bool) -> Self {
        if is_mobile {
            Self {
                width: 1280,
                height: 720,
            }
        } else {
            Self {
                width: 1920,
                height: 1080,
            }
        }
    }
}

/// Pick the device most likely to be the rear camera.
///
/// Labels mentioning "back", "rear" or "environment" win; "front" and
/// "user" are excluded. When no label matches, the last enumerated device
/// is used (rear cameras tend to enumerate after the front one).
pub fn pick_rear_device(devices: &[VideoDevice]) -> Option<&VideoDevice> {
    const PREFERRED: [&str; 3] = ["back", "rear", "environment"];
    const EXCLUDED: [&str; 2] = ["front", "user"];

    devices
        .iter()
        .find(|d| {
            let label = d.label.to_lowercase();
            PREFERRED.iter().any(|kw| label.contains(kw))
        })
        .or_else(|| {
            devices.iter().rev().find(|d| {
                let label = d.label.to_lowercase();
                !EXCLUDED.iter().any(|kw| label.contains(kw))
            })
        })
        .or_else(|| devices.last())
}

/// The full ladder to try in order: exact rear facing, ideal rear facing,
/// the enumerated device that looks rear-facing, then anything.
pub fn constraint_ladder(devices: &[VideoDevice]) -> Vec<CameraConstraint> {
    let mut ladder = vec![
        CameraConstraint::ExactEnvironment,
        CameraConstraint::IdealEnvironment,
    ];
    if let Some(device) = pick_rear_device(devices) {
        if !device.id.is_empty() {
            ladder.push(CameraConstraint::DeviceId(device.id.clone()));
        }
    }
    ladder.push(CameraConstraint::Any);
    ladder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str, label: &str) -> VideoDevice {
        VideoDevice {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_pick_prefers_rear_labels() {
        let devices = [
            dev("a", "Front Camera"),
            dev("b", "Back Camera"),
            dev("c", "Wide Lens"),
        ];
        assert_eq!(pick_rear_device(&devices).unwrap().id, "b");

        let devices = [dev("a", "user facing"), dev("b", "environment lens")];
        assert_eq!(pick_rear_device(&devices).unwrap().id, "b");
    }

    #[test]
    fn test_pick_excludes_front_and_falls_back_to_last() {
        let devices = [dev("a", "Front Camera"), dev("b", "Camera 2")];
        assert_eq!(pick_rear_device(&devices).unwrap().id, "b");

        // Everything looks front-facing: still returns something.
        let devices = [dev("a", "front cam"), dev("b", "user cam")];
        assert_eq!(pick_rear_device(&devices).unwrap().id, "b");
    }

    #[test]
    fn test_pick_empty_list() {
        assert_eq!(pick_rear_device(&[]), None);
    }

    #[test]
    fn test_ladder_ordering() {
        let devices = [dev("x", "Rear Camera")];
        let ladder = constraint_ladder(&devices);
        assert_eq!(
            ladder,
            vec![
                CameraConstraint::ExactEnvironment,
                CameraConstraint::IdealEnvironment,
                CameraConstraint::DeviceId("x".to_string()),
                CameraConstraint::Any,
            ]
        );
    }

    #[test]
    fn test_ladder_without_devices_skips_device_rung() {
        let ladder = constraint_ladder(&[]);
        assert_eq!(
            ladder,
            vec![
                CameraConstraint::ExactEnvironment,
                CameraConstraint::IdealEnvironment,
                CameraConstraint::Any,
            ]
        );
    }

    #[test]
    fn test_resolution_hints() {
        assert_eq!(ResolutionHint::for_device_class(true).width, 1280);
        assert_eq!(ResolutionHint::for_device_class(false).height, 1080);
    }
}
