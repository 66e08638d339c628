//! Camera device access behind a trait, so the capture state machine can be
//! driven by a real device or by a scripted backend in tests.

use thiserror::Error;

/// Why a capture operation failed. The acquisition variants mirror the
/// reasons a device request can be refused; `InvalidState` covers calls made
/// outside the state they are legal in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera access denied")]
    PermissionDenied,
    #[error("no camera device found")]
    NoDevice,
    #[error("camera device is busy")]
    DeviceBusy,
    #[error("camera failure: {0}")]
    Unknown(String),
    #[error("failed to encode captured frame: {0}")]
    Encode(String),
    #[error("{op} is not valid in the {state} state")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },
}

impl CaptureError {
    /// Message suitable for showing directly to the user.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied => {
                "Camera access denied. Please allow camera permissions and try again.".to_string()
            }
            CaptureError::NoDevice => {
                "No camera found. Please connect a camera and try again.".to_string()
            }
            CaptureError::DeviceBusy => {
                "Camera is already in use by another application.".to_string()
            }
            CaptureError::Unknown(_) => "Failed to access camera. Please try again.".to_string(),
            CaptureError::Encode(_) => "Failed to encode the captured image.".to_string(),
            CaptureError::InvalidState { .. } => self.to_string(),
        }
    }
}

/// One enumerable camera device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: u32,
    pub label: String,
}

/// Which physical camera to prefer when no explicit device is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    User,
    #[default]
    Environment,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

/// Stream acquisition parameters. Width/height are a hint; the backend keeps
/// whatever native resolution is closest.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub device: Option<u32>,
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            device: None,
            facing: Facing::default(),
            width: 1920,
            height: 1080,
        }
    }
}

/// A decoded RGB frame at the stream's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Device access used by the capture controller. At most one stream may be
/// held; `release` must be safe to call at any time, including twice.
pub trait CameraBackend: Send {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CaptureError>;
    fn open(&mut self, request: &StreamRequest) -> Result<(), CaptureError>;
    fn grab(&mut self) -> Result<RawFrame, CaptureError>;
    fn release(&mut self);
    fn is_streaming(&self) -> bool;
}

#[cfg(feature = "camera")]
pub use nokhwa_backend::NokhwaBackend;

#[cfg(feature = "camera")]
mod nokhwa_backend {
    use super::*;

    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    };
    use nokhwa::{Camera, NokhwaError};

    /// Real camera access via nokhwa's native platform backends.
    pub struct NokhwaBackend {
        camera: Option<Camera>,
    }

    impl NokhwaBackend {
        pub fn new() -> Self {
            Self { camera: None }
        }
    }

    impl Default for NokhwaBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    /// nokhwa reports platform errors as strings; sniff the common refusal
    /// reasons out of the message the same way the upstream UI mapped
    /// `NotAllowedError`/`NotFoundError`/`NotReadableError`.
    fn map_backend_error(err: NokhwaError) -> CaptureError {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
            CaptureError::PermissionDenied
        } else if lower.contains("busy") || lower.contains("in use") {
            CaptureError::DeviceBusy
        } else if lower.contains("not found") || lower.contains("no device") {
            CaptureError::NoDevice
        } else {
            CaptureError::Unknown(message)
        }
    }

    impl CameraBackend for NokhwaBackend {
        fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CaptureError> {
            let cameras = nokhwa::query(ApiBackend::Auto).map_err(map_backend_error)?;
            Ok(cameras
                .iter()
                .enumerate()
                .map(|(position, info)| DeviceInfo {
                    index: info.index().as_index().unwrap_or(position as u32),
                    label: info.human_name(),
                })
                .collect())
        }

        fn open(&mut self, request: &StreamRequest) -> Result<(), CaptureError> {
            // Opening twice would leak the first stream.
            self.release();

            let index = request.device.unwrap_or(0);
            let format = CameraFormat::new(
                Resolution::new(request.width, request.height),
                FrameFormat::MJPEG,
                30,
            );
            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

            let mut camera =
                Camera::new(CameraIndex::Index(index), requested).map_err(map_backend_error)?;
            camera.open_stream().map_err(map_backend_error)?;

            log::info!(
                "📷 Camera stream opened: {} at {}x{}",
                camera.info().human_name(),
                camera.resolution().width(),
                camera.resolution().height()
            );

            self.camera = Some(camera);
            Ok(())
        }

        fn grab(&mut self) -> Result<RawFrame, CaptureError> {
            let camera = self
                .camera
                .as_mut()
                .ok_or_else(|| CaptureError::Unknown("no active stream".to_string()))?;

            let buffer = camera.frame().map_err(map_backend_error)?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(map_backend_error)?;

            Ok(RawFrame {
                width: decoded.width(),
                height: decoded.height(),
                rgb: decoded.into_raw(),
            })
        }

        fn release(&mut self) {
            if let Some(mut camera) = self.camera.take() {
                if let Err(e) = camera.stop_stream() {
                    log::warn!("⚠️ Failed to stop camera stream cleanly: {}", e);
                }
            }
        }

        fn is_streaming(&self) -> bool {
            self.camera.is_some()
        }
    }

    impl Drop for NokhwaBackend {
        fn drop(&mut self) {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert!(CaptureError::PermissionDenied
            .user_message()
            .contains("Camera access denied"));
        assert!(CaptureError::NoDevice.user_message().contains("No camera found"));
        assert!(CaptureError::DeviceBusy.user_message().contains("already in use"));
        assert!(CaptureError::Unknown("boom".to_string())
            .user_message()
            .contains("try again"));
    }

    #[test]
    fn test_facing_toggle() {
        assert_eq!(Facing::Environment.toggled(), Facing::User);
        assert_eq!(Facing::User.toggled(), Facing::Environment);
        assert_eq!(Facing::default(), Facing::Environment);
    }

    #[test]
    fn test_default_request_is_full_hd_hint() {
        let request = StreamRequest::default();
        assert_eq!(request.device, None);
        assert_eq!((request.width, request.height), (1920, 1080));
    }
}
