//! Camera capture session: acquire → preview → snapshot → confirm/retake →
//! release, modeled as one explicit state machine so a still image and a live
//! stream can never exist at the same time.

pub mod backend;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::models::ImageBlob;

pub use backend::{CameraBackend, CaptureError, DeviceInfo, Facing, RawFrame, StreamRequest};

/// JPEG quality for confirmed stills, matching the upstream capture encoder.
const JPEG_QUALITY: u8 = 85;

/// Internal state. The captured still lives inside its variant so the type
/// system rules out "still present while stream live" combinations.
enum State {
    Idle,
    Requesting,
    Live,
    Captured(RawFrame),
    Confirmed,
    Error(CaptureError),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "Idle",
            State::Requesting => "Requesting",
            State::Live => "Live",
            State::Captured(_) => "Captured",
            State::Confirmed => "Confirmed",
            State::Error(_) => "Error",
        }
    }
}

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Requesting,
    Live,
    Captured,
    Confirmed,
    Error,
}

/// Drives one camera session over a [`CameraBackend`].
///
/// Exactly one device stream is held at a time, only while the session is
/// `Requesting` or `Live`; every transition out of those states releases the
/// stream before it completes.
pub struct CaptureController {
    backend: Box<dyn CameraBackend>,
    request: StreamRequest,
    devices: Vec<DeviceInfo>,
    state: State,
}

impl CaptureController {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self::with_request(backend, StreamRequest::default())
    }

    pub fn with_request(backend: Box<dyn CameraBackend>, request: StreamRequest) -> Self {
        Self {
            backend,
            request,
            devices: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        match self.state {
            State::Idle => CaptureState::Idle,
            State::Requesting => CaptureState::Requesting,
            State::Live => CaptureState::Live,
            State::Captured(_) => CaptureState::Captured,
            State::Confirmed => CaptureState::Confirmed,
            State::Error(_) => CaptureState::Error,
        }
    }

    /// The failure that put the session into `Error`, if any.
    #[allow(dead_code)] // read by callers that keep a failed session around for retry UI
    pub fn last_error(&self) -> Option<&CaptureError> {
        match &self.state {
            State::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the backend currently holds a device stream.
    pub fn stream_active(&self) -> bool {
        self.backend.is_streaming()
    }

    fn invalid(&self, op: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            op,
            state: self.state.name(),
        }
    }

    /// Request the camera and start previewing. Valid from `Idle` and from
    /// `Error` (retry). On failure the session lands in `Error` with a
    /// user-presentable reason and the device is released.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        match self.state {
            State::Idle | State::Error(_) => {}
            _ => return Err(self.invalid("open")),
        }

        if self.devices.is_empty() {
            // Enumeration failures only disable device switching.
            if let Ok(devices) = self.backend.enumerate() {
                self.devices = devices;
            }
        }
        if self.request.device.is_none() {
            self.request.device = self.preferred_device();
        }

        self.state = State::Requesting;
        match self.backend.open(&self.request) {
            Ok(()) => {
                self.state = State::Live;
                Ok(())
            }
            Err(e) => {
                self.backend.release();
                log::warn!("⚠️ Camera open failed: {}", e);
                self.state = State::Error(e.clone());
                Err(e)
            }
        }
    }

    /// Pick a device matching the facing preference by label, the same
    /// back/rear heuristic the upstream UI used on mobile.
    fn preferred_device(&self) -> Option<u32> {
        let wanted: &[&str] = match self.request.facing {
            Facing::Environment => &["back", "rear"],
            Facing::User => &["front", "user"],
        };
        self.devices
            .iter()
            .find(|d| {
                let label = d.label.to_lowercase();
                wanted.iter().any(|w| label.contains(w))
            })
            .map(|d| d.index)
    }

    /// Known devices; empty when enumeration failed or never ran.
    pub fn list_devices(&mut self) -> &[DeviceInfo] {
        if self.devices.is_empty() {
            if let Ok(devices) = self.backend.enumerate() {
                self.devices = devices;
            }
        }
        &self.devices
    }

    pub fn can_switch(&self) -> bool {
        self.devices.len() > 1
    }

    /// Cycle to the next known device, or toggle the facing preference when
    /// only one (or no) device is known. Re-acquires the stream when live.
    pub fn switch_camera(&mut self) -> Result<(), CaptureError> {
        match self.state {
            State::Idle | State::Live | State::Error(_) => {}
            _ => return Err(self.invalid("switch_camera")),
        }

        if self.devices.len() > 1 {
            let current = self
                .request
                .device
                .and_then(|sel| self.devices.iter().position(|d| d.index == sel))
                .unwrap_or(0);
            let next = (current + 1) % self.devices.len();
            self.request.device = Some(self.devices[next].index);
        } else {
            self.request.facing = self.request.facing.toggled();
            self.request.device = None;
        }

        if matches!(self.state, State::Live) {
            self.backend.release();
            self.state = State::Idle;
            self.open()
        } else {
            Ok(())
        }
    }

    /// Snapshot the current frame. Valid only while `Live`; the device
    /// stream is released before the transition to `Captured` completes.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, State::Live) {
            return Err(self.invalid("capture"));
        }

        match self.backend.grab() {
            Ok(frame) => {
                self.backend.release();
                log::info!("📸 Captured still at {}x{}", frame.width, frame.height);
                self.state = State::Captured(frame);
                Ok(())
            }
            Err(e) => {
                self.backend.release();
                self.state = State::Error(e.clone());
                Err(e)
            }
        }
    }

    /// The captured still awaiting confirm/retake, if any.
    pub fn still(&self) -> Option<&RawFrame> {
        match &self.state {
            State::Captured(frame) => Some(frame),
            _ => None,
        }
    }

    /// Re-encode the still as a JPEG blob and end the session. Valid only in
    /// `Captured`; terminal on success.
    pub fn confirm(&mut self) -> Result<ImageBlob, CaptureError> {
        match std::mem::replace(&mut self.state, State::Confirmed) {
            State::Captured(frame) => match encode_jpeg(&frame) {
                Ok(blob) => Ok(blob),
                Err(e) => {
                    // Keep the still so the caller can retake instead.
                    self.state = State::Captured(frame);
                    Err(e)
                }
            },
            other => {
                let err = CaptureError::InvalidState {
                    op: "confirm",
                    state: other.name(),
                };
                self.state = other;
                Err(err)
            }
        }
    }

    /// Discard the still and go back to previewing. Valid only in `Captured`.
    pub fn retake(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, State::Captured(_)) {
            return Err(self.invalid("retake"));
        }
        self.state = State::Idle;
        self.open()
    }

    /// Release any held resources and return to `Idle`. Valid from every
    /// state and idempotent.
    pub fn close(&mut self) {
        self.backend.release();
        self.state = State::Idle;
    }
}

fn encode_jpeg(frame: &RawFrame) -> Result<ImageBlob, CaptureError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .write_image(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    let filename = format!("camera-capture-{}.jpg", chrono::Utc::now().timestamp());
    Ok(ImageBlob::new(buf, "image/jpeg", filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted backend: hands out a fixed 2x2 frame and counts open/release
    /// calls so tests can check the stream discipline.
    struct ScriptedBackend {
        devices: Vec<DeviceInfo>,
        open_error: Option<CaptureError>,
        streaming: bool,
        opens: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
        last_device: Arc<AtomicUsize>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                devices: vec![DeviceInfo {
                    index: 0,
                    label: "Integrated Webcam".to_string(),
                }],
                open_error: None,
                streaming: false,
                opens: Arc::new(AtomicUsize::new(0)),
                releases: Arc::new(AtomicUsize::new(0)),
                last_device: Arc::new(AtomicUsize::new(usize::MAX)),
            }
        }

        fn failing(error: CaptureError) -> Self {
            let mut backend = Self::new();
            backend.open_error = Some(error);
            backend
        }
    }

    impl CameraBackend for ScriptedBackend {
        fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, CaptureError> {
            Ok(self.devices.clone())
        }

        fn open(&mut self, request: &StreamRequest) -> Result<(), CaptureError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.last_device
                .store(request.device.unwrap_or(0) as usize, Ordering::SeqCst);
            if let Some(e) = &self.open_error {
                return Err(e.clone());
            }
            self.streaming = true;
            Ok(())
        }

        fn grab(&mut self) -> Result<RawFrame, CaptureError> {
            Ok(RawFrame {
                width: 2,
                height: 2,
                rgb: vec![10; 12],
            })
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.streaming = false;
        }

        fn is_streaming(&self) -> bool {
            self.streaming
        }
    }

    fn controller() -> CaptureController {
        CaptureController::new(Box::new(ScriptedBackend::new()))
    }

    #[test]
    fn test_close_from_idle_is_a_noop() {
        let mut session = controller();
        session.close();
        session.close();
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.stream_active());
    }

    #[test]
    fn test_capture_outside_live_is_rejected_without_side_effects() {
        let mut session = controller();
        let err = session.capture().unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState { op: "capture", .. }));
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.stream_active());
    }

    #[test]
    fn test_open_capture_releases_stream() {
        let mut session = controller();
        session.open().unwrap();
        assert_eq!(session.state(), CaptureState::Live);
        assert!(session.stream_active());

        session.capture().unwrap();
        assert_eq!(session.state(), CaptureState::Captured);
        assert!(!session.stream_active(), "device lock held after capture");
        assert_eq!(session.still().unwrap().width, 2);
    }

    #[test]
    fn test_confirm_produces_jpeg_blob_and_is_terminal() {
        let mut session = controller();
        session.open().unwrap();
        session.capture().unwrap();

        let blob = session.confirm().unwrap();
        assert_eq!(blob.mime_type(), "image/jpeg");
        assert!(blob.filename().starts_with("camera-capture-"));
        assert!(blob.filename().ends_with(".jpg"));
        // JPEG start-of-image marker.
        assert_eq!(&blob.bytes()[..2], &[0xFF, 0xD8]);

        assert_eq!(session.state(), CaptureState::Confirmed);
        assert!(matches!(
            session.confirm().unwrap_err(),
            CaptureError::InvalidState { op: "confirm", .. }
        ));
    }

    #[test]
    fn test_retake_reacquires_the_stream() {
        let opens;
        let mut session = {
            let backend = ScriptedBackend::new();
            opens = backend.opens.clone();
            CaptureController::new(Box::new(backend))
        };

        session.open().unwrap();
        session.capture().unwrap();
        session.retake().unwrap();

        assert_eq!(session.state(), CaptureState::Live);
        assert!(session.stream_active());
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_retake_outside_captured_is_rejected() {
        let mut session = controller();
        assert!(session.retake().is_err());
        session.open().unwrap();
        assert!(session.retake().is_err());
        assert_eq!(session.state(), CaptureState::Live);
    }

    #[test]
    fn test_open_failure_lands_in_error_and_allows_retry() {
        let mut session =
            CaptureController::new(Box::new(ScriptedBackend::failing(CaptureError::DeviceBusy)));

        let err = session.open().unwrap_err();
        assert_eq!(err, CaptureError::DeviceBusy);
        assert_eq!(session.state(), CaptureState::Error);
        assert_eq!(session.last_error(), Some(&CaptureError::DeviceBusy));
        assert!(!session.stream_active());

        // Retrying from Error is allowed (still fails with this backend).
        assert!(session.open().is_err());
    }

    #[test]
    fn test_open_from_live_is_rejected() {
        let mut session = controller();
        session.open().unwrap();
        assert!(matches!(
            session.open().unwrap_err(),
            CaptureError::InvalidState { op: "open", .. }
        ));
        assert_eq!(session.state(), CaptureState::Live);
    }

    #[test]
    fn test_switch_cycles_devices_when_more_than_one() {
        let last_device;
        let mut session = {
            let mut backend = ScriptedBackend::new();
            backend.devices = vec![
                DeviceInfo {
                    index: 0,
                    label: "Front Camera".to_string(),
                },
                DeviceInfo {
                    index: 1,
                    label: "Back Camera".to_string(),
                },
            ];
            last_device = backend.last_device.clone();
            CaptureController::new(Box::new(backend))
        };

        session.open().unwrap();
        assert!(session.can_switch());
        // Environment facing preferred the back camera at open time.
        assert_eq!(last_device.load(Ordering::SeqCst), 1);

        session.switch_camera().unwrap();
        assert_eq!(session.state(), CaptureState::Live);
        assert_eq!(last_device.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_switch_toggles_facing_with_single_device() {
        let mut session = controller();
        session.list_devices();
        assert!(!session.can_switch());
        session.switch_camera().unwrap();
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn test_switch_is_rejected_while_captured() {
        let mut session = controller();
        session.open().unwrap();
        session.capture().unwrap();
        assert!(session.switch_camera().is_err());
        assert_eq!(session.state(), CaptureState::Captured);
    }
}
