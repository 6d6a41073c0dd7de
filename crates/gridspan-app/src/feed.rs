//! Camera feed sources.
//!
//! The measurement overlay only needs "the latest RGBA frame"; where it
//! comes from is a platform concern. On the web the source executes the
//! rear-camera constraint ladder against `getUserMedia`; on native builds
//! (used for development) a synthetic test pattern stands in for the
//! camera, which is an external collaborator.

use gridspan_core::video::CameraError;
use gridspan_render::VideoFrame;

/// Provider of camera frames for compositing and capture.
pub trait FrameSource {
    /// Begin acquisition. May complete asynchronously; until the stream is
    /// live, `latest_frame` returns `None`.
    fn start(&mut self) -> Result<(), CameraError>;

    /// The most recent decoded frame, if the stream is producing.
    fn latest_frame(&mut self) -> Option<VideoFrame>;

    /// Whether playback was blocked by an autoplay policy and should be
    /// retried on the next user gesture.
    fn needs_user_gesture(&self) -> bool {
        false
    }

    /// Retry playback after a user gesture. Called at most once per load.
    fn retry_after_gesture(&mut self) {}
}

/// Native stand-in: a static gradient so the grid and marks have a
/// backdrop during development.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    started: bool,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            started: false,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn start(&mut self) -> Result<(), CameraError> {
        self.started = true;
        Ok(())
    }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        if !self.started {
            return None;
        }
        let mut rgba = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                rgba.push((x * 255 / self.width.max(1)) as u8);
                rgba.push((y * 255 / self.height.max(1)) as u8);
                rgba.push(96);
                rgba.push(255);
            }
        }
        Some(VideoFrame {
            rgba,
            width: self.width,
            height: self.height,
        })
    }
}

#[cfg(target_arch = "wasm32")]
pub use web_camera::WebCameraSource;

#[cfg(target_arch = "wasm32")]
mod web_camera {
    use super::*;
    use gridspan_core::video::{constraint_ladder, CameraConstraint, ResolutionHint, VideoDevice};
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    /// Shared slot the async acquisition task fills in once a stream is
    /// attached and playing.
    #[derive(Default)]
    struct StreamState {
        video: Option<web_sys::HtmlVideoElement>,
        playback_blocked: bool,
        retried: bool,
    }

    /// Rear camera over `navigator.mediaDevices`.
    pub struct WebCameraSource {
        state: Rc<RefCell<StreamState>>,
        scratch_canvas: Option<web_sys::HtmlCanvasElement>,
    }

    impl WebCameraSource {
        pub fn new() -> Self {
            Self {
                state: Rc::new(RefCell::new(StreamState::default())),
                scratch_canvas: None,
            }
        }

        fn media_devices() -> Result<web_sys::MediaDevices, CameraError> {
            web_sys::window()
                .and_then(|w| w.navigator().media_devices().ok())
                .ok_or(CameraError::Unsupported)
        }

        fn video_constraints(constraint: &CameraConstraint, hint: ResolutionHint) -> JsValue {
            let video = js_sys::Object::new();
            let set = |key: &str, value: &JsValue| {
                let _ = js_sys::Reflect::set(&video, &JsValue::from_str(key), value);
            };
            match constraint {
                CameraConstraint::ExactEnvironment => {
                    let facing = js_sys::Object::new();
                    let _ = js_sys::Reflect::set(
                        &facing,
                        &JsValue::from_str("exact"),
                        &JsValue::from_str("environment"),
                    );
                    set("facingMode", &facing);
                }
                CameraConstraint::IdealEnvironment => {
                    let facing = js_sys::Object::new();
                    let _ = js_sys::Reflect::set(
                        &facing,
                        &JsValue::from_str("ideal"),
                        &JsValue::from_str("environment"),
                    );
                    set("facingMode", &facing);
                }
                CameraConstraint::DeviceId(id) => {
                    let device = js_sys::Object::new();
                    let _ = js_sys::Reflect::set(
                        &device,
                        &JsValue::from_str("exact"),
                        &JsValue::from_str(id),
                    );
                    set("deviceId", &device);
                }
                CameraConstraint::Any => {}
            }
            if !matches!(constraint, CameraConstraint::Any) {
                let ideal = |v: u32| {
                    let o = js_sys::Object::new();
                    let _ = js_sys::Reflect::set(
                        &o,
                        &JsValue::from_str("ideal"),
                        &JsValue::from_f64(f64::from(v)),
                    );
                    o
                };
                set("width", &ideal(hint.width));
                set("height", &ideal(hint.height));
            }
            video.into()
        }

        async fn enumerate_devices(devices: &web_sys::MediaDevices) -> Vec<VideoDevice> {
            let Ok(promise) = devices.enumerate_devices() else {
                return Vec::new();
            };
            let Ok(list) = JsFuture::from(promise).await else {
                return Vec::new();
            };
            js_sys::Array::from(&list)
                .iter()
                .filter_map(|entry| entry.dyn_into::<web_sys::MediaDeviceInfo>().ok())
                .filter(|info| info.kind() == web_sys::MediaDeviceKind::Videoinput)
                .map(|info| VideoDevice {
                    id: info.device_id(),
                    label: info.label(),
                })
                .collect()
        }

        /// Walk the constraint ladder until a stream opens.
        async fn acquire(state: Rc<RefCell<StreamState>>) -> Result<(), CameraError> {
            let devices = Self::media_devices()?;
            let enumerated = Self::enumerate_devices(&devices).await;
            let hint = ResolutionHint::for_device_class(true);

            let mut stream = None;
            for constraint in constraint_ladder(&enumerated) {
                let constraints = web_sys::MediaStreamConstraints::new();
                constraints.set_video(&Self::video_constraints(&constraint, hint));
                let Ok(promise) = devices.get_user_media_with_constraints(&constraints) else {
                    continue;
                };
                match JsFuture::from(promise).await {
                    Ok(value) => {
                        log::info!("camera stream opened with {constraint:?}");
                        stream = Some(web_sys::MediaStream::from(value));
                        break;
                    }
                    Err(e) => {
                        log::warn!("camera constraint {constraint:?} failed: {e:?}");
                    }
                }
            }
            let stream = stream.ok_or(CameraError::NoDevice)?;

            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or(CameraError::Unsupported)?;
            let video: web_sys::HtmlVideoElement = document
                .create_element("video")
                .map_err(|e| CameraError::Stream(format!("{e:?}")))?
                .dyn_into()
                .map_err(|_| CameraError::Unsupported)?;
            video.set_src_object(Some(&stream));
            video.set_autoplay(true);
            video.set_muted(true);
            video.set_plays_inline(true);

            match video.play() {
                Ok(promise) => {
                    if JsFuture::from(promise).await.is_err() {
                        // Autoplay policy: retried on the next user gesture.
                        state.borrow_mut().playback_blocked = true;
                    }
                }
                Err(_) => state.borrow_mut().playback_blocked = true,
            }

            state.borrow_mut().video = Some(video);
            Ok(())
        }
    }

    impl FrameSource for WebCameraSource {
        fn start(&mut self) -> Result<(), CameraError> {
            let state = self.state.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = Self::acquire(state).await {
                    log::error!("camera acquisition failed: {e}");
                    crate::web::show_alert(&format!(
                        "Camera unavailable: {e}. Check browser camera permissions."
                    ));
                }
            });
            Ok(())
        }

        fn latest_frame(&mut self) -> Option<VideoFrame> {
            let state = self.state.borrow();
            let video = state.video.as_ref()?;
            let (w, h) = (video.video_width(), video.video_height());
            if w == 0 || h == 0 {
                return None;
            }
            drop(state);

            let canvas = match &self.scratch_canvas {
                Some(c) => c.clone(),
                None => {
                    let document = web_sys::window()?.document()?;
                    let canvas: web_sys::HtmlCanvasElement =
                        document.create_element("canvas").ok()?.dyn_into().ok()?;
                    self.scratch_canvas = Some(canvas.clone());
                    canvas
                }
            };
            canvas.set_width(w);
            canvas.set_height(h);
            let ctx: web_sys::CanvasRenderingContext2d = canvas
                .get_context("2d")
                .ok()??
                .dyn_into()
                .ok()?;

            let state = self.state.borrow();
            let video = state.video.as_ref()?;
            ctx.draw_image_with_html_video_element(video, 0.0, 0.0)
                .ok()?;
            let data = ctx
                .get_image_data(0.0, 0.0, f64::from(w), f64::from(h))
                .ok()?;
            Some(VideoFrame {
                rgba: data.data().to_vec(),
                width: w,
                height: h,
            })
        }

        fn needs_user_gesture(&self) -> bool {
            let state = self.state.borrow();
            state.playback_blocked && !state.retried
        }

        fn retry_after_gesture(&mut self) {
            let mut state = self.state.borrow_mut();
            if state.retried {
                return;
            }
            state.retried = true;
            if let Some(video) = &state.video {
                let _ = video.play();
                state.playback_blocked = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_pattern_waits_for_start() {
        let mut source = TestPatternSource::new(64, 32);
        assert!(source.latest_frame().is_none());
        source.start().unwrap();
        let frame = source.latest_frame().unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.rgba.len(), 64 * 32 * 4);
    }
}
