use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cam_iface::{
    CamCommand, CamErrorCode, CameraDevice, CameraGeometry, CameraObserver, Orientation, TorchMode,
};
use luma_frame::{LumaFrame, LumaView};
use marker_store::{CandidatePoint, CandidateSink};
use scan_pipeline::{DecodeError, SymbolDecoder};
use scancam::{default_session_cfg, start_session, ScanEvents, SessionPhase};
use torch_trigger::LightSensor;
use viewfinder_geom::ViewGeometry;

// ---------------------------
// fakes

/// Decodes successfully on the listed (1-based) frame numbers.
struct ScriptedDecoder {
    succeed_on: Vec<usize>,
    calls: Arc<AtomicUsize>,
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(
        &mut self,
        _luma: &LumaView<'_>,
        hints: &dyn CandidateSink,
    ) -> Result<String, DecodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        hints.accept(CandidatePoint {
            x: call as f32,
            y: 0.0,
        });
        if self.succeed_on.contains(&call) {
            Ok(format!("payload-{call}"))
        } else {
            Err(DecodeError::NotFound)
        }
    }
}

#[derive(Clone, Default)]
struct RecordingEvents {
    successes: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl ScanEvents for RecordingEvents {
    fn on_decode_success(&mut self, payload: String) {
        self.successes.lock().unwrap().push(payload);
    }
    fn on_decode_failure(&mut self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
struct FakeAudio {
    plays: Arc<AtomicUsize>,
}
impl alert_player::AudioAlert for FakeAudio {
    fn prepare(&mut self) -> alert_player::Result<()> {
        Ok(())
    }
    fn play(&mut self) -> alert_player::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn release(&mut self) {}
}

struct FakeHaptic;
impl alert_player::HapticBuzzer for FakeHaptic {
    fn pulse(&mut self, _duration_millis: u64) {}
}

struct FakeSensor {
    present: bool,
    running: Arc<Mutex<bool>>,
}

impl LightSensor for FakeSensor {
    fn start(&mut self) -> torch_trigger::Result<bool> {
        if self.present {
            *self.running.lock().unwrap() = true;
        }
        Ok(self.present)
    }
    fn stop(&mut self) {
        *self.running.lock().unwrap() = false;
    }
}

/// Records torch transitions; everything else is canned.
struct FakeCamera {
    torch_log: Vec<TorchMode>,
}

impl CameraDevice for FakeCamera {
    fn open(&mut self, _auto_focus: bool) -> cam_iface::Result<()> {
        Ok(())
    }
    fn close(&mut self) -> cam_iface::Result<()> {
        Ok(())
    }
    fn is_opened(&self) -> bool {
        true
    }
    fn resolution(&self) -> cam_iface::Result<(u32, u32)> {
        Ok((1280, 720))
    }
    fn is_front_facing(&self) -> cam_iface::Result<bool> {
        Ok(false)
    }
    fn display_orientation(&self) -> cam_iface::Result<Orientation> {
        Ok(Orientation::Deg90)
    }
    fn set_torch(&mut self, mode: TorchMode) -> cam_iface::Result<()> {
        self.torch_log.push(mode);
        Ok(())
    }
}

// ---------------------------
// helpers

fn portrait_camera() -> CameraGeometry {
    CameraGeometry {
        sensor_width: 1280,
        sensor_height: 720,
        orientation: Orientation::Deg90,
        is_front_facing: false,
    }
}

fn portrait_view() -> ViewGeometry {
    ViewGeometry {
        width: 1080,
        height: 1920,
    }
}

/// A frame sized like the orientation-normalized sensor buffer.
fn frame() -> LumaFrame {
    LumaFrame::from_packed(720, 1280, vec![0; 720 * 1280]).unwrap()
}

struct Fixture {
    session: scancam::ScanSession<FakeAudio, FakeHaptic, FakeSensor>,
    frame_handler: scancam::FrameHandler<ScriptedDecoder, RecordingEvents>,
    torch_watcher: scancam::TorchWatcher,
    cam_command_rx: tokio::sync::mpsc::Receiver<CamCommand>,
    events: RecordingEvents,
    decoder_calls: Arc<AtomicUsize>,
    sensor_running: Arc<Mutex<bool>>,
    audio_plays: Arc<AtomicUsize>,
}

fn fixture(succeed_on: Vec<usize>, sensor_present: bool) -> Fixture {
    let decoder_calls = Arc::new(AtomicUsize::new(0));
    let decoder = ScriptedDecoder {
        succeed_on,
        calls: Arc::clone(&decoder_calls),
    };
    let events = RecordingEvents::default();
    let sensor_running = Arc::new(Mutex::new(false));
    let sensor = FakeSensor {
        present: sensor_present,
        running: Arc::clone(&sensor_running),
    };
    let audio = FakeAudio::default();
    let audio_plays = Arc::clone(&audio.plays);
    let parts = start_session(
        default_session_cfg(),
        decoder,
        events.clone(),
        audio,
        FakeHaptic,
        sensor,
    )
    .unwrap();
    Fixture {
        session: parts.session,
        frame_handler: parts.frame_handler,
        torch_watcher: parts.torch_watcher,
        cam_command_rx: parts.cam_command_rx,
        events,
        decoder_calls,
        sensor_running,
        audio_plays,
    }
}

// ---------------------------
// tests

#[test]
fn success_callback_fires_exactly_once() -> eyre::Result<()> {
    // Frames 3 and 5 would both decode; only frame 3 may dispatch even if
    // delivery races keep frames coming after the session succeeded.
    let mut fx = fixture(vec![3, 5], false);
    fx.frame_handler.on_camera_ready(portrait_camera());

    let frame = frame();
    let mut continue_flags = Vec::new();
    for _ in 0..6 {
        continue_flags.push(fx.frame_handler.on_frame(&frame));
    }

    assert_eq!(continue_flags, vec![true, true, false, false, false, false]);
    assert_eq!(
        *fx.events.successes.lock().unwrap(),
        vec!["payload-3".to_string()]
    );
    // Frames after the success were never analyzed.
    assert_eq!(fx.decoder_calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn finish_stops_frame_delivery_without_dispatch() -> eyre::Result<()> {
    let mut fx = fixture(vec![1], false);
    fx.frame_handler.on_camera_ready(portrait_camera());

    fx.session.finish();
    assert_eq!(fx.session.phase(), SessionPhase::Finished);

    // The liveness snapshot is taken at callback entry; a finished session
    // refuses the frame before any camera-derived state is touched.
    assert!(!fx.frame_handler.on_frame(&frame()));
    assert_eq!(fx.decoder_calls.load(Ordering::SeqCst), 0);
    assert!(fx.events.successes.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn frames_before_camera_ready_are_skipped_not_fatal() {
    let mut fx = fixture(vec![1], false);
    assert!(fx.frame_handler.on_frame(&frame()));
    assert_eq!(fx.decoder_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn fatal_camera_error_ends_session_with_message() {
    let mut fx = fixture(vec![], false);
    fx.frame_handler.on_camera_ready(portrait_camera());

    fx.frame_handler.on_camera_error(CamErrorCode::CameraInUse);
    assert_eq!(
        *fx.events.failures.lock().unwrap(),
        vec![CamErrorCode::CameraInUse.user_message().to_string()]
    );
    assert!(!fx.frame_handler.on_frame(&frame()));
}

#[test]
fn permission_error_defers_to_platform_flow() {
    let mut fx = fixture(vec![], false);
    fx.frame_handler.on_camera_ready(portrait_camera());

    fx.frame_handler.on_camera_error(CamErrorCode::NoPermission);
    assert!(fx.events.failures.lock().unwrap().is_empty());
    // The session is still waiting for frames.
    assert!(fx.frame_handler.on_frame(&frame()));
}

#[test]
fn render_tick_draws_only_in_foreground() -> eyre::Result<()> {
    let mut fx = fixture(vec![], false);
    fx.frame_handler.on_camera_ready(portrait_camera());
    fx.session.set_view_geometry(portrait_view());

    assert!(fx.session.render_tick(0).is_none());

    fx.session.foreground()?;
    assert!(fx.session.render_tick(1).is_some());

    fx.session.background();
    assert!(fx.session.render_tick(2).is_none());
    Ok(())
}

#[test]
fn render_tick_drains_marker_batch() -> eyre::Result<()> {
    let mut fx = fixture(vec![], false);
    fx.frame_handler.on_camera_ready(portrait_camera());
    fx.session.set_view_geometry(portrait_view());
    fx.session.foreground()?;

    let frame = frame();
    for _ in 0..4 {
        fx.frame_handler.on_frame(&frame);
    }

    // Framing rect + scan line + one circle per hint.
    let drawn = fx.session.render_tick(0).unwrap();
    assert_eq!(drawn.shapes.len(), 2 + 4);
    // The batch was consumed; the next tick starts empty.
    let drawn = fx.session.render_tick(1).unwrap();
    assert_eq!(drawn.shapes.len(), 2);
    Ok(())
}

#[test]
fn degenerate_view_geometry_skips_rendering() -> eyre::Result<()> {
    let mut fx = fixture(vec![], false);
    fx.frame_handler.on_camera_ready(portrait_camera());
    fx.session.set_view_geometry(ViewGeometry {
        width: 1080,
        height: 0,
    });
    fx.session.foreground()?;
    assert!(fx.session.render_tick(0).is_none());

    // A later layout pass recovers.
    fx.session.set_view_geometry(portrait_view());
    assert!(fx.session.render_tick(1).is_some());
    Ok(())
}

#[test]
fn torch_commands_reach_camera_queue_without_chatter() -> eyre::Result<()> {
    let mut fx = fixture(vec![], true);
    fx.session.foreground()?;
    assert!(*fx.sensor_running.lock().unwrap());

    for lux in [500.0, 40.0, 44.0, 46.0, 44.0] {
        fx.torch_watcher.on_sample(lux);
    }
    assert_eq!(
        fx.cam_command_rx.try_recv().ok(),
        Some(CamCommand::SetTorch(TorchMode::On))
    );
    assert!(fx.cam_command_rx.try_recv().is_err());

    fx.torch_watcher.on_sample(600.0);
    assert_eq!(
        fx.cam_command_rx.try_recv().ok(),
        Some(CamCommand::SetTorch(TorchMode::Off))
    );
    Ok(())
}

#[test]
fn queued_torch_commands_apply_to_device() -> eyre::Result<()> {
    let mut fx = fixture(vec![], true);
    fx.session.foreground()?;
    for lux in [30.0, 800.0, 20.0] {
        fx.torch_watcher.on_sample(lux);
    }

    let mut camera = FakeCamera { torch_log: vec![] };
    scancam::apply_cam_commands(&mut camera, &mut fx.cam_command_rx);
    assert_eq!(
        camera.torch_log,
        vec![TorchMode::On, TorchMode::Off, TorchMode::On]
    );
    Ok(())
}

#[test]
fn background_unsubscribes_light_sensor() -> eyre::Result<()> {
    let mut fx = fixture(vec![], true);
    fx.session.foreground()?;
    assert!(*fx.sensor_running.lock().unwrap());
    fx.session.background();
    assert!(!*fx.sensor_running.lock().unwrap());
    Ok(())
}

#[test]
fn decode_feedback_plays_once_armed_and_prepared() -> eyre::Result<()> {
    let mut fx = fixture(vec![], false);
    fx.session.foreground()?;

    // Not yet prepared: silently ignored.
    fx.session.decode_feedback(true)?;
    assert_eq!(fx.audio_plays.load(Ordering::SeqCst), 0);

    fx.session.on_feedback_prepared();
    fx.session.decode_feedback(true)?;
    assert_eq!(fx.audio_plays.load(Ordering::SeqCst), 1);

    fx.session.on_feedback_complete();
    fx.session.finish();
    Ok(())
}

#[test]
fn absent_light_sensor_is_tolerated() -> eyre::Result<()> {
    let mut fx = fixture(vec![], false);
    fx.session.foreground()?;
    assert!(!*fx.sensor_running.lock().unwrap());
    fx.session.finish();
    Ok(())
}
