use anyhow::Result;
use glam::{Quat, Vec3};
use rigcomp_config::{LayerConfig, TrackerType};
use rigcomp_layer::mock::{projection_views, MockRuntime};
use rigcomp_layer::{
    CompensationLayer, CompositionLayer, FrameEndInfo, LogFeedback, ReferenceSpaceKind, Runtime,
    SpaceHandle,
};
use rigcomp_math::Pose;
use tracing::{info, warn};

/// 90 Hz frame cadence in display-time nanoseconds.
const FRAME_NS: i64 = 11_111_111;
const SIM_SECONDS: f64 = 10.0;

/// Headless stand-in for an XR application driving the layer against
/// a scripted motion rig. Reports how well compensation pins the
/// app-visible head pose and how faithfully the submitted frames
/// return to physical eye poses.
struct App {
    layer: CompensationLayer<MockRuntime>,
    app_space: SpaceHandle,
    app_view: SpaceHandle,
    head_rest: Pose,
    tracker_rest: Pose,
    /// Worst positional error of the app-visible head pose, meters.
    worst_app_error: f32,
    /// Worst positional error of submitted eyes vs physical, meters.
    worst_submit_error: f32,
}

impl App {
    fn new(mut config: LayerConfig) -> Result<Self> {
        if config.tracker_type != TrackerType::Controller {
            warn!(
                ?config.tracker_type,
                "simulation drives a mock controller, overriding tracker type"
            );
            config.tracker_type = TrackerType::Controller;
        }

        let mut layer =
            CompensationLayer::new(MockRuntime::new(), config, None, Box::new(LogFeedback))?;
        let app_space =
            layer.create_reference_space(ReferenceSpaceKind::Local, Pose::IDENTITY)?;
        let app_view = layer.create_reference_space(ReferenceSpaceKind::View, Pose::IDENTITY)?;

        Ok(Self {
            layer,
            app_space,
            app_view,
            head_rest: Pose::from_translation(Vec3::new(0.0, 1.65, 0.0)),
            tracker_rest: Pose::from_translation(Vec3::new(0.0, 0.7, 0.2)),
            worst_app_error: 0.0,
            worst_submit_error: 0.0,
        })
    }

    /// Scripted rig excursion: slow yaw sweep with some roll and heave.
    fn rig_motion(elapsed_s: f64) -> Pose {
        let yaw = 0.25 * (elapsed_s * 0.9).sin() as f32;
        let roll = 0.08 * (elapsed_s * 1.7).sin() as f32;
        let heave = 0.04 * (elapsed_s * 2.3).sin() as f32;
        Pose::new(
            Quat::from_rotation_y(yaw) * Quat::from_rotation_z(roll),
            Vec3::new(0.0, heave, 0.0),
        )
    }

    fn run_frame(&mut self, time: i64, elapsed_s: f64) -> Result<()> {
        let motion = Self::rig_motion(elapsed_s);
        let runtime = self.layer.runtime_mut();
        runtime.set_hmd_pose(self.head_rest.compose(motion));
        runtime.set_controller_pose(self.tracker_rest.compose(motion));

        self.layer.begin_frame(time)?;

        // What the application sees: ideally the rest pose, frozen.
        let located = self.layer.locate_space(self.app_view, self.app_space, time)?;
        let app_error = (located.pose.position - self.head_rest.position).length();
        self.worst_app_error = self.worst_app_error.max(app_error);

        // What the compositor should receive: physical eye poses.
        let physical = self.layer.runtime_mut().locate_views(self.app_space, time)?;
        let views = self.layer.locate_views(self.app_space, time)?;
        self.layer.end_frame(FrameEndInfo {
            display_time: time,
            layers: vec![CompositionLayer::Projection {
                space: self.app_space,
                views: projection_views(&views),
            }],
        })?;

        if let Some(frame) = self.layer.runtime().submitted.last() {
            if let CompositionLayer::Projection { views, .. } = &frame.layers[0] {
                for (submitted, expected) in views.iter().zip(physical.iter()) {
                    let error = (submitted.pose.position - expected.pose.position).length();
                    self.worst_submit_error = self.worst_submit_error.max(error);
                }
            }
        }
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let mut time = FRAME_NS;

        // Two idle frames let the recenter guard from the initial local
        // space creation clear before calibration.
        for _ in 0..2 {
            self.layer.end_frame(FrameEndInfo {
                display_time: time,
                layers: vec![],
            })?;
            time += FRAME_NS;
        }

        self.layer.runtime_mut().set_hmd_pose(self.head_rest);
        self.layer.runtime_mut().set_controller_pose(self.tracker_rest);
        self.layer.activate(time)?;

        let frames = (SIM_SECONDS / (FRAME_NS as f64 * 1e-9)) as usize;
        for frame in 0..frames {
            time += FRAME_NS;
            self.run_frame(time, frame as f64 * FRAME_NS as f64 * 1e-9)?;
        }
        self.layer.deactivate();

        info!(
            frames,
            worst_app_error_mm = self.worst_app_error * 1000.0,
            worst_submit_error_mm = self.worst_submit_error * 1000.0,
            "simulation finished"
        );
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rigcomp=info,rigcomp_layer=info,rigcomp_tracker=info".into()),
        )
        .init();

    info!("motion compensation demo starting");

    let config = rigcomp_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "failed to load config, using defaults");
        LayerConfig::default()
    });
    info!(
        ?config.tracker_type,
        filter_order = config.rotation_filter.order,
        filter_strength = config.rotation_filter.strength,
        "config loaded"
    );

    let mut app = App::new(config)?;
    app.run()
}
