use anyhow::{Context, Result};
use clap::Parser;
use echotrace::audio_data::EchoTraceAudioData;
use echotrace::config::{AcousticConfig, EchoTraceWorldDesc};
use echotrace::engine::EchoTraceEngine;
use echotrace::math::{Pose, Vec3};
use echotrace::playback::LoopMode;
use echotrace::scene::{Aabb, AnalyticScene, Surface};
use echotrace::world::EchoTraceWorld;
use echotrace::{EchoTraceEvent, load_impulse_response_wav};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Walks a listener around a pillar in a shoebox room and reports the
/// propagation paths found on the way.
#[derive(Parser, Debug)]
#[command(name = "echotrace-demo")]
#[command(version, about, long_about = None)]
pub struct DemoOptions {
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 120)]
    pub ticks: usize,

    /// Bounce iterations for higher-order reflections
    #[arg(long, default_value_t = 4)]
    pub bounces: usize,

    /// Directions sampled around source and listener
    #[arg(long, default_value_t = 256)]
    pub resolution: usize,

    /// Audio file to play through the renderer
    #[arg(long)]
    pub play: Option<PathBuf>,

    /// Impulse-response WAV file to load and summarize
    #[arg(long = "ir")]
    pub impulse_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// 10 x 3 x 8 m room with a pillar in the middle.
fn build_scene() -> AnalyticScene {
    AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 3.0, 8.0)).with_surface(Surface::Box(
        Aabb::new(Vec3::new(4.6, 0.0, 3.6), Vec3::new(5.4, 3.0, 4.4)),
    ))
}

/// Listener walks a circle around the pillar, always facing the source.
fn listener_pose(tick: usize, ticks: usize, source: Vec3) -> Pose {
    let angle = std::f32::consts::TAU * tick as f32 / ticks.max(1) as f32;
    let center = Vec3::new(5.0, 1.6, 4.0);
    let mut pose = Pose::from_position(center + Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 2.5));
    pose.look_at(source);
    pose
}

pub fn run(options: &DemoOptions) -> Result<()> {
    if let Some(path) = &options.impulse_file {
        let (samples, sample_rate, channels) = load_impulse_response_wav(path)?;
        log::info!(
            "Impulse response file {}: {} frames, {} channels, {} Hz",
            path.display(),
            samples.len() / channels.max(1) as usize,
            channels,
            sample_rate
        );
    }

    let desc = EchoTraceWorldDesc {
        sample_rate: 48000,
        block_size: 1024,
        acoustics: AcousticConfig::new()
            .sample_resolution(options.resolution)
            .bounce_count(options.bounces),
        ..Default::default()
    };

    let mut world = EchoTraceWorld::new(desc.clone())?;
    world.set_collision_oracle(Arc::new(build_scene()));
    let source = Vec3::new(2.0, 1.5, 4.0);
    world.set_source_position(source);

    let mut engine = None;
    if let Some(path) = &options.play {
        log::info!("Loading dry clip {}", path.display());
        let clip = EchoTraceAudioData::from_path(path)?;
        let id = world.register_audio(clip)?;

        let context = world
            .take_render_endpoint()
            .context("render endpoint already taken")?;
        let mut output = EchoTraceEngine::with_render_context(desc.clone(), context)?;
        match output.start() {
            Ok(()) => {
                world.play(id, LoopMode::Infinite)?;
                engine = Some(output);
            }
            Err(e) => log::error!("Could not start audio output, continuing silently: {}", e),
        }
    }

    let frame = Duration::from_secs_f32(1.0 / 60.0);
    let mut slowest = Duration::ZERO;
    for tick in 0..options.ticks {
        let started = Instant::now();
        world.set_listener_pose(listener_pose(tick, options.ticks, source));
        let report = world.tick()?;
        slowest = slowest.max(report.elapsed);

        if tick % 30 == 0 {
            log::info!(
                "tick {:4}: direct={} primary={} secondary={} higher={} ({:?})",
                report.version,
                report.direct,
                report.primary,
                report.secondary,
                report.higher_order,
                report.elapsed
            );
            if let Some(ir) = world.impulse_response() {
                log::info!(
                    "  impulse response: first arrival {:?}, peak {:.3}, energy {:.3}, {} paths beyond {} taps",
                    ir.first_arrival(),
                    ir.peak(),
                    ir.energy(),
                    ir.truncated_paths,
                    ir.len()
                );
            }
        }

        for event in world.poll_events() {
            match event {
                EchoTraceEvent::SnapshotAdopted { .. } => {}
                other if other.is_error() => log::warn!("{:?}", other),
                other => log::debug!("{:?}", other),
            }
        }

        if engine.is_some() {
            if let Some(rest) = frame.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    log::info!("Slowest tick: {:?}", slowest);
    if let Some(mut engine) = engine {
        world.stop_all()?;
        engine.stop()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        DemoOptions::command().debug_assert();
    }

    #[test]
    fn test_defaults_and_flags() {
        let defaults = DemoOptions::try_parse_from(["echotrace-demo"]).unwrap();
        assert_eq!((defaults.ticks, defaults.bounces, defaults.resolution), (120, 4, 256));
        assert!(defaults.play.is_none() && !defaults.verbose);

        let options = DemoOptions::try_parse_from([
            "echotrace-demo",
            "--ticks",
            "10",
            "--ir",
            "room.wav",
            "-v",
        ])
        .unwrap();
        assert_eq!(options.ticks, 10);
        assert_eq!(options.impulse_file, Some(PathBuf::from("room.wav")));
        assert!(options.verbose);

        assert!(DemoOptions::try_parse_from(["echotrace-demo", "--ticks", "many"]).is_err());
    }
}
