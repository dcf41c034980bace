use std::env;
use std::str::FromStr;

use anyhow::Context;
use dragon_glide::config::SceneConfig;
use dragon_glide::profiler::Profiler;
use dragon_glide::renderer::FrameRecorder;
use dragon_glide::scene::{Scene, TickOutcome};

const DEFAULT_FRAMES: u64 = 600;
const FRAME_MS: f64 = 1000.0 / 60.0;

fn env_override<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("failed to parse {name}={value}")),
        Err(_) => Ok(None),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = SceneConfig::default();
    if let Some(seed) = env_override("DRAGON_SEED")? {
        config.seed = seed;
    }
    let frames = env_override("DRAGON_FRAMES")?.unwrap_or(DEFAULT_FRAMES);
    let profile = env_override::<u8>("DRAGON_PROFILE")?.unwrap_or(0) != 0;

    let mut scene = Scene::new(config).context("failed to create scene")?;
    if profile {
        match Profiler::create_in("debug") {
            Ok((profiler, path)) => {
                log::info!("profiling to {}", path.display());
                scene = scene.with_profiler(profiler);
            }
            Err(err) => log::warn!("failed to initialise profiler: {err:?}"),
        }
    }

    // headless: a fixed 60 Hz clock driving a recorder instead of a window
    let mut recorder = FrameRecorder::new();
    let mut rendered = 0u64;
    let mut triangles = 0usize;
    for frame in 0..=frames {
        if let TickOutcome::Rendered(summary) = scene.tick(frame as f64 * FRAME_MS, &mut recorder) {
            rendered += 1;
            triangles += summary.terrain_triangles + summary.dragon_triangles;
            if frame % 60 == 0 {
                log::info!(
                    "frame {frame}: dragon at ({:.2}, {:.2}, {:.2}), {} chunks cached",
                    summary.position.x,
                    summary.position.y,
                    summary.position.z,
                    summary.cached_chunks
                );
            }
        }
    }

    scene.finish();
    log::info!(
        "rendered {rendered} frames, {:.0} triangles per frame",
        triangles as f64 / rendered.max(1) as f64
    );
    Ok(())
}
