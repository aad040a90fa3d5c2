use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use bevy_frame_loader::{
    DecryptHook, DecryptRegistry, FileAssetSource, LoadManifest, MemoryBackends, ProgressEvent,
    ProgressLog, Scheduler,
};

#[derive(Parser)]
#[command(name = "frame-loader")]
#[command(about = "Load the assets listed in a JSON manifest one unit per frame")]
struct Args {
    /// Path to the JSON load manifest
    #[arg(short, long)]
    manifest: String,

    /// Directory asset names are resolved against
    #[arg(short, long, default_value = ".")]
    assets: String,

    /// Simulated frame rate
    #[arg(short, long, default_value = "60")]
    fps: u32,

    /// Register an XOR decrypt hook named "xor" with this key
    #[arg(long)]
    xor_key: Option<String>,

    /// Give up after this many frames
    #[arg(long, default_value = "10000")]
    max_frames: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("📦 Frame loader starting...");
    info!("📄 Manifest: {}", args.manifest);
    info!("📁 Asset root: {}", args.assets);

    let json = std::fs::read_to_string(&args.manifest)
        .map_err(|e| format!("Failed to read manifest: {}", e))?;
    let manifest = LoadManifest::from_json(&json).map_err(|e| e.to_string())?;

    let mut registry = DecryptRegistry::new();
    if let Some(key) = &args.xor_key {
        registry.insert("xor", DecryptHook::xor(key.as_bytes().to_vec()));
    }

    let memory = MemoryBackends::with_source(Arc::new(FileAssetSource::new(&args.assets)));
    let log = Arc::new(ProgressLog::new());
    let mut scheduler =
        Scheduler::with_config(memory.backends(), manifest.config()).with_listener(&log);

    let count = scheduler
        .load_manifest(&manifest, &registry)
        .map_err(|e| e.to_string())?;
    info!("🧩 {} units queued", count);

    scheduler.run().map_err(|e| e.to_string())?;

    let frame = Duration::from_secs(1) / args.fps.max(1);
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last = Instant::now();
    let mut frames = 0u64;
    let mut failures = 0u64;
    while !scheduler.is_finished() {
        interval.tick().await;
        let now = Instant::now();
        let delta = now - last;
        last = now;
        frames += 1;

        if let Err(e) = scheduler.advance(delta) {
            failures += 1;
            warn!("⚠️  Frame {}: {}", frames, e);
        }

        for event in log.drain() {
            if let ProgressEvent::UnitLoaded { completed_index, total } = event {
                info!(
                    "✅ Unit {}/{} loaded ({:.0}%)",
                    completed_index + 1,
                    total,
                    event.fraction() * 100.0
                );
            }
        }

        if frames >= args.max_frames {
            error!("❌ Gave up after {} frames with {} failed attempts", frames, failures);
            return Err("Load did not finish".to_string());
        }
    }

    let report = scheduler.report();
    info!(
        "🎉 Finished in {} frames: {} loaded, {} skipped",
        frames, report.loaded, report.skipped
    );
    if let Some(elapsed) = report.elapsed() {
        info!("⏱️  Wall clock: {} ms", elapsed.num_milliseconds());
    }
    info!(
        "📊 {} textures, {} sprite frames in memory",
        memory.textures.len(),
        memory.sprite_frames.len()
    );

    Ok(())
}
