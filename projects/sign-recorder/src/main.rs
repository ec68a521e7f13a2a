use anyhow::{Context, Result};
use sign_recorder::cli::{Args, Mode};
use sign_recorder::dataset::{list_clips, ClipAllocator, CsvCatalog, DatasetLayout};
use sign_recorder::display::overlay::OverlayWindow;
use sign_recorder::display::{NullDisplay, StatusDisplay};
use sign_recorder::pose::yolo::UslsPoseSource;
use sign_recorder::recorder::{run, Recorder};
use sign_recorder::segmentation::{ManualController, SegmentationController, Segmenter};
use sign_recorder::video::camera::OpencvCamera;
use sign_recorder::video::file_source::OpencvFileSource;
use sign_recorder::video::writer::OpencvClipWriter;
use sign_recorder::video::FrameSource;

use opencv::core::Mat;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();
    args.validate()?;
    let config = args.segmentation_config()?;

    let layout = DatasetLayout::new(&args.dataset_root, &args.label, &args.metadata_file)?;
    let label_dir = layout.prepare()?;
    let allocator = ClipAllocator::scan(&label_dir)?;
    let catalog = CsvCatalog::open(&layout.metadata_path)?;

    tracing::info!(
        "Label '{}': {} clips in {:?}",
        layout.label,
        list_clips(&label_dir).len(),
        label_dir
    );
    match catalog.count_for_label(&layout.label) {
        Ok(rows) => tracing::info!(
            "{} catalog rows for '{}' in {:?}",
            rows,
            layout.label,
            catalog.path()
        ),
        Err(e) => tracing::warn!(
            "Could not count catalog rows in {:?}: {:#}",
            catalog.path(),
            e
        ),
    }

    let segmenter: Box<dyn Segmenter<Mat>> = match args.mode {
        Mode::Auto => {
            tracing::info!(
                "Automatic mode: threshold={:.3}, cooldown={:.2}s, calibration={:.2}s, missing landmarks={}",
                config.movement_threshold,
                config.cooldown.as_secs_f32(),
                config.calibration_window.as_secs_f32(),
                config.missing_landmarks
            );
            Box::new(SegmentationController::new(config, allocator))
        }
        Mode::Manual => {
            tracing::info!("Manual mode: press R to record {} frames", args.clip_frames);
            Box::new(ManualController::new(args.clip_frames, allocator))
        }
    };

    let writer = OpencvClipWriter::mp4v()?;
    let mut recorder = Recorder::new(&layout.label, segmenter, writer, catalog, args.fps);

    let mut pose = UslsPoseSource::new(&args.model, args.min_keypoint_confidence)
        .with_context(|| format!("Failed to load pose model {}", args.model))?;

    let mut source: Box<dyn FrameSource<Mat>> = match &args.input {
        Some(path) => {
            let path = path
                .to_str()
                .with_context(|| format!("Input path is not valid UTF-8: {:?}", path))?;
            Box::new(OpencvFileSource::open(path)?)
        }
        None => Box::new(
            OpencvCamera::open(args.camera, !args.no_mirror)
                .with_context(|| format!("Failed to open camera {}", args.camera))?,
        ),
    };

    let mut display: Box<dyn StatusDisplay<Mat>> = if args.headless {
        Box::new(NullDisplay)
    } else {
        Box::new(OverlayWindow::new(
            &format!("Sign recorder: {}", layout.label),
            args.confirm_pause_ms,
        )?)
    };

    let summary = run(&mut recorder, &mut *source, &mut pose, &mut *display)?;

    tracing::info!(
        "Done: {} frames ({} missed), {} clips saved, {} failures",
        summary.frames,
        summary.missed,
        summary.clips_saved,
        summary.failures
    );

    Ok(())
}
