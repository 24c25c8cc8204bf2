//! face_arcade: interactive entry point.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use face_arcade::app::{run, run_headless};
use face_arcade::config::{ArcadeConfig, CameraKind, EngineChoice, ModeChoice, RoiChoice, Variant};
use face_arcade::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "face_arcade")]
#[command(about = "Camera-controlled runner and survivor games")]
struct Cli {
    /// TOML file with startup settings; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    variant: Option<Variant>,
    #[arg(long, value_enum)]
    mode: Option<ModeChoice>,
    #[arg(long, value_enum)]
    engine: Option<EngineChoice>,
    /// Mouth region partition: 3×3 grid or one box.
    #[arg(long, value_enum)]
    roi: Option<RoiChoice>,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long = "sustain-ms")]
    sustain_ms: Option<f64>,
    #[arg(long = "cooldown-ms")]
    cooldown_ms: Option<f64>,
    #[arg(long, value_enum)]
    camera: Option<CameraKind>,
    #[arg(long = "camera-index")]
    camera_index: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Skip the interactive prompts and use defaults.
    #[arg(long)]
    quick: bool,
    /// Run this many simulated frames without a window and print a summary.
    #[arg(long = "headless-frames")]
    headless_frames: Option<u64>,
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.variant.is_some()
            || self.mode.is_some()
            || self.engine.is_some()
            || self.roi.is_some()
            || self.threshold.is_some()
            || self.sustain_ms.is_some()
            || self.cooldown_ms.is_some()
            || self.camera.is_some()
            || self.camera_index.is_some()
            || self.seed.is_some()
    }

    fn apply(&self, cfg: &mut ArcadeConfig) {
        if let Some(v) = self.variant      { cfg.variant = v; }
        if let Some(m) = self.mode         { cfg.set_mode(m); }
        if let Some(e) = self.engine       { cfg.engine = e; }
        if let Some(r) = self.roi          { cfg.roi = r; }
        if let Some(t) = self.threshold    { cfg.threshold = t; }
        if let Some(s) = self.sustain_ms   { cfg.sustain_ms = s; }
        if let Some(c) = self.cooldown_ms  { cfg.cooldown_ms = c; }
        if let Some(k) = self.camera       { cfg.camera = k; }
        if let Some(i) = self.camera_index { cfg.camera_index = i; }
        if let Some(s) = self.seed         { cfg.seed = Some(s); }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = start(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn start(cli: Cli) -> Result<(), AppError> {
    let mut cfg = match &cli.config {
        Some(path) => ArcadeConfig::load(path)?,
        None => ArcadeConfig::default(),
    };

    if let Some(frames) = cli.headless_frames {
        cli.apply(&mut cfg);
        let report = run_headless(cfg, frames)?;
        println!(
            "frames={} sim_time={:.1}s triggers={} runs={} best_score={}",
            report.frames, report.sim_time, report.fires, report.runs, report.score
        );
        return Ok(());
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Face Arcade: open your mouth to jump                ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "webcam")]
    println!("  Camera: webcam available  (--camera webcam)");
    #[cfg(not(feature = "webcam"))]
    println!("  Camera: synthetic face  (use --features webcam for hardware)");
    println!();

    if cli.quick {
        println!("  Quick-start: runner, mouth-open, threshold {:.2}\n", cfg.threshold);
    } else if cli.config.is_none() && !cli.has_overrides() {
        configure_interactively(&mut cfg);
    }
    cli.apply(&mut cfg);

    println!();
    println!("  Opening game window…");
    println!("  Hold O to open the synthetic mouth, S to smile, Q to quit.");
    println!();

    run(cfg)
}

fn configure_interactively(cfg: &mut ArcadeConfig) {
    println!("  Game: 1.Runner  2.Survivor");
    cfg.variant = match read_line("  Choice (default 1): ").trim() {
        "2" => Variant::Survivor,
        _   => Variant::Runner,
    };

    println!("  Trigger: 1.Mouth open  2.Smile");
    let mode = match read_line("  Choice (default 1): ").trim() {
        "2" => ModeChoice::Smile,
        _   => ModeChoice::MouthOpen,
    };
    cfg.set_mode(mode);

    let prompt = format!("  Threshold 0.05–0.95 (default {:.2}): ", cfg.threshold);
    cfg.threshold = read_line(&prompt)
        .trim().parse::<f64>().unwrap_or(cfg.threshold)
        .clamp(0.05, 0.95);

    println!("  Camera: 1.Synthetic  2.Webcam");
    cfg.camera = match read_line("  Choice (default 1): ").trim() {
        "2" => CameraKind::Webcam,
        _   => CameraKind::Synthetic,
    };
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
