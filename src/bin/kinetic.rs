use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kinetic", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print a summary of a composition.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Normalized timeline position in `[0, 1]`.
    #[arg(long, default_value_t = 0.0)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output scale relative to the composition bounds.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Image assets folder (defaults to the composition's directory).
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Folder with `<family>[-<style>].ttf|otf` fonts for text layers.
    #[arg(long)]
    fonts: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn read_comp_json(path: &Path) -> anyhow::Result<kinetic::Composition> {
    let f = File::open(path).with_context(|| format!("open composition '{}'", path.display()))?;
    let r = BufReader::new(f);
    let comp: kinetic::Composition =
        serde_json::from_reader(r).with_context(|| "parse composition JSON")?;
    Ok(comp)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let comp = read_comp_json(&args.in_path)?;
    comp.validate()?;

    let assets_root = args
        .assets
        .clone()
        .unwrap_or_else(|| args.in_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());

    let orch = kinetic::RenderOrchestrator::new(kinetic::OrchestratorOpts {
        image_assets_folder: Some(assets_root),
        ..kinetic::OrchestratorOpts::default()
    });
    orch.attach(kinetic::RenderTarget::cpu(args.fonts.as_deref()));
    orch.set_composition(Arc::new(comp));
    orch.set_scale(args.scale);
    orch.set_progress(args.progress);

    let width = u32::try_from(orch.intrinsic_width()).context("output width out of range")?;
    let height = u32::try_from(orch.intrinsic_height()).context("output height out of range")?;
    let mut canvas =
        kinetic::CpuCanvas::new(width, height, kinetic::CpuCanvasOpts::default())?;
    orch.draw(&mut canvas)?;
    let frame = canvas.into_frame()?.into_straight();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let comp = read_comp_json(&args.in_path)?;
    comp.validate()?;

    let duration_ms = comp.duration_ms;
    let bounds = comp.bounds;
    let layers = comp.layers.len();
    let images = comp.images.len();

    let orch = kinetic::RenderOrchestrator::default();
    orch.set_composition(Arc::new(comp));
    let stats = orch
        .tree_stats()
        .context("render tree missing after load (bug)")?;

    println!("duration_ms: {duration_ms}");
    println!("bounds:      {}x{}", bounds.width, bounds.height);
    println!("layers:      {layers}");
    println!("nodes:       {}", stats.node_count);
    println!("images:      {images}");
    println!("masks:       {}", orch.has_masks());
    println!("matte:       {}", orch.has_matte());
    Ok(())
}
