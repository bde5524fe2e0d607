use std::path::{Path, PathBuf};

use anyhow::Context as _;
use avatar_resolver::{
    AvatarFont, BASE_SIZE, CpuRenderer, MAX_AVATAR_SIZE, Picture, Renderer as _, color_for_text,
    render_dummy_avatar,
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "avatar-resolver", version)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the generated placeholder avatar for a label as a PNG.
    Dummy(DummyArgs),
    /// Fit an image into a square avatar and write it as a PNG.
    Fit(FitArgs),
    /// Print the background colour derived from a label.
    Color(ColorArgs),
}

#[derive(Parser, Debug)]
struct DummyArgs {
    /// Name or address the glyph is taken from.
    #[arg(long)]
    label: String,

    /// Colour seed. Defaults to the label.
    #[arg(long)]
    seed: Option<String>,

    /// TTF/OTF font for the glyph.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Edge length in pixels.
    #[arg(long, default_value_t = BASE_SIZE, value_parser = parse_size)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FitArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edge length in pixels.
    #[arg(long, default_value_t = BASE_SIZE, value_parser = parse_size)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ColorArgs {
    #[arg(long)]
    label: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Dummy(args) => cmd_dummy(args),
        Command::Fit(args) => cmd_fit(args),
        Command::Color(args) => {
            println!("{}", color_for_text(&args.label).to_hex_rgb());
            Ok(())
        }
    }
}

fn parse_size(s: &str) -> Result<u32, String> {
    let size: u32 = s.parse().map_err(|e| format!("{e}"))?;
    if size == 0 || size > MAX_AVATAR_SIZE {
        return Err(format!("must be in 1..={MAX_AVATAR_SIZE}"));
    }
    Ok(size)
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_dummy(args: DummyArgs) -> anyhow::Result<()> {
    let font = match &args.font {
        Some(path) => AvatarFont::load(path)
            .with_context(|| format!("load font '{}'", path.display()))?,
        None => AvatarFont::none(),
    };
    let picture = render_dummy_avatar(
        &CpuRenderer::new(),
        &font,
        &args.label,
        args.size,
        args.seed.as_deref(),
    );
    write_png(&picture, &args.out)
}

fn cmd_fit(args: FitArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;
    let picture = CpuRenderer::new()
        .render_from_bytes(&bytes, args.size)
        .with_context(|| format!("decode image '{}'", args.in_path.display()))?;
    write_png(&picture, &args.out)
}

fn write_png(picture: &Picture, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let img = picture
        .to_rgba_image()
        .context("picture buffer does not match its dimensions")?;
    img.save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
