use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "deepflat", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a deep image.
    Info(InfoArgs),
    /// Composite a deep image (or one frame of a sequence) into a flat raster.
    Flatten(FlattenArgs),
    /// Re-encode a deep image into another container (or a JSON scene).
    Convert(ConvertArgs),
    /// Build a deep image from a JSON scene description.
    Build(BuildArgs),
    /// Compare two flat rasters; exits non-zero when they differ.
    Diff(DiffArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input deep image.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FlattenArgs {
    /// Input deep image, or a frame pattern (`shot.####.dtex`, `shot.%04d.dtex`).
    #[arg(long = "in")]
    in_path: String,

    /// Output raster; the format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Channels to write.
    #[arg(long, value_enum, default_value_t = ChannelChoice::Rgba)]
    channels: ChannelChoice,

    /// Frame to load (defaults to `--first`).
    #[arg(long)]
    frame: Option<i32>,

    /// First frame of the sequence.
    #[arg(long, default_value_t = 1)]
    first: i32,

    /// Last frame of the sequence (defaults to `--first`).
    #[arg(long)]
    last: Option<i32>,

    /// How a missing frame is handled.
    #[arg(long, value_enum, default_value_t = MissingChoice::Error)]
    on_missing: MissingChoice,

    /// Composite rows in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Reject files whose samples are not stored in depth order.
    #[arg(long)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input deep image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output deep image (`.dtex`, `.shw`) or scene description (`.json`).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output deep image (`.dtex` or `.shw`).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct DiffArgs {
    /// First raster.
    #[arg(long)]
    a: PathBuf,

    /// Second raster.
    #[arg(long)]
    b: PathBuf,

    /// Largest channel difference still treated as equal.
    #[arg(long, default_value_t = 0.0)]
    tolerance: f32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChannelChoice {
    Rgba,
    Rgb,
    A,
}

impl From<ChannelChoice> for deepflat::ChannelSelection {
    fn from(c: ChannelChoice) -> Self {
        match c {
            ChannelChoice::Rgba => Self::Rgba,
            ChannelChoice::Rgb => Self::Rgb,
            ChannelChoice::A => Self::Alpha,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MissingChoice {
    Error,
    Nearest,
    Black,
}

impl From<MissingChoice> for deepflat::MissingFramePolicy {
    fn from(c: MissingChoice) -> Self {
        match c {
            MissingChoice::Error => Self::Error,
            MissingChoice::Nearest => Self::NearestFrame,
            MissingChoice::Black => Self::Black,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Flatten(args) => cmd_flatten(args),
        Command::Convert(args) => cmd_convert(args),
        Command::Build(args) => cmd_build(args),
        Command::Diff(args) => cmd_diff(args),
    }
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read deep image '{}'", args.in_path.display()))?;
    let hint = deepflat::DeepFormat::from_extension(&args.in_path);
    let image = deepflat::decode(&bytes, hint, &deepflat::DecodeOptions::default())?;
    let format = deepflat::DeepFormat::sniff(&bytes).or(hint);

    let dw = image.data_window();
    println!("file:        {}", args.in_path.display());
    if let Some(format) = format {
        println!("format:      {format}");
    }
    println!("size:        {}x{}", image.width(), image.height());
    println!("data window: [{}, {}) x [{}, {})", dw.x0, dw.x1, dw.y0, dw.y1);
    println!("channels:    {}", image.channels().names().join(","));
    println!("samples:     {}", image.sample_count());
    println!(
        "non-empty:   {}/{} pixels",
        image.non_empty_pixel_count(),
        image.pixel_count()
    );
    println!("max/pixel:   {}", image.max_samples_per_pixel());
    Ok(())
}

fn cmd_flatten(args: FlattenArgs) -> anyhow::Result<()> {
    let decode = deepflat::DecodeOptions {
        insert_mode: if args.strict {
            deepflat::InsertMode::Strict
        } else {
            deepflat::InsertMode::Sorted
        },
        ..deepflat::DecodeOptions::default()
    };
    let seq = deepflat::SequenceOptions {
        first: args.first,
        last: args.last.unwrap_or(args.first),
        policy: args.on_missing.into(),
        decode,
    };
    let frame = args.frame.unwrap_or(args.first);
    let composite_opts = deepflat::CompositeOptions {
        parallel: args.parallel,
        threads: args.threads,
        ..deepflat::CompositeOptions::default()
    };

    let mut reader = deepflat::SequenceReader::new(args.in_path.as_str(), seq)?;
    let flat = match reader.read_frame(frame)? {
        Some(image) => deepflat::composite_with(&image, &composite_opts)?,
        None => {
            // Size the black frame from whichever frame of the range exists.
            let mut nearest = deepflat::SequenceReader::new(
                args.in_path.as_str(),
                deepflat::SequenceOptions {
                    policy: deepflat::MissingFramePolicy::NearestFrame,
                    ..seq
                },
            )?;
            let image = nearest
                .read_frame(frame)
                .context("no frame in range to size the black output")?
                .context("nearest-frame search returned no image")?;
            deepflat::FlatImage::transparent(image.width(), image.height())
        }
    };

    deepflat::write_flat_image(&flat, &args.out, args.channels.into())?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let image = deepflat::read_deep_image(&args.in_path, &deepflat::DecodeOptions::default())?;

    let is_json = args
        .out
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let json = deepflat::SceneDesc::from_image(&image).to_json_string()?;
        deepflat::ensure_parent_dir(&args.out)?;
        std::fs::write(&args.out, json)
            .with_context(|| format!("write scene '{}'", args.out.display()))?;
    } else {
        deepflat::write_deep_image(&args.out, &image, None)?;
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_build(args: BuildArgs) -> anyhow::Result<()> {
    let image = deepflat::SceneDesc::from_path(&args.scene)?.build()?;
    deepflat::write_deep_image(&args.out, &image, None)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_diff(args: DiffArgs) -> anyhow::Result<()> {
    let a = deepflat::read_flat_image(&args.a)?;
    let b = deepflat::read_flat_image(&args.b)?;
    let report = deepflat::diff_flat_images(&a, &b)?;

    println!("max_abs:          {}", report.max_abs);
    println!("rms:              {}", report.rms);
    println!(
        "differing pixels: {}/{}",
        report.differing_pixels, report.pixel_count
    );
    if report.differs(args.tolerance) {
        anyhow::bail!(
            "images differ (max_abs {} > tolerance {})",
            report.max_abs,
            args.tolerance
        );
    }
    Ok(())
}
