use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wordreel::{
    CardKind, CardRasterizer, CommandSynth, ReelConfig, SilenceSynth, SpeechSynth,
    config::read_words_file,
};

#[derive(Parser, Debug)]
#[command(name = "wordreel", version, about = "Render spoken word-card reels")]
struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a reel to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single card as a PNG.
    Card(CardArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Words to speak, in order. Appended after `--words-file` entries.
    words: Vec<String>,

    /// Output MP4 path. Falls back to `output` from the config file.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Reel config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Text file with one word per line.
    #[arg(long)]
    words_file: Option<PathBuf>,

    #[command(flatten)]
    tts: TtsArgs,

    /// Minimum seconds per word card.
    #[arg(long)]
    per_word: Option<f64>,

    /// Count down from this number.
    #[arg(long)]
    countdown: Option<u32>,

    /// Closing card text.
    #[arg(long)]
    outro: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

#[derive(Args, Debug)]
struct TtsArgs {
    /// TTS command template with `{out}` and optionally `{text}`,
    /// e.g. "espeak-ng -w {out} {text}".
    #[arg(long, conflicts_with = "silence")]
    tts_cmd: Option<String>,

    /// Use silent speech of this many seconds instead of a TTS program.
    #[arg(long)]
    silence: Option<f64>,

    /// Pipe the text to the TTS command on stdin.
    #[arg(long, requires = "tts_cmd")]
    tts_stdin: bool,

    /// Extension of the audio file the TTS command writes.
    #[arg(long, requires = "tts_cmd")]
    tts_ext: Option<String>,
}

#[derive(Args, Debug)]
struct CardArgs {
    /// Card text.
    #[arg(long)]
    text: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Reel config JSON (size and style are used).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the countdown number style.
    #[arg(long)]
    countdown_style: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Card(args) => cmd_card(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ReelConfig> {
    match path {
        Some(p) => Ok(ReelConfig::from_json_path(p)?),
        None => Ok(ReelConfig::default()),
    }
}

fn make_tts(args: &TtsArgs) -> anyhow::Result<Option<Box<dyn SpeechSynth>>> {
    if let Some(template) = &args.tts_cmd {
        let mut synth = CommandSynth::from_template(template)?.text_on_stdin(args.tts_stdin);
        if let Some(ext) = &args.tts_ext {
            synth = synth.with_extension(ext.as_str());
        }
        return Ok(Some(Box::new(synth)));
    }
    Ok(args
        .silence
        .map(|secs| Box::new(SilenceSynth::new(secs)) as Box<dyn SpeechSynth>))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;

    let mut words = Vec::new();
    if let Some(path) = &args.words_file {
        words.extend(read_words_file(path)?);
    }
    words.extend(args.words);
    if !words.is_empty() {
        cfg.words = words;
    }

    let opts = &mut cfg.options;
    if let Some(v) = args.per_word {
        opts.per_word_duration = v;
    }
    if let Some(v) = args.countdown {
        opts.countdown_from = v;
    }
    if let Some(v) = args.outro {
        opts.outro_text = Some(v);
    }
    if let Some(v) = args.width {
        opts.size.width = v;
    }
    if let Some(v) = args.height {
        opts.size.height = v;
    }

    let out = args
        .out
        .or(cfg.output.take())
        .context("no output path: pass --out or set \"output\" in the config")?;
    let tts = make_tts(&args.tts)?;

    let written =
        wordreel::generate_word_audio_video(&cfg.words, &out, tts.as_deref(), &cfg.options)?;
    eprintln!("wrote {}", written.display());
    Ok(())
}

fn cmd_card(args: CardArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let kind = if args.countdown_style {
        CardKind::Countdown(1)
    } else {
        CardKind::Word(0)
    };

    let raster = CardRasterizer::new(cfg.options.size, cfg.options.style)?;
    tracing::debug!(faces = raster.font_faces(), "font database ready");
    let frame = raster.rasterize(kind, &args.text)?;

    wordreel::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
