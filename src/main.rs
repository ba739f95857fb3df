use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pyroshow::{Quality, ShellType, ShowConfig, SkyLighting};

mod terminal;

fn print_usage() {
    eprintln!("pyroshow - Firework show for the terminal");
    eprintln!();
    eprintln!("Usage: pyroshow [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!("  --config PATH      Load settings from PATH and save them on exit");
    eprintln!("  --log PATH         Write logs to PATH (filter with RUST_LOG)");
    eprintln!("  --seed N           Seed the show for a reproducible run");
    eprintln!("  --shell NAME       Shell type (random, crysanthemum, ring, willow, ...)");
    eprintln!("  --size N           Shell size, 0 (3\") to 4 (12\")");
    eprintln!("  --quality Q        low, normal or high");
    eprintln!("  --sky S            Sky lighting: none, dim or normal");
    eprintln!("  --finale           Start in finale mode");
    eprintln!("  --no-auto          Only launch shells on request");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  space launch   click launch at pointer   p pause   r reload");
    eprintln!("  1-5 size   s shell type   l quality   k sky lighting");
    eprintln!("  f finale   a auto launch   e long exposure   +/- speed");
    eprintln!("  Click the bottom row to set the speed.");
    eprintln!();
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

#[derive(Default)]
struct Args {
    bg_color: Option<(u8, u8, u8)>,
    config_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    seed: Option<u64>,
    shell: Option<ShellType>,
    size: Option<f32>,
    quality: Option<Quality>,
    sky: Option<SkyLighting>,
    finale: bool,
    no_auto: bool,
}

fn fail(message: String) -> ! {
    eprintln!("{message}");
    eprintln!();
    print_usage();
    std::process::exit(1);
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => fail(format!("{flag} requires a value")),
    }
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--bg-color" => {
                let raw = value(args, i, flag);
                match parse_hex_color(raw) {
                    Some(color) => parsed.bg_color = Some(color),
                    None => fail(format!(
                        "Invalid hex color: {raw}\nExpected format: RRGGBB (e.g., 1a1b26)"
                    )),
                }
            }
            "--config" => parsed.config_path = Some(PathBuf::from(value(args, i, flag))),
            "--log" => parsed.log_path = Some(PathBuf::from(value(args, i, flag))),
            "--seed" => {
                let raw = value(args, i, flag);
                parsed.seed = Some(
                    raw.parse()
                        .unwrap_or_else(|_| fail(format!("Invalid seed: {raw}"))),
                );
            }
            "--shell" => {
                parsed.shell = Some(value(args, i, flag).parse().unwrap_or_else(|err| fail(err)));
            }
            "--size" => {
                let raw = value(args, i, flag);
                parsed.size = Some(
                    raw.parse()
                        .unwrap_or_else(|_| fail(format!("Invalid size: {raw}"))),
                );
            }
            "--quality" => {
                let raw = value(args, i, flag);
                parsed.quality = Some(raw.parse().unwrap_or_else(|err| fail(err)));
            }
            "--sky" => {
                parsed.sky = Some(value(args, i, flag).parse().unwrap_or_else(|err| fail(err)));
            }
            "--finale" => {
                parsed.finale = true;
                i += 1;
                continue;
            }
            "--no-auto" => {
                parsed.no_auto = true;
                i += 1;
                continue;
            }
            "help" | "--help" | "-h" => return None,
            arg => fail(format!("Unknown option: {arg}")),
        }
        i += 2;
    }
    Some(parsed)
}

fn init_logging(path: &Path) {
    let file = match File::create(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Could not open log file {}: {err}", path.display());
            return;
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pyroshow=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(args) = parse_args(&args) else {
        print_usage();
        return Ok(());
    };

    if let Some(path) = &args.log_path {
        init_logging(path);
    }

    let mut config = match &args.config_path {
        Some(path) => ShowConfig::load_from(path).unwrap_or_else(|err| {
            warn!(?path, %err, "could not load config, using defaults");
            ShowConfig::default()
        }),
        None => ShowConfig::default(),
    };
    if let Some(shell) = args.shell {
        config.shell = shell;
    }
    if let Some(size) = args.size {
        config.size = size;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(sky) = args.sky {
        config.sky_lighting = sky;
    }
    config.finale |= args.finale;
    config.auto_launch &= !args.no_auto;
    config.validate();

    let options = terminal::Options {
        bg_color: args.bg_color.unwrap_or((0, 0, 0)),
        seed: args.seed,
    };
    info!(?config, "starting show");
    let final_config = terminal::run(config, &options)?;

    if let Some(path) = &args.config_path {
        if let Err(err) = final_config.save_to(path) {
            warn!(?path, %err, "could not save config");
            eprintln!("Could not save config to {}: {err}", path.display());
        }
    }
    Ok(())
}
