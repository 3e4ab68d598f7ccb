//! Offline render: play a preset against a simulated host and print the
//! resulting note events as JSON lines on stdout.
//!
//! ```text
//! arpline-render --preset up.json --notes 60,64,67 --blocks 64 --block-size 512 --tempo 120
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;

use arpline_audio::{create, HostTransport};
use arpline_core::config::Config;
use arpline_core::{compile, persistence};
use arpline_types::{InputEvent, OutputNoteEvent};

const SAMPLE_RATE: f64 = 48000.0;

struct Options {
    preset: Option<PathBuf>,
    notes: Vec<u8>,
    blocks: u32,
    block_size: u32,
    tempo: f64,
    verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            preset: None,
            notes: vec![60, 64, 67],
            blocks: 32,
            block_size: 512,
            tempo: 120.0,
            verbose: false,
        }
    }
}

/// One output line. `block` and `sample` together locate the event in time.
#[derive(Serialize)]
struct RenderedEvent {
    block: u32,
    #[serde(flatten)]
    event: OutputNoteEvent,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--preset" => opts.preset = Some(PathBuf::from(value("--preset")?)),
            "--notes" => {
                opts.notes = value("--notes")?
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.trim().parse::<u8>().map_err(|e| format!("bad note {:?}: {}", s, e)))
                    .collect::<Result<_, _>>()?;
            }
            "--blocks" => opts.blocks = parse_number(&value("--blocks")?)?,
            "--block-size" => opts.block_size = parse_number(&value("--block-size")?)?,
            "--tempo" => opts.tempo = parse_number(&value("--tempo")?)?,
            "--verbose" | "-v" => opts.verbose = true,
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    if opts.notes.iter().any(|&n| n > 127) {
        return Err("notes must be in 0..=127".to_string());
    }
    Ok(opts)
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e| format!("bad number {:?}: {}", s, e))
}

fn init_logging(verbose: bool) {
    use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    // stdout carries the rendered events
    let log_config = simplelog::Config::default();
    if TermLogger::init(log_level, log_config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("logger already initialized");
    }
}

fn run(opts: &Options) -> Result<(), String> {
    let config = Config::load();
    let pattern = match &opts.preset {
        Some(path) => persistence::load_preset(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => config.default_pattern(),
    };
    let timeline = compile(&pattern);
    log::info!(
        target: "render",
        "rendering {} blocks of {} samples, {} compiled notes, loop {} ticks",
        opts.blocks, opts.block_size, timeline.note_count(), timeline.loop_length
    );

    let (handle, mut processor) = create(config.playback_settings(), timeline);
    let held: Vec<InputEvent> = opts.notes.iter().map(|&n| InputEvent::note_on(0, n, 1.0)).collect();

    let mut transport = HostTransport {
        is_playing: true,
        tempo_bpm: opts.tempo,
        sample_rate: SAMPLE_RATE,
        ..HostTransport::default()
    };
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let mut out: Vec<OutputNoteEvent> = Vec::with_capacity(64);

    for block in 0..opts.blocks {
        let input: &[InputEvent] = if block == 0 { &held } else { &[] };
        out.clear();
        processor.process(&transport, opts.block_size, input, &mut out);
        for &event in &out {
            let line = serde_json::to_string(&RenderedEvent { block, event }).map_err(|e| e.to_string())?;
            writeln!(lock, "{}", line).map_err(|e| e.to_string())?;
        }
        handle.collect_garbage();
        transport = transport.advanced(opts.block_size);
    }

    // Final block with the transport stopped releases anything still on.
    transport.is_playing = false;
    out.clear();
    processor.process(&transport, opts.block_size, &[], &mut out);
    for &event in &out {
        let line = serde_json::to_string(&RenderedEvent { block: opts.blocks, event }).map_err(|e| e.to_string())?;
        writeln!(lock, "{}", line).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("arpline-render: {}", e);
            eprintln!("usage: arpline-render [--preset PATH] [--notes 60,64,67] [--blocks N] [--block-size S] [--tempo BPM] [--verbose]");
            return ExitCode::from(2);
        }
    };
    init_logging(opts.verbose);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!(target: "render", "{}", e);
            eprintln!("arpline-render: {}", e);
            ExitCode::FAILURE
        }
    }
}
