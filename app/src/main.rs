//! keyloop console: global hotkeys toggle recording and playback, stdin takes commands.

mod commands;

use clap::Parser;
use commands::{help_text, Cli, Command};
use crossbeam_channel::{never, select, tick, unbounded, Sender};
use keyloop_core::{
    load_config, load_default_config, ConfigError, EngineEvent, KeyPressFeed, MacroEngine,
    Transition,
};
use keyloop_platform::{key_name, platform_io, PlatformError};
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
enum AppError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("platform: {0}")]
    Platform(#[from] PlatformError),
}

enum Input {
    Line(String),
    Eof,
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "keyloop=info,keyloop_core=info,keyloop_platform=info".into()
            }),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn spawn_stdin_reader(tx: Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(Input::Eof);
    });
}

fn report(transition: Transition) {
    if let Transition::Ignored(refusal) = transition {
        println!("ignored: {refusal}");
    }
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::RecordingStarted => "recording...".into(),
        EngineEvent::KeyCaptured { code, offset_ms, count } => {
            format!("#{count} {} at {offset_ms} ms", key_name(*code))
        }
        EngineEvent::RecordingStopped { event_count, macro_available } => {
            if *macro_available {
                format!("recorded {event_count} keys")
            } else {
                "nothing recorded".into()
            }
        }
        EngineEvent::PlaybackStarted { event_count } => format!("playing {event_count} keys"),
        EngineEvent::PassCompleted { pass } => format!("pass {pass} done"),
        EngineEvent::PlaybackFinished { passes } => format!("finished after {passes} passes"),
        EngineEvent::PlaybackStopped => "playback stopped".into(),
    }
}

fn print_events(engine: &MacroEngine, json: bool) {
    for event in engine.drain() {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to encode event: {}", e),
            }
        } else {
            println!("{}", describe(&event));
        }
    }
}

fn print_status(engine: &MacroEngine, json: bool) {
    let status = engine.status();
    if json {
        match serde_json::to_string(&status) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to encode status: {}", e),
        }
    } else {
        println!("{status}");
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };

    let hotkeys = config.hotkeys;
    let io = platform_io(config.capture, cli.dry_run)?;
    let hotkey_rx = io.hotkeys.subscribe();
    let no_hotkeys = never();
    let mut hotkeys_live = true;
    let mut builder = MacroEngine::builder(io.keys, io.injector).config(config);
    if let Some(feed) = io.press_feed {
        builder = builder.press_feed(feed);
    }
    let engine = builder.build()?;

    let (input_tx, input_rx) = unbounded();
    spawn_stdin_reader(input_tx);
    let ticker = tick(Duration::from_millis(100));

    let help = help_text(&hotkeys);
    println!("{help}");
    info!(record = %key_name(hotkeys.record), play = %key_name(hotkeys.play), "keyloop ready");

    loop {
        let command = {
            let hotkey_source = if hotkeys_live { &hotkey_rx } else { &no_hotkeys };
            select! {
                recv(input_rx) -> msg => match msg {
                    Ok(Input::Line(line)) if line.trim().is_empty() => None,
                    Ok(Input::Line(line)) => match line.parse::<Command>() {
                        Ok(command) => Some(command),
                        Err(e) => {
                            println!("{e}");
                            None
                        }
                    },
                    Ok(Input::Eof) | Err(_) => Some(Command::Quit),
                },
                recv(hotkey_source) -> msg => match msg {
                    Ok(code) => Command::for_hotkey(code, &hotkeys),
                    Err(_) => {
                        warn!("Hotkey feed closed, recording and playback can no longer be toggled");
                        hotkeys_live = false;
                        None
                    }
                },
                recv(ticker) -> _ => {
                    print_events(&engine, cli.json);
                    None
                },
            }
        };

        match command {
            Some(Command::ToggleRecording) => report(engine.toggle_recording()),
            Some(Command::TogglePlayback) => report(engine.toggle_playback()),
            Some(Command::Status) => print_status(&engine, cli.json),
            Some(Command::Help) => println!("{help}"),
            Some(Command::Quit) => break,
            None => {}
        }
    }

    engine.shutdown();
    print_events(&engine, cli.json);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
