//! # Gram - A Lightweight Multi-File Text Editor
//!
//! This binary is a headless front-end over `gram-core`: it reads
//! commands from stdin, one per line, and runs the file watcher between
//! them. A graphical front-end drives the same `Editor` API.
//!
//! ```text
//! open: notes.txt          any palette line is submitted as typed
//! key ctrl+s               a key press
//! type hello\n             text typed into the active buffer
//! complete open: src/      list completions for a palette line
//! choose 0                 put completion 0 into the palette
//! delword                  delete the last word of the palette line
//! show                     print the active buffer
//! quit
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run -- path/to/file.txt
//! cargo run -- path/to/file.txt "geo=[0, 0, 800, 600]" -v
//! ```

use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gram_buffer::Direction;
use gram_core::editor::Geometry;
use gram_core::{Editor, EditorEvent, EventHandler, KeyPress, Session};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(2);

/// Gram - a lightweight multi-file text editor
#[derive(Parser, Debug)]
#[command(name = "gram")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Window geometry, as `geo=[x, y, w, h]`
    #[arg(value_name = "GEO")]
    geometry: Option<String>,

    /// Data directory (default: ~/.gram)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Screen width used to place new instances
    #[arg(long, default_value_t = 1920)]
    screen_width: i32,

    /// Log every edit and command
    #[arg(short, long)]
    debug: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let session = Session::new(args.data_dir.clone()).context("creating session directory")?;
    init_logging(&session, args.verbose)?;
    tracing::info!("Starting Gram v{}", env!("CARGO_PKG_VERSION"));

    let mut editor = Editor::new(session).context("starting editor")?;
    if let Some(geo) = args.geometry.as_deref() {
        match Geometry::parse(geo) {
            Some(window) => editor.set_window(window, args.screen_width),
            None => tracing::warn!("Ignoring geometry '{}'", geo),
        }
    }
    if args.debug {
        editor.set_debug(true);
    }

    let (path, read_only) = editor.session().startup_file(args.file.as_deref());
    editor
        .open_file(&path, read_only, None)
        .with_context(|| format!("opening {}", path.display()))?;
    println!("{}", editor.title());

    let result = run(&mut editor);
    editor.shutdown();
    result
}

/// Logs go to the session's `output.log`, which the editor can show.
fn init_logging(session: &Session, verbose: u8) -> anyhow::Result<()> {
    let log_level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let log_path = session.log_path();
    let file = std::fs::File::create(&log_path)
        .with_context(|| format!("creating {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();
    Ok(())
}

fn run(editor: &mut Editor) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("starting stdin reader")?;

    let mut events = EventHandler::new(editor.subscribe());
    let interval = Duration::from_millis(editor.settings().watch_interval_ms.max(1));

    while !editor.should_quit() {
        match rx.recv_timeout(interval) {
            Ok(line) => handle_line(editor, line.trim()),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        editor.pump();
        editor.tick();
        for event in events.drain() {
            report(&event)?;
        }
    }
    Ok(())
}

fn handle_line(editor: &mut Editor, line: &str) {
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    match word {
        "" => {}
        "quit" => editor.quit(),
        "show" => println!("{}", editor.active_text().unwrap_or_default()),
        "key" => match KeyPress::parse(rest) {
            Some(key) => {
                if !editor.handle_key(&key) {
                    println!("unbound: {}", key);
                }
            }
            None => println!("bad key: {}", rest),
        },
        "type" => {
            let text = rest.replace("\\n", "\n").replace("\\t", "\t");
            if let Err(e) = editor.insert_text(&text) {
                println!("{}", e);
            }
        }
        "complete" => {
            editor.palette_set_text(rest);
            if !wait_for_completions(editor) {
                println!("completion timed out");
            }
            for (idx, choice) in editor.completions().iter().enumerate() {
                println!("  {}: {}", idx, choice);
            }
        }
        "choose" => match rest.parse() {
            Ok(idx) => {
                editor.choose_completion(idx);
                println!("{}", editor.palette().text());
            }
            Err(_) => println!("bad index: {}", rest),
        },
        "delword" => {
            editor.palette_delete_word(Direction::Backward);
            println!("{}", editor.palette().text());
        }
        _ => {
            editor.palette_set_text(line);
            editor.submit(false);
        }
    }
}

/// Argument completion answers from a worker; wait for it.
fn wait_for_completions(editor: &mut Editor) -> bool {
    let deadline = Instant::now() + COMPLETION_TIMEOUT;
    while !editor.completions_ready() {
        if Instant::now() >= deadline {
            return false;
        }
        editor.pump();
        std::thread::sleep(Duration::from_millis(1));
    }
    true
}

fn report(event: &EditorEvent) -> anyhow::Result<()> {
    match event {
        EditorEvent::TitleChanged(title) => println!("{}", title),
        EditorEvent::Bell => println!("\x07"),
        EditorEvent::OpenUrl(url) => println!("open {}", url),
        EditorEvent::SpawnInstance { path, geo } => {
            let exe = std::env::current_exe().context("locating executable")?;
            std::process::Command::new(exe)
                .arg(path)
                .arg(geo)
                .spawn()
                .with_context(|| format!("spawning editor for {}", path.display()))?;
        }
        _ => {}
    }
    Ok(())
}
