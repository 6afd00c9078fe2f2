//! Pen Interpreter - digital pen dot-stream interpreter
//!
//! Replays recorded pen sessions against an annotation catalogue and
//! manages the interpreter configuration.

use pen_interpreter::app::cli::{Cli, Commands, ConfigAction};
use pen_interpreter::app::config::Config;
use pen_interpreter::capture::ring_buffer::DotRingBuffer;
use pen_interpreter::gesture::ScriptedClassifier;
use pen_interpreter::hit_test::HitTester;
use pen_interpreter::interpreter::{DotRecording, ListenerEvent, PenInterpreter, RecordingListener};
use pen_interpreter::recognition::{HttpRecognizer, RecognitionService, ReplayRecognizer};
use pen_interpreter::registry::CatalogFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Replay {
            input,
            catalog,
            json,
            live,
        } => {
            run_replay(&input, catalog, json, live, &config)?;
        }
        Commands::Catalog { path } => {
            run_catalog(path, &config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn catalog_path(explicit: Option<PathBuf>, config: &Config) -> PathBuf {
    explicit
        .or_else(|| config.catalog.path.clone())
        .unwrap_or_else(Cli::default_catalog)
}

fn run_replay(
    input: &Path,
    catalog: Option<PathBuf>,
    json: bool,
    live: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let catalog_file = catalog_path(catalog, config);
    let (registry, documents) = CatalogFile::load(&catalog_file)?.into_registries();
    let recording = DotRecording::load(input)?;
    info!(
        "Replaying '{}': {} dots, {} strokes against {:?}",
        recording.metadata.name,
        recording.len(),
        recording.stroke_count(),
        catalog_file
    );

    // Keeps the worker threads alive for live recognition
    let runtime = if live {
        Some(tokio::runtime::Runtime::new()?)
    } else {
        None
    };
    let recognizer: Arc<dyn RecognitionService> = match &runtime {
        Some(rt) => Arc::new(HttpRecognizer::new(config.recognition.clone(), rt.handle().clone())?),
        None => Arc::new(ReplayRecognizer::new(recording.recognitions.clone())),
    };

    let listener = RecordingListener::new();
    let mut interpreter = PenInterpreter::with_config(
        config.interpreter_config(),
        registry,
        documents,
        Box::new(ScriptedClassifier::new(recording.gesture_labels.clone())),
        recognizer,
        Box::new(listener.clone()),
    );

    let buffer = DotRingBuffer::with_capacity(config.capture.ring_buffer_size);
    let stats = buffer.stats();
    let (mut producer, mut consumer) = buffer.split();

    let mut actions = 0usize;
    for dot in &recording.dots {
        if !producer.push(*dot) {
            anyhow::bail!(pen_interpreter::Error::RingBuffer(format!(
                "dot {} dropped, buffer full",
                producer.sequence()
            )));
        }
        actions += interpreter.drain(&mut consumer, config.capture.batch_size).len();
        interpreter.tick();
        print_events(&listener.take(), json)?;
    }

    if live && interpreter.pending_requests() > 0 {
        let recognition = &config.recognition;
        let budget = Duration::from_millis(
            recognition.request_timeout_ms * u64::from(recognition.max_retries)
                + recognition.handwriting_poll_interval_ms
                    * u64::from(recognition.handwriting_poll_attempts),
        );
        info!("Waiting up to {:?} for {} recognition requests", budget, interpreter.pending_requests());
        let deadline = Instant::now() + budget;
        while interpreter.pending_requests() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            interpreter.tick();
            print_events(&listener.take(), json)?;
        }
    }

    if interpreter.pending_requests() > 0 {
        warn!("{} recognition requests never completed", interpreter.pending_requests());
    }

    info!(
        "Replay finished: {} dots consumed, {} actions, {} requests pending",
        stats.dots_consumed.load(std::sync::atomic::Ordering::Relaxed),
        actions,
        interpreter.pending_requests()
    );

    Ok(())
}

fn print_events(events: &[ListenerEvent], json: bool) -> anyhow::Result<()> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
            continue;
        }
        match event {
            ListenerEvent::Click { kind, payload, position } => {
                println!("click    {} '{}' at ({:.1}, {:.1})", kind, payload, position.0, position.1)
            }
            ListenerEvent::Crop { document_id, page, bbox } => println!(
                "crop     {} p{} ({:.1}, {:.1}) - ({:.1}, {:.1})",
                document_id, page, bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            ),
            ListenerEvent::RecognitionReady { kind, text } => {
                println!("ready    {} '{}'", kind, text)
            }
            ListenerEvent::Search { scope, text } => {
                println!("search   {} '{}'", scope.as_str(), text)
            }
            ListenerEvent::Control { code } => println!("control  {}", code),
        }
    }
    Ok(())
}

fn run_catalog(path: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let path = catalog_path(path, config);
    let (registry, documents) = CatalogFile::load(&path)?.into_registries();
    let tester = HitTester::with_config(config.hit_test, config.page.geometry());

    println!("Catalogue {:?}: {} documents, {} pages\n", path, documents.len(), registry.len());
    for (pattern, page) in registry.iter_sorted() {
        println!(
            "{}  {} p{} [{:?}]",
            pattern,
            page.document_id,
            page.local_page_number,
            documents.kind_of(&page.document_id)
        );
        for mark in page.marks() {
            let resolved = match tester.hit_mark(page, mark, &documents, mark.x as f64, mark.y as f64) {
                Ok(action) => action.payload,
                Err(reason) => format!("<{}>", reason),
            };
            println!("    {:<10} {:>3} at {:<10} {}", mark.kind, mark.id, mark.key().to_string(), resolved);
        }
    }
    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let table: toml::Table = toml::from_str(&config.to_toml()?)?;
            match find_toml_value(&table, &key) {
                Some(v) => println!("{} = {}", key, v),
                None => anyhow::bail!("Configuration key '{}' not set", key),
            }
        }
        ConfigAction::Set { key, value } => {
            let config_path = Config::default_path();
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'pen-interp init' first.");
            }

            let mut table: toml::Table = toml::from_str(&std::fs::read_to_string(&config_path)?)?;
            if !set_toml_value(&mut table, &key, &value) {
                anyhow::bail!("Failed to set '{}'. Key must be <section>.<field>.", key);
            }

            // Reject values that would not load
            let updated: Config = toml::Value::Table(table).try_into()?;
            updated.validate()?;
            updated.save(&config_path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}

/// TOML value lookup by dotted key
fn find_toml_value<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    let (section, leaf) = key.split_once('.')?;
    table.get(section)?.as_table()?.get(leaf)
}

/// TOML value setter by dotted key. Values that do not parse as TOML are
/// stored as strings.
fn set_toml_value(table: &mut toml::Table, key: &str, value: &str) -> bool {
    let Some((section, leaf)) = key.split_once('.') else {
        return false;
    };
    let parsed = toml::from_str::<toml::Table>(&format!("v = {}", value))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()));

    let entry = table
        .entry(section.to_string())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    match entry.as_table_mut() {
        Some(section_table) => {
            section_table.insert(leaf.to_string(), parsed);
            true
        }
        None => false,
    }
}
