//! Entry point for the **winven** daemon.
//!
//! Loads `config.json` and the catalog file, registers hotkeys, restores the
//! last session, spawns the command sources on background threads and then
//! runs the Win32 message loop on the main thread until a `Quit` command
//! arrives.

use log::{error, info, warn};
use std::sync::mpsc;
use winven::config::{self, Config};
use winven::store::{self, LoadOutcome};
use winven::traits::UiEvent;

/// Try to load `config.json`, falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config::config_path();
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// `RUST_LOG` wins; otherwise the persisted logging switch picks between
/// `info` and `warn`.
fn init_logging() {
    let verbose = store::CatalogFile::load(&config::catalog_path())
        .map(|file| file.settings.logging)
        .unwrap_or(false);
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Handle front-end notifications: launch the settings program if one is
/// configured.
fn spawn_ui(events: mpsc::Receiver<UiEvent>, settings_command: Option<String>) {
    std::thread::spawn(move || {
        for event in events {
            match event {
                UiEvent::OpenSettings => match &settings_command {
                    Some(program) => {
                        if let Err(e) = std::process::Command::new(program).spawn() {
                            warn!("could not start {}: {}", program, e);
                        }
                    }
                    None => info!("settings requested; no settings_command configured"),
                },
                UiEvent::GameMode(on) => info!("game mode {}", if on { "on" } else { "off" }),
            }
        }
    });
}

fn main() {
    init_logging();
    let config = load_config();

    let catalog_path = config::catalog_path();
    let (file, outcome) = store::load_or_default(&catalog_path);
    if outcome != LoadOutcome::Loaded {
        info!("catalog {:?} from {}", outcome, catalog_path.display());
    }

    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
    spawn_ui(ui_rx, config.settings_command.clone());

    run_daemon(config, file, ui_tx);
}

#[cfg(windows)]
fn run_daemon(config: Config, file: store::CatalogFile, ui_tx: mpsc::Sender<UiEvent>) {
    use winven::command::Command;
    use winven::control::ContinuousControl;
    use winven::dispatcher::{Dispatcher, DispatcherOptions};
    use winven::ipc::listener::CommandListener;
    use winven::placement::PlacementEngine;
    use winven::traits::CommandSource;
    use winven::win32::{self, InputHooks, SingleInstance, Win32Desktop, Win32Hotkeys};

    let _instance = match SingleInstance::claim() {
        Ok(Some(guard)) => guard,
        Ok(None) => {
            info!("winven is already running");
            return;
        }
        Err(e) => {
            error!("could not claim instance lock: {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = PlacementEngine::new(Win32Desktop::new(), file.catalog);
    engine.set_animation(config.animation.to_animation(file.settings.animations));

    let (queue_tx, queue_rx) = mpsc::channel::<Command>();
    let options = DispatcherOptions {
        catalog_path: config::catalog_path(),
        session_path: config::session_path(),
        settings: file.settings,
        hotkeys: config.hotkeys.clone(),
        aggressive: config.game_mode.aggressive,
    };
    let mut dispatcher = Dispatcher::new(engine, Win32Hotkeys::new(), queue_tx.clone(), options);
    dispatcher.set_ui(ui_tx);
    dispatcher.register_hotkeys();
    dispatcher.process(Command::RestoreSession);

    let sources = win32::relay(queue_tx, win32::Waker::current());

    if let Some(addr) = &config.command_port {
        match CommandListener::bind(addr.as_str()) {
            Ok(mut listener) => {
                let tx = sources.clone();
                std::thread::spawn(move || {
                    if let Err(e) = listener.run(tx) {
                        error!("command port error: {}", e);
                    }
                });
            }
            Err(e) => warn!("command port {} unavailable: {}", addr, e),
        }
    }

    let (event_tx, event_rx) = mpsc::channel();
    let _hooks = match InputHooks::install(event_tx) {
        Ok(hooks) => {
            let mut control = ContinuousControl::new(event_rx, config.control, dispatcher.game_mode());
            let tx = sources.clone();
            std::thread::spawn(move || {
                let _ = control.run(tx);
            });
            Some(hooks)
        }
        Err(e) => {
            warn!("continuous control disabled: {}", e);
            None
        }
    };
    drop(sources);

    info!("winven running");
    win32::run(&mut dispatcher, &queue_rx);
    info!("winven stopped");
}

#[cfg(not(windows))]
fn run_daemon(_config: Config, _file: store::CatalogFile, _ui_tx: mpsc::Sender<UiEvent>) {
    error!("winven drives the Windows desktop and has no backend for this platform");
    std::process::exit(1);
}
