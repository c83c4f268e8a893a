// Entry point for the TPlates terminal game shell
// Startup order matters: settings first (the shutdown guard must exist
// before anything else can fail), then locale resources, then the view
// definition cache, and only then the UI with its initial navigation.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// Module declarations
mod tpl_color; // Cross-platform color styling for dialogs and menus
mod tpl_ctrl; // Controllers of the shipped views
mod tpl_lang; // Locale resource loading
mod tpl_nav; // Navigation controller and view lifecycle
mod tpl_settings; // Settings store and shutdown persistence
mod tpl_ui; // Terminal window, rendering, event loop
mod tpl_views; // View definition cache and parse types

use tpl_lang::LocaleResources;
use tpl_nav::App;
use tpl_settings::{SettingsGuard, SettingsStore};
use tpl_views::ViewCache;

/// Environment variable overriding the resources directory.
const RESOURCES_ENV: &str = "TPLATES_RESOURCES";

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let resources = resources_root();
    let settings_path = tpl_settings::settings_path()
        .ok_or("cannot resolve a settings file location")?;

    // Missing file means first run; anything else wrong with the settings
    // file is fatal rather than silently replaced
    let store = match SettingsStore::load(&settings_path) {
        Ok(store) => store,
        Err(err) if err.is_missing_file() => {
            info!(path = ?settings_path, "no settings file, starting with defaults");
            SettingsStore::first_run()
        }
        Err(err) => return Err(err.into()),
    };
    let settings = Arc::new(Mutex::new(store));

    // From here on, settings are flushed back to disk on every exit path
    // short of an ungraceful kill
    let _guard = SettingsGuard::new(settings.clone(), settings_path);

    let lang_dir = resources.join("lang");
    let locales = tpl_lang::available_locales(&lang_dir)?;
    let code = {
        let requested =
            tpl_lang::normalize_code(tpl_settings::lock(&settings).get("lang")?);
        if locales.iter().any(|c| *c == requested) {
            requested
        } else {
            warn!(lang = %requested, "configured language not shipped, using English");
            "en".to_string()
        }
    };
    let lang = LocaleResources::load(&lang_dir, &code)?;

    // Every view definition is cached up front; navigation never touches
    // the directory again
    let views = ViewCache::load_all(&resources.join("views"))?;

    let mut app = App {
        settings,
        lang,
        views,
        locales,
    };
    let registry = tpl_ctrl::default_registry();
    info!(lang = app.lang.code(), "startup complete");

    tpl_ui::run(&mut app, &registry)
}

/// Resources directory: `$TPLATES_RESOURCES` when set, `./resources`
/// otherwise.
fn resources_root() -> PathBuf {
    match env::var_os(RESOURCES_ENV) {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("resources"),
    }
}

/// Log to a file under the per-user data directory. stdout and stderr
/// belong to the alternate-screen UI, and logging must never block
/// startup, so every failure here is ignored.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let Some(proj) = directories::ProjectDirs::from("com", "tplates", "tplates") else {
        return;
    };
    let dir = proj.data_dir().to_path_buf();
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tplates.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
}
