// Navigation controller
// Swaps the displayed view: looks up cached definition text, re-parses it
// into a fresh element tree, runs the new controller's lifecycle in order,
// and installs the result in the window. A failed navigation leaves the
// previously shown view untouched.

use crossterm::event::KeyCode;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::tpl_lang::{LangError, LocaleResources};
use crate::tpl_settings::SharedSettings;
use crate::tpl_views::{parse_view, ViewCache, ViewCacheError, ViewNode};

/// Application context threaded through navigation and controllers in
/// place of any global state.
pub struct App {
    pub settings: SharedSettings,
    pub lang: LocaleResources,
    pub views: ViewCache,
    /// Two-letter codes of the locales found at startup.
    pub locales: Vec<String>,
}

/// Failures local to the controller lifecycle steps.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("required element \"{0}\" not found")]
    MissingElement(String),

    #[error(transparent)]
    Lang(#[from] LangError),

    #[error(transparent)]
    Settings(#[from] crate::tpl_settings::SettingsError),
}

/// A navigation attempt that failed. The attempt is unrecoverable; the
/// caller keeps the previous view and decides what to report.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error(transparent)]
    UnknownView(#[from] ViewCacheError),

    #[error("view definition \"{name}\" failed to parse: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("view definition \"{name}\" references an unknown message: {source}")]
    Resolve {
        name: String,
        #[source]
        source: LangError,
    },

    #[error("view definition \"{name}\" declares unknown controller \"{controller}\"")]
    UnknownController { name: String, controller: String },

    #[error("controller \"{controller}\" could not bind elements of \"{name}\": {source}")]
    Bind {
        name: String,
        controller: String,
        #[source]
        source: CtrlError,
    },

    #[error("controller \"{controller}\" failed to initialize \"{name}\": {source}")]
    Init {
        name: String,
        controller: String,
        #[source]
        source: CtrlError,
    },
}

/// What a controller wants the event loop to do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Key not handled by this view.
    Ignored,
    /// View state changed; redraw on the next frame.
    Redraw,
    /// Switch to another cached view.
    Navigate { view: String, title: String },
    /// Ask the user to confirm leaving the game.
    RequestExit,
}

/// Behavior of a single view. A fresh instance is created on every
/// navigation; lifecycle methods run exactly once per instance, in the
/// order they are declared here.
pub trait Controller {
    /// Associate the controller with its freshly parsed root element.
    fn attach(&mut self, root: &ViewNode);

    /// Discover and bind the named child elements this controller needs.
    fn register_elements(&mut self, root: &ViewNode) -> Result<(), CtrlError>;

    /// One-time initialization: fill dynamic texts, read settings.
    fn init(&mut self, root: &mut ViewNode, app: &mut App) -> Result<(), CtrlError>;

    /// Key dispatch while this controller owns the active view.
    fn handle_key(&mut self, code: KeyCode, root: &mut ViewNode, app: &mut App) -> Outcome;
}

type Factory = Box<dyn Fn() -> Box<dyn Controller>>;

/// Maps the controller names declared in view definitions to factories
/// producing fresh instances.
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, Factory>,
}

impl ControllerRegistry {
    pub fn new() -> ControllerRegistry {
        ControllerRegistry::default()
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Controller> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    fn build(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// The single currently displayed view: its parsed tree plus the
/// controller driving it. Replaced wholesale on every navigation.
pub struct ActiveView {
    pub name: String,
    pub root: ViewNode,
    pub controller: Box<dyn Controller>,
}

/// Seam to the display. The terminal window implements this; tests use a
/// recording stub.
pub trait Window {
    /// Show `root` under `title`, applying the window's size constraints.
    fn install(&mut self, root: &ViewNode, title: &str);
}

/// Owns the window and the active view. There is no queued or concurrent
/// navigation: each `change_view` call fully completes or fails before
/// the window reflects anything.
pub struct Navigator<W: Window> {
    window: W,
    active: Option<ActiveView>,
}

impl<W: Window> Navigator<W> {
    pub fn new(window: W) -> Navigator<W> {
        Navigator {
            window,
            active: None,
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn active(&self) -> Option<&ActiveView> {
        self.active.as_ref()
    }

    /// Replace the displayed view with a freshly parsed instance of the
    /// named definition. On failure the previous view stays installed and
    /// its controller keeps receiving key dispatches.
    pub fn change_view(
        &mut self,
        app: &mut App,
        registry: &ControllerRegistry,
        name: &str,
        title: &str,
    ) -> Result<(), NavError> {
        let doc = {
            let raw = app.views.get(name)?;
            parse_view(raw).map_err(|source| NavError::Parse {
                name: name.to_string(),
                source,
            })?
        };
        let controller_name = doc.controller;
        let mut root = doc.root;

        resolve_messages(&mut root, &app.lang).map_err(|source| NavError::Resolve {
            name: name.to_string(),
            source,
        })?;

        let mut controller =
            registry
                .build(&controller_name)
                .ok_or_else(|| NavError::UnknownController {
                    name: name.to_string(),
                    controller: controller_name.clone(),
                })?;

        controller.attach(&root);
        controller
            .register_elements(&root)
            .map_err(|source| NavError::Bind {
                name: name.to_string(),
                controller: controller_name.clone(),
                source,
            })?;
        controller
            .init(&mut root, app)
            .map_err(|source| NavError::Init {
                name: name.to_string(),
                controller: controller_name.clone(),
                source,
            })?;

        self.window.install(&root, title);
        info!(view = name, controller = %controller_name, "view changed");

        // Dropping the previous ActiveView here ends its controller's
        // life; it receives no further calls of any kind.
        self.active = Some(ActiveView {
            name: name.to_string(),
            root,
            controller,
        });
        Ok(())
    }

    /// Forward a key press to the active controller, if any.
    pub fn dispatch_key(&mut self, app: &mut App, code: KeyCode) -> Outcome {
        match self.active.as_mut() {
            Some(active) => active.controller.handle_key(code, &mut active.root, app),
            None => {
                warn!("key dispatched before any navigation");
                Outcome::Ignored
            }
        }
    }
}

/// Resolve `%key` locale references in a freshly parsed tree. Runs as
/// part of every navigation, before the controller sees the tree.
fn resolve_messages(node: &mut ViewNode, lang: &LocaleResources) -> Result<(), LangError> {
    if let Some(text) = &node.text {
        if let Some(key) = text.strip_prefix('%') {
            node.text = Some(lang.str(key)?.to_string());
        }
    }
    for child in &mut node.children {
        resolve_messages(child, lang)?;
    }
    Ok(())
}
