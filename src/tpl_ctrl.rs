// Shipped view controllers
// One controller type per .view file the game ships. Each is instantiated
// fresh by the navigator for every visit to its screen.

use crossterm::event::KeyCode;

use crate::tpl_lang::fill;
use crate::tpl_nav::{App, Controller, ControllerRegistry, CtrlError, Outcome};
use crate::tpl_settings;
use crate::tpl_views::ViewNode;

/// Registry of every controller name a shipped view definition declares.
pub fn default_registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry.register("main-menu", || Box::new(MainMenuController::new()));
    registry.register("options", || Box::new(OptionsController::new()));
    registry.register("about", || Box::new(AboutController::new()));
    registry.register("game", || Box::new(GameController::new()));
    registry
}

/// Window title for a sub-screen: base title plus the localized section.
fn screen_title(app: &App, section_key: &str) -> Result<String, CtrlError> {
    let base = app.lang.str("header.base")?;
    let section = app.lang.str(section_key)?;
    Ok(format!("{} - {}", base, section))
}

/// Move a menu cursor by one step, wrapping at both ends.
fn move_selection(menu: &mut ViewNode, down: bool) {
    let len = menu.children.len();
    if len == 0 {
        return;
    }
    menu.selected = if down {
        (menu.selected + 1) % len
    } else {
        (menu.selected + len - 1) % len
    };
}

/// Id of the currently selected item of a menu, if it has one.
fn selected_item_id(menu: &ViewNode) -> Option<&str> {
    menu.children.get(menu.selected)?.id.as_deref()
}

fn require<'a>(root: &'a ViewNode, id: &str) -> Result<&'a ViewNode, CtrlError> {
    root.find(id).ok_or_else(|| CtrlError::MissingElement(id.to_string()))
}

// ---------------------------------------------------------------------------
// Main menu

/// Controller of `main.view`: the entry menu of the game.
pub struct MainMenuController {
    item_count: usize,
    game_title: String,
    options_title: String,
    about_title: String,
}

impl MainMenuController {
    pub fn new() -> MainMenuController {
        MainMenuController {
            item_count: 0,
            game_title: String::new(),
            options_title: String::new(),
            about_title: String::new(),
        }
    }
}

impl Controller for MainMenuController {
    fn attach(&mut self, _root: &ViewNode) {}

    fn register_elements(&mut self, root: &ViewNode) -> Result<(), CtrlError> {
        let menu = require(root, "menu")?;
        if menu.children.is_empty() {
            return Err(CtrlError::MissingElement("menu items".to_string()));
        }
        self.item_count = menu.children.len();
        Ok(())
    }

    fn init(&mut self, _root: &mut ViewNode, app: &mut App) -> Result<(), CtrlError> {
        // Target titles are resolved once here so key handling stays
        // infallible afterwards
        self.game_title = screen_title(app, "menu.play")?;
        self.options_title = screen_title(app, "menu.options")?;
        self.about_title = screen_title(app, "menu.about")?;
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, root: &mut ViewNode, _app: &mut App) -> Outcome {
        let Some(menu) = root.find_mut("menu") else {
            return Outcome::Ignored;
        };
        match code {
            KeyCode::Up => {
                move_selection(menu, false);
                Outcome::Redraw
            }
            KeyCode::Down => {
                move_selection(menu, true);
                Outcome::Redraw
            }
            KeyCode::Enter => match selected_item_id(menu) {
                Some("item-game") => Outcome::Navigate {
                    view: "game.view".to_string(),
                    title: self.game_title.clone(),
                },
                Some("item-options") => Outcome::Navigate {
                    view: "options.view".to_string(),
                    title: self.options_title.clone(),
                },
                Some("item-about") => Outcome::Navigate {
                    view: "about.view".to_string(),
                    title: self.about_title.clone(),
                },
                Some("item-exit") => Outcome::RequestExit,
                _ => Outcome::Ignored,
            },
            KeyCode::Esc => Outcome::RequestExit,
            _ => Outcome::Ignored,
        }
    }
}

// ---------------------------------------------------------------------------
// Options

/// Controller of `options.view`: shows and edits settings. The language
/// choice only rewrites the `lang` setting; the loaded locale stays as it
/// is until the next start.
pub struct OptionsController {
    language_fmt: String,
    base_title: String,
}

impl OptionsController {
    pub fn new() -> OptionsController {
        OptionsController {
            language_fmt: String::new(),
            base_title: String::new(),
        }
    }

    fn language_line(&self, code: &str) -> String {
        fill(&self.language_fmt, &[code])
    }
}

impl Controller for OptionsController {
    fn attach(&mut self, _root: &ViewNode) {}

    fn register_elements(&mut self, root: &ViewNode) -> Result<(), CtrlError> {
        require(root, "menu")?;
        require(root, "item-lang")?;
        require(root, "item-back")?;
        require(root, "locales")?;
        Ok(())
    }

    fn init(&mut self, root: &mut ViewNode, app: &mut App) -> Result<(), CtrlError> {
        self.language_fmt = app.lang.str("options.language-fmt")?.to_string();
        self.base_title = app.lang.str("header.base")?.to_string();

        let code = tpl_settings::lock(&app.settings).get("lang")?.to_string();
        let available = fill(
            app.lang.str("options.available-fmt")?,
            &[&app.locales.join(", ")],
        );

        if let Some(item) = root.find_mut("item-lang") {
            item.text = Some(self.language_line(&code));
        }
        if let Some(label) = root.find_mut("locales") {
            label.text = Some(available);
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, root: &mut ViewNode, app: &mut App) -> Outcome {
        let back = Outcome::Navigate {
            view: "main.view".to_string(),
            title: self.base_title.clone(),
        };
        let Some(menu) = root.find_mut("menu") else {
            return Outcome::Ignored;
        };
        match code {
            KeyCode::Up => {
                move_selection(menu, false);
                Outcome::Redraw
            }
            KeyCode::Down => {
                move_selection(menu, true);
                Outcome::Redraw
            }
            KeyCode::Enter => {
                let selected = selected_item_id(menu).map(str::to_string);
                match selected.as_deref() {
                    Some("item-lang") => {
                        let next = {
                            let mut settings = tpl_settings::lock(&app.settings);
                            let current = settings.get("lang").unwrap_or("en").to_string();
                            let next = next_locale(&app.locales, &current);
                            settings.set("lang", &next);
                            next
                        };
                        if let Some(item) = root.find_mut("item-lang") {
                            item.text = Some(self.language_line(&next));
                        }
                        Outcome::Redraw
                    }
                    Some("item-back") => back,
                    _ => Outcome::Ignored,
                }
            }
            KeyCode::Esc => back,
            _ => Outcome::Ignored,
        }
    }
}

/// Next code in the available-locale cycle. An unknown current code
/// restarts the cycle at the first available locale.
fn next_locale(locales: &[String], current: &str) -> String {
    if locales.is_empty() {
        return current.to_string();
    }
    match locales.iter().position(|c| c == current) {
        Some(i) => locales[(i + 1) % locales.len()].clone(),
        None => locales[0].clone(),
    }
}

// ---------------------------------------------------------------------------
// About

/// Controller of `about.view`: static screen with the crate version.
pub struct AboutController {
    base_title: String,
}

impl AboutController {
    pub fn new() -> AboutController {
        AboutController {
            base_title: String::new(),
        }
    }
}

impl Controller for AboutController {
    fn attach(&mut self, _root: &ViewNode) {}

    fn register_elements(&mut self, root: &ViewNode) -> Result<(), CtrlError> {
        require(root, "version")?;
        Ok(())
    }

    fn init(&mut self, root: &mut ViewNode, app: &mut App) -> Result<(), CtrlError> {
        self.base_title = app.lang.str("header.base")?.to_string();
        let version = fill(
            app.lang.str("about.version-fmt")?,
            &[env!("CARGO_PKG_VERSION")],
        );
        if let Some(label) = root.find_mut("version") {
            label.text = Some(version);
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, _root: &mut ViewNode, _app: &mut App) -> Outcome {
        match code {
            KeyCode::Esc | KeyCode::Enter => Outcome::Navigate {
                view: "main.view".to_string(),
                title: self.base_title.clone(),
            },
            _ => Outcome::Ignored,
        }
    }
}

// ---------------------------------------------------------------------------
// Game

/// Controller of `game.view`. The shell only stands up the board screen;
/// the puzzle rules themselves live outside this layer.
pub struct GameController {
    base_title: String,
}

impl GameController {
    pub fn new() -> GameController {
        GameController {
            base_title: String::new(),
        }
    }
}

/// Starting arrangement shown on the board placeholder.
const BOARD_LAYOUT: &str = "\
┌────┬────┬────┬────┐\n\
│  1 │  2 │  3 │  4 │\n\
├────┼────┼────┼────┤\n\
│  5 │  6 │  7 │  8 │\n\
├────┼────┼────┼────┤\n\
│  9 │ 10 │ 11 │ 12 │\n\
├────┼────┼────┼────┤\n\
│ 13 │ 14 │ 15 │    │\n\
└────┴────┴────┴────┘";

impl Controller for GameController {
    fn attach(&mut self, _root: &ViewNode) {}

    fn register_elements(&mut self, root: &ViewNode) -> Result<(), CtrlError> {
        require(root, "board")?;
        Ok(())
    }

    fn init(&mut self, root: &mut ViewNode, app: &mut App) -> Result<(), CtrlError> {
        self.base_title = app.lang.str("header.base")?.to_string();
        if let Some(board) = root.find_mut("board") {
            board.text = Some(BOARD_LAYOUT.to_string());
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, _root: &mut ViewNode, _app: &mut App) -> Outcome {
        match code {
            KeyCode::Esc => Outcome::Navigate {
                view: "main.view".to_string(),
                title: self.base_title.clone(),
            },
            _ => Outcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tpl_lang::LocaleResources;
    use crate::tpl_nav::{Navigator, Window};
    use crate::tpl_settings::SettingsStore;
    use crate::tpl_views::ViewCache;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StubWindow {
        titles: Vec<String>,
    }

    impl Window for StubWindow {
        fn install(&mut self, _root: &ViewNode, title: &str) {
            self.titles.push(title.to_string());
        }
    }

    /// App built from the resources shipped in the repository.
    fn shipped_app(lang: &str) -> App {
        let resources = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources");
        let mut store = SettingsStore::default();
        store.set("lang", lang);
        App {
            settings: Arc::new(Mutex::new(store)),
            lang: LocaleResources::load(&resources.join("lang"), lang).unwrap(),
            views: ViewCache::load_all(&resources.join("views")).unwrap(),
            locales: vec!["en".to_string(), "zh".to_string()],
        }
    }

    fn shipped_nav(app: &mut App) -> Navigator<StubWindow> {
        let mut nav = Navigator::new(StubWindow::default());
        nav.change_view(app, &default_registry(), "main.view", "TPlates")
            .unwrap();
        nav
    }

    #[test]
    fn every_shipped_view_navigates_with_the_default_registry() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());

        for name in ["main.view", "game.view", "options.view", "about.view"] {
            nav.change_view(&mut app, &registry, name, "t").unwrap();
            assert_eq!(nav.active().unwrap().name, name);
        }
        assert_eq!(nav.window().titles.len(), 4);
    }

    #[test]
    fn every_shipped_view_navigates_in_chinese_too() {
        let mut app = shipped_app("zh");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());

        for name in ["main.view", "game.view", "options.view", "about.view"] {
            nav.change_view(&mut app, &registry, name, "t").unwrap();
        }
    }

    #[test]
    fn main_menu_moves_selection_and_navigates_to_options() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = shipped_nav(&mut app);

        assert_eq!(nav.dispatch_key(&mut app, KeyCode::Down), Outcome::Redraw);
        let outcome = nav.dispatch_key(&mut app, KeyCode::Enter);
        let Outcome::Navigate { view, title } = outcome else {
            panic!("expected navigation, got {:?}", outcome);
        };
        assert_eq!(view, "options.view");
        assert_eq!(title, "TPlates - Options");

        nav.change_view(&mut app, &registry, &view, &title).unwrap();
        assert_eq!(nav.active().unwrap().name, "options.view");
    }

    #[test]
    fn main_menu_selection_wraps_around() {
        let mut app = shipped_app("en");
        let mut nav = shipped_nav(&mut app);

        // Up from the first item lands on the last one: Exit
        nav.dispatch_key(&mut app, KeyCode::Up);
        assert_eq!(nav.dispatch_key(&mut app, KeyCode::Enter), Outcome::RequestExit);
    }

    #[test]
    fn main_menu_esc_requests_exit() {
        let mut app = shipped_app("en");
        let mut nav = shipped_nav(&mut app);
        assert_eq!(nav.dispatch_key(&mut app, KeyCode::Esc), Outcome::RequestExit);
    }

    #[test]
    fn options_shows_current_language_and_cycles_it() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());
        nav.change_view(&mut app, &registry, "options.view", "t")
            .unwrap();

        let lang_line = |nav: &Navigator<StubWindow>| {
            nav.active()
                .unwrap()
                .root
                .find("item-lang")
                .unwrap()
                .text
                .clone()
                .unwrap()
        };
        assert_eq!(lang_line(&nav), "Language: en");

        // Enter on the language item cycles en -> zh in the settings only
        nav.dispatch_key(&mut app, KeyCode::Enter);
        assert_eq!(lang_line(&nav), "Language: zh");
        assert_eq!(
            tpl_settings::lock(&app.settings).get("lang").unwrap(),
            "zh"
        );
        // The loaded locale is untouched until restart
        assert_eq!(app.lang.code(), "en");

        nav.dispatch_key(&mut app, KeyCode::Enter);
        assert_eq!(
            tpl_settings::lock(&app.settings).get("lang").unwrap(),
            "en"
        );
    }

    #[test]
    fn options_back_returns_to_main_menu() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());
        nav.change_view(&mut app, &registry, "options.view", "t")
            .unwrap();

        nav.dispatch_key(&mut app, KeyCode::Down);
        let outcome = nav.dispatch_key(&mut app, KeyCode::Enter);
        assert_eq!(
            outcome,
            Outcome::Navigate {
                view: "main.view".to_string(),
                title: "TPlates".to_string(),
            }
        );
    }

    #[test]
    fn about_fills_the_version_label() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());
        nav.change_view(&mut app, &registry, "about.view", "t")
            .unwrap();

        let version = nav
            .active()
            .unwrap()
            .root
            .find("version")
            .unwrap()
            .text
            .clone()
            .unwrap();
        assert_eq!(version, format!("v{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn game_board_is_filled_and_esc_leaves() {
        let mut app = shipped_app("en");
        let registry = default_registry();
        let mut nav = Navigator::new(StubWindow::default());
        nav.change_view(&mut app, &registry, "game.view", "t")
            .unwrap();

        let board = nav.active().unwrap().root.find("board").unwrap();
        assert!(board.text.as_deref().unwrap().contains("15"));

        let outcome = nav.dispatch_key(&mut app, KeyCode::Esc);
        assert!(matches!(outcome, Outcome::Navigate { view, .. } if view == "main.view"));
    }

    #[test]
    fn next_locale_cycles_and_recovers() {
        let locales = vec!["en".to_string(), "zh".to_string()];
        assert_eq!(next_locale(&locales, "en"), "zh");
        assert_eq!(next_locale(&locales, "zh"), "en");
        assert_eq!(next_locale(&locales, "fr"), "en");
        assert_eq!(next_locale(&[], "fr"), "fr");
    }
}
