// Locale resources
// Enumerates the locale files shipped with the game and loads exactly one
// of them at startup into an immutable message map. Changing language is
// applied on the next start; nothing here mutates after load.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Locale files follow a fixed name pattern embedding a two-letter
/// language code, e.g. `lang_en.toml`.
pub const LOCALE_FILE_PREFIX: &str = "lang_";
pub const LOCALE_FILE_SUFFIX: &str = ".toml";

#[derive(Debug, thiserror::Error)]
pub enum LangError {
    #[error("cannot enumerate locale directory {path}: {source}")]
    DirAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no locale file for language \"{0}\"")]
    UnknownLocale(String),

    #[error("cannot read locale file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("locale file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing localized message \"{0}\"")]
    MissingMessage(String),
}

/// Extract the language code from a locale file name, if it matches
/// the `lang_??.toml` pattern.
fn locale_code_of(file_name: &str) -> Option<&str> {
    let code = file_name
        .strip_prefix(LOCALE_FILE_PREFIX)?
        .strip_suffix(LOCALE_FILE_SUFFIX)?;
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        Some(code)
    } else {
        None
    }
}

/// Scan the locale directory for the languages the game ships with.
/// Returns sorted two-letter codes.
pub fn available_locales(dir: &Path) -> Result<Vec<String>, LangError> {
    let entries = fs::read_dir(dir).map_err(|source| LangError::DirAccess {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut codes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LangError::DirAccess {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(code) = name.to_str().and_then(locale_code_of) {
            codes.push(code.to_string());
        }
    }
    codes.sort();
    Ok(codes)
}

/// Normalize a raw language tag (`"zh-CN"`, `"en_US.UTF-8"`, ...) down to
/// a two-letter code, defaulting to English for anything unrecognizable.
pub fn normalize_code(raw: &str) -> String {
    let primary = raw
        .split(['-', '_', '.'])
        .next()
        .unwrap_or("")
        .to_lowercase();
    if primary.len() == 2 && primary.chars().all(|c| c.is_ascii_lowercase()) {
        primary
    } else {
        "en".to_string()
    }
}

/// The resolved message set for the single language selected at startup.
#[derive(Debug)]
pub struct LocaleResources {
    code: String,
    messages: HashMap<String, String>,
}

impl LocaleResources {
    /// Load `lang_<code>.toml` from the locale directory. The file is a
    /// flat table of quoted message keys to localized strings.
    pub fn load(dir: &Path, code: &str) -> Result<LocaleResources, LangError> {
        let path = dir.join(format!("{}{}{}", LOCALE_FILE_PREFIX, code, LOCALE_FILE_SUFFIX));
        let raw = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LangError::UnknownLocale(code.to_string())
            } else {
                LangError::Read { path: path.clone(), source }
            }
        })?;

        let messages: HashMap<String, String> =
            toml::from_str(&raw).map_err(|source| LangError::Parse { path, source })?;
        info!(lang = code, count = messages.len(), "locale resources loaded");
        Ok(LocaleResources {
            code: code.to_string(),
            messages,
        })
    }

    /// Messages for tests that do not read from disk.
    #[cfg(test)]
    pub fn from_messages(code: &str, pairs: &[(&str, &str)]) -> LocaleResources {
        LocaleResources {
            code: code.to_string(),
            messages: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Look up a localized message. A missing key is a defined failure,
    /// not a silent fallback to the key text.
    pub fn str(&self, key: &str) -> Result<&str, LangError> {
        self.messages
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| LangError::MissingMessage(key.to_string()))
    }
}

/// Substitute each `{}` in a localized format string with the next
/// argument, in order. Extra placeholders are left in place.
pub fn fill(fmt: &str, args: &[&str]) -> String {
    let mut out = fmt.to_string();
    for arg in args {
        out = out.replacen("{}", arg, 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn locale_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("lang_en.toml"),
            "\"exit\" = \"Exit\"\n\"menu.title\" = \"Plates\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("lang_zh.toml"),
            "\"exit\" = \"退出\"\n\"menu.title\" = \"滑块\"\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn available_locales_matches_the_name_pattern() {
        let dir = locale_dir();
        // None of these match lang_??.toml
        fs::write(dir.path().join("lang_english.toml"), "").unwrap();
        fs::write(dir.path().join("lang_EN.toml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("lang_fr.json"), "").unwrap();

        let codes = available_locales(dir.path()).unwrap();
        assert_eq!(codes, vec!["en".to_string(), "zh".to_string()]);
    }

    #[test]
    fn available_locales_fails_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = available_locales(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, LangError::DirAccess { .. }));
    }

    #[test]
    fn load_selects_one_language() {
        let dir = locale_dir();
        let lang = LocaleResources::load(dir.path(), "zh").unwrap();
        assert_eq!(lang.code(), "zh");
        assert_eq!(lang.str("exit").unwrap(), "退出");
    }

    #[test]
    fn resources_are_debug_formattable() {
        let dir = locale_dir();
        let lang = LocaleResources::load(dir.path(), "en").unwrap();
        assert!(format!("{:?}", lang).contains("en"));
    }

    #[test]
    fn load_unknown_locale_fails() {
        let dir = locale_dir();
        let err = LocaleResources::load(dir.path(), "fr").unwrap_err();
        assert!(matches!(err, LangError::UnknownLocale(code) if code == "fr"));
    }

    #[test]
    fn missing_message_fails() {
        let dir = locale_dir();
        let lang = LocaleResources::load(dir.path(), "en").unwrap();
        let err = lang.str("menu.play").unwrap_err();
        assert!(matches!(err, LangError::MissingMessage(key) if key == "menu.play"));
    }

    #[test]
    fn normalize_code_handles_common_tags() {
        assert_eq!(normalize_code("en-US"), "en");
        assert_eq!(normalize_code("zh_CN"), "zh");
        assert_eq!(normalize_code("de_DE.UTF-8"), "de");
        assert_eq!(normalize_code("EN"), "en");
        assert_eq!(normalize_code("english"), "en");
        assert_eq!(normalize_code(""), "en");
    }

    #[test]
    fn fill_substitutes_in_order() {
        assert_eq!(fill("{} x {}", &["80", "24"]), "80 x 24");
        assert_eq!(fill("v{}", &["1.0.2"]), "v1.0.2");
        assert_eq!(fill("no holes", &["x"]), "no holes");
    }
}
