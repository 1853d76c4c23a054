use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;

use crate::error::AppError;

/// One action, possibly reachable through several keys (`↑` and `k` both
/// move up). A Shift modifier is tolerated, since some layouts report it
/// for plain symbols; Control/Alt chords never match.
#[derive(Debug, Clone)]
pub struct Binding {
    keys: Vec<KeyCode>,
}

impl Binding {
    fn new(keys: Vec<KeyCode>) -> Self {
        Self { keys }
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        if !(key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT) {
            return false;
        }
        self.keys.contains(&key.code)
    }

    pub fn label(&self) -> String {
        self.keys
            .iter()
            .map(key_label)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Key bindings for every screen action, resolved once at startup and
/// handed to the controller at construction.
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub quit: Binding,
    pub up: Binding,
    pub down: Binding,
    pub create: Binding,
    pub edit: Binding,
    pub submit: Binding,
    pub back: Binding,
    pub confirm_accept: Binding,
    pub confirm_decline: Binding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: Binding::new(vec![KeyCode::Char('q')]),
            up: Binding::new(vec![KeyCode::Up, KeyCode::Char('k')]),
            down: Binding::new(vec![KeyCode::Down, KeyCode::Char('j')]),
            create: Binding::new(vec![KeyCode::Char('c')]),
            edit: Binding::new(vec![KeyCode::Char('e'), KeyCode::Enter]),
            submit: Binding::new(vec![KeyCode::Enter]),
            back: Binding::new(vec![KeyCode::Esc]),
            confirm_accept: Binding::new(vec![KeyCode::Char('y')]),
            confirm_decline: Binding::new(vec![KeyCode::Char('n')]),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyMapFile {
    quit: Option<Vec<String>>,
    up: Option<Vec<String>>,
    down: Option<Vec<String>>,
    create: Option<Vec<String>>,
    edit: Option<Vec<String>>,
    submit: Option<Vec<String>>,
    back: Option<Vec<String>>,
    confirm_accept: Option<Vec<String>>,
    confirm_decline: Option<Vec<String>>,
}

/// Defaults, optionally overridden action-by-action from a TOML file, e.g.
/// `up = ["up", "k"]`. A bad file is a startup configuration error, not
/// something to limp past.
pub fn load(path: Option<&Path>) -> Result<KeyMap, AppError> {
    let mut keymap = KeyMap::default();
    let Some(path) = path else {
        return Ok(keymap);
    };

    let raw = std::fs::read_to_string(path)?;
    let file: KeyMapFile = toml::from_str(&raw).map_err(|err| {
        AppError::Config(format!("invalid key-binding file {}: {err}", path.display()))
    })?;

    apply(&mut keymap.quit, "quit", file.quit)?;
    apply(&mut keymap.up, "up", file.up)?;
    apply(&mut keymap.down, "down", file.down)?;
    apply(&mut keymap.create, "create", file.create)?;
    apply(&mut keymap.edit, "edit", file.edit)?;
    apply(&mut keymap.submit, "submit", file.submit)?;
    apply(&mut keymap.back, "back", file.back)?;
    apply(&mut keymap.confirm_accept, "confirm_accept", file.confirm_accept)?;
    apply(&mut keymap.confirm_decline, "confirm_decline", file.confirm_decline)?;
    Ok(keymap)
}

fn apply(binding: &mut Binding, action: &str, names: Option<Vec<String>>) -> Result<(), AppError> {
    let Some(names) = names else {
        return Ok(());
    };
    if names.is_empty() {
        return Err(AppError::Config(format!(
            "action '{action}' needs at least one key"
        )));
    }
    let keys = names
        .iter()
        .map(|name| parse_key(name))
        .collect::<Result<Vec<_>, _>>()?;
    *binding = Binding::new(keys);
    Ok(())
}

fn parse_key(name: &str) -> Result<KeyCode, AppError> {
    let code = match name {
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "enter" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => {
                    return Err(AppError::Config(format!("unknown key name '{other}'")));
                }
            }
        }
    };
    Ok(code)
}

fn key_label(key: &KeyCode) -> String {
    match key {
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        other => format!("{other:?}").to_lowercase(),
    }
}
