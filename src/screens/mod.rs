mod birthday_editor;
mod birthday_list;
mod phone_entry;

pub use birthday_editor::{BirthdayEditorScreen, EditorField};
pub use birthday_list::{BirthdayListScreen, ListRow};
pub use phone_entry::{validate_us_phone_number, PhoneEntryScreen};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use time::Date;

use crate::db::BirthdayRecord;
use crate::keymap::KeyMap;

/// Persistence work a screen wants executed off the interaction thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    UpsertPhoneNumber {
        number: String,
    },
    FetchBirthdays {
        owner: String,
    },
    FetchBirthday {
        id: i64,
    },
    InsertBirthday {
        owner: String,
        name: String,
        month: u8,
        day: u8,
        year: i32,
    },
    UpdateBirthday {
        id: i64,
        name: String,
        month: u8,
        day: u8,
        year: i32,
    },
}

/// Exactly one outcome comes back per issued command. Outcomes carry enough
/// identity (number, owner, id) for a screen to discard results that belong
/// to a screen the user has already navigated away from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    PhoneNumberSaved { number: String },
    BirthdaysFetched { owner: String, rows: Vec<BirthdayRecord> },
    BirthdayFetched { id: i64, record: BirthdayRecord },
    BirthdaySaved,
    Failed { message: String },
}

/// Whole-screen replacement request. Construction parameters are the only
/// state that crosses a screen boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavRequest {
    PhoneEntry,
    BirthdayList { owner: String },
    BirthdayEditor { owner: String, editing_id: i64 },
}

/// What a handler wants the controller to do after it has updated its own
/// sub-state.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub command: Option<StoreCommand>,
    pub navigate: Option<NavRequest>,
    pub quit: bool,
}

impl Step {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn command(command: StoreCommand) -> Self {
        Self {
            command: Some(command),
            ..Self::default()
        }
    }

    pub fn navigate(request: NavRequest) -> Self {
        Self {
            navigate: Some(request),
            ..Self::default()
        }
    }

    pub fn quit() -> Self {
        Self {
            quit: true,
            ..Self::default()
        }
    }
}

/// The one active mode of an interactive session. Closed set: every screen
/// the session can show is a variant here, each with its own sub-state and
/// validation rules.
#[derive(Debug)]
pub enum Screen {
    PhoneEntry(PhoneEntryScreen),
    BirthdayList(BirthdayListScreen),
    BirthdayEditor(BirthdayEditorScreen),
}

impl Screen {
    pub fn phone_entry() -> Self {
        Screen::PhoneEntry(PhoneEntryScreen::new())
    }

    pub fn build(request: NavRequest) -> Self {
        match request {
            NavRequest::PhoneEntry => Self::phone_entry(),
            NavRequest::BirthdayList { owner } => {
                Screen::BirthdayList(BirthdayListScreen::new(owner))
            }
            NavRequest::BirthdayEditor { owner, editing_id } => {
                Screen::BirthdayEditor(BirthdayEditorScreen::new(owner, editing_id))
            }
        }
    }

    /// Entry hook, run once per navigation before any event is delivered.
    pub fn on_enter(&self) -> Option<StoreCommand> {
        match self {
            Screen::PhoneEntry(_) => None,
            Screen::BirthdayList(list) => Some(list.fetch_command()),
            Screen::BirthdayEditor(editor) => editor.on_enter(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, keymap: &KeyMap, today: Date) -> Step {
        match self {
            Screen::PhoneEntry(entry) => entry.handle_key(key, keymap),
            Screen::BirthdayList(list) => list.handle_key(key, keymap),
            Screen::BirthdayEditor(editor) => editor.handle_key(key, keymap, today),
        }
    }

    pub fn handle_store(&mut self, outcome: StoreOutcome, today: Date) -> Step {
        match self {
            Screen::PhoneEntry(entry) => entry.handle_store(outcome),
            Screen::BirthdayList(list) => list.handle_store(outcome, today),
            Screen::BirthdayEditor(editor) => editor.handle_store(outcome),
        }
    }
}

/// Plain typed character, for text fields. Control-chorded keys are never
/// text input; shifted ones are.
fn typed_char(key: &KeyEvent) -> Option<char> {
    if !(key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT) {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}
