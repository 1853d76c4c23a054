use crossterm::event::{KeyCode, KeyEvent};
use time::Date;

use super::{typed_char, NavRequest, Step, StoreCommand, StoreOutcome};
use crate::keymap::KeyMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Name,
    Month,
    Day,
    Year,
    Confirm,
}

/// Create/edit form for a single birthday. `editing_id == 0` means the
/// eventual save is an insert; nonzero means an update of that exact row.
/// Fields advance in fixed order and each one validates before the cursor
/// moves past it.
#[derive(Debug)]
pub struct BirthdayEditorScreen {
    pub owner: String,
    pub editing_id: i64,
    pub draft_name: String,
    pub draft_month: u8,
    pub draft_day: String,
    pub draft_year: String,
    pub confirmed: bool,
    pub field: EditorField,
    pub loading: bool,
    pub error: Option<String>,
}

impl BirthdayEditorScreen {
    pub fn new(owner: String, editing_id: i64) -> Self {
        Self {
            owner,
            editing_id,
            draft_name: String::new(),
            draft_month: 1,
            draft_day: String::new(),
            draft_year: String::new(),
            confirmed: false,
            field: EditorField::Name,
            // Edit mode starts empty and fills from the fetch result.
            loading: editing_id != 0,
            error: None,
        }
    }

    pub fn on_enter(&self) -> Option<StoreCommand> {
        (self.editing_id != 0).then(|| StoreCommand::FetchBirthday {
            id: self.editing_id,
        })
    }

    pub fn handle_key(&mut self, key: KeyEvent, keymap: &KeyMap, today: Date) -> Step {
        if keymap.back.matches(&key) {
            return self.discard();
        }
        if self.loading {
            return Step::none();
        }
        match self.field {
            EditorField::Name => self.name_key(key, keymap),
            EditorField::Month => self.month_key(key, keymap),
            EditorField::Day => self.day_key(key, keymap),
            EditorField::Year => self.year_key(key, keymap, today.year()),
            EditorField::Confirm => self.confirm_key(key, keymap, today.year()),
        }
    }

    pub fn handle_store(&mut self, outcome: StoreOutcome) -> Step {
        match outcome {
            StoreOutcome::BirthdayFetched { id, record }
                if self.loading && id == self.editing_id =>
            {
                self.draft_name = record.name;
                self.draft_month = record.month;
                self.draft_day = record.day.to_string();
                self.draft_year = record.year.to_string();
                self.loading = false;
                self.error = None;
                Step::none()
            }
            StoreOutcome::BirthdaySaved => Step::navigate(NavRequest::BirthdayList {
                owner: self.owner.clone(),
            }),
            StoreOutcome::Failed { message } => {
                // Recoverable: drafts stay put, the user can retry or back out.
                self.loading = false;
                self.error = Some(message);
                Step::none()
            }
            _ => Step::none(),
        }
    }

    fn name_key(&mut self, key: KeyEvent, keymap: &KeyMap) -> Step {
        if keymap.submit.matches(&key) {
            if self.draft_name.trim().is_empty() {
                self.error = Some("name is required".to_string());
            } else {
                self.error = None;
                self.field = EditorField::Month;
            }
            return Step::none();
        }
        if let Some(c) = typed_char(&key) {
            self.error = None;
            self.draft_name.push(c);
        } else if key.code == KeyCode::Backspace {
            self.draft_name.pop();
        }
        Step::none()
    }

    fn month_key(&mut self, key: KeyEvent, keymap: &KeyMap) -> Step {
        if keymap.submit.matches(&key) {
            self.field = EditorField::Day;
        } else if keymap.up.matches(&key) && self.draft_month > 1 {
            self.draft_month -= 1;
        } else if keymap.down.matches(&key) && self.draft_month < 12 {
            self.draft_month += 1;
        }
        Step::none()
    }

    fn day_key(&mut self, key: KeyEvent, keymap: &KeyMap) -> Step {
        if keymap.submit.matches(&key) {
            match validate_day(&self.draft_day) {
                Ok(_) => {
                    self.error = None;
                    self.field = EditorField::Year;
                }
                Err(message) => self.error = Some(message),
            }
            return Step::none();
        }
        if let Some(c) = typed_char(&key) {
            if self.draft_day.len() < 2 {
                self.error = None;
                self.draft_day.push(c);
            }
        } else if key.code == KeyCode::Backspace {
            self.draft_day.pop();
        }
        Step::none()
    }

    fn year_key(&mut self, key: KeyEvent, keymap: &KeyMap, current_year: i32) -> Step {
        if keymap.submit.matches(&key) {
            match validate_year(&self.draft_year, current_year) {
                Ok(_) => {
                    self.error = None;
                    self.field = EditorField::Confirm;
                }
                Err(message) => self.error = Some(message),
            }
            return Step::none();
        }
        if let Some(c) = typed_char(&key) {
            if self.draft_year.len() < 4 {
                self.error = None;
                self.draft_year.push(c);
            }
        } else if key.code == KeyCode::Backspace {
            self.draft_year.pop();
        }
        Step::none()
    }

    fn confirm_key(&mut self, key: KeyEvent, keymap: &KeyMap, current_year: i32) -> Step {
        if keymap.confirm_accept.matches(&key) {
            self.confirmed = true;
            return self.save(current_year);
        }
        if keymap.confirm_decline.matches(&key) {
            self.confirmed = false;
            return self.discard();
        }
        if keymap.submit.matches(&key) {
            return if self.confirmed {
                self.save(current_year)
            } else {
                self.discard()
            };
        }
        if keymap.up.matches(&key)
            || keymap.down.matches(&key)
            || matches!(key.code, KeyCode::Left | KeyCode::Right)
        {
            self.confirmed = !self.confirmed;
        }
        Step::none()
    }

    /// Drafts are discarded by navigating away; nothing is persisted.
    fn discard(&self) -> Step {
        Step::navigate(NavRequest::BirthdayList {
            owner: self.owner.clone(),
        })
    }

    fn save(&mut self, current_year: i32) -> Step {
        // The fields were validated on advance. If a draft is somehow bad
        // anyway, send the cursor back to it instead of trusting a parse.
        let day = match validate_day(&self.draft_day) {
            Ok(day) => day,
            Err(message) => {
                self.field = EditorField::Day;
                self.error = Some(message);
                return Step::none();
            }
        };
        let year = match validate_year(&self.draft_year, current_year) {
            Ok(year) => year,
            Err(message) => {
                self.field = EditorField::Year;
                self.error = Some(message);
                return Step::none();
            }
        };

        let command = if self.editing_id == 0 {
            StoreCommand::InsertBirthday {
                owner: self.owner.clone(),
                name: self.draft_name.clone(),
                month: self.draft_month,
                day,
                year,
            }
        } else {
            StoreCommand::UpdateBirthday {
                id: self.editing_id,
                name: self.draft_name.clone(),
                month: self.draft_month,
                day,
                year,
            }
        };
        Step::command(command)
    }
}

fn validate_day(day: &str) -> Result<u8, String> {
    day.parse::<u8>()
        .ok()
        .filter(|day| (1..=31).contains(day))
        .ok_or_else(|| "day must be number between 1 and 31".to_string())
}

fn validate_year(year: &str, current_year: i32) -> Result<i32, String> {
    year.parse::<i32>()
        .ok()
        .filter(|year| (1..=current_year).contains(year))
        .ok_or_else(|| format!("year must be number between 1 and {current_year}"))
}
