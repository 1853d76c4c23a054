use crossterm::event::KeyEvent;
use time::Date;

use super::{NavRequest, Step, StoreCommand, StoreOutcome};
use crate::datemath;
use crate::keymap::KeyMap;

/// One fetched birthday plus its urgency at fetch time. The list is a
/// snapshot: days-until is computed when the rows arrive, not re-derived
/// on every draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub id: i64,
    pub name: String,
    pub month: u8,
    pub day: u8,
    pub year: i32,
    pub days_until: i64,
}

#[derive(Debug)]
pub struct BirthdayListScreen {
    pub owner: String,
    pub rows: Vec<ListRow>,
    pub selected: usize,
    pub error: Option<String>,
}

impl BirthdayListScreen {
    pub fn new(owner: String) -> Self {
        Self {
            owner,
            rows: Vec::new(),
            selected: 0,
            error: None,
        }
    }

    pub fn fetch_command(&self) -> StoreCommand {
        StoreCommand::FetchBirthdays {
            owner: self.owner.clone(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, keymap: &KeyMap) -> Step {
        if keymap.quit.matches(&key) {
            return Step::quit();
        }
        if keymap.up.matches(&key) {
            self.selected = self.selected.saturating_sub(1);
            return Step::none();
        }
        if keymap.down.matches(&key) {
            if !self.rows.is_empty() {
                self.selected = (self.selected + 1).min(self.rows.len() - 1);
            }
            return Step::none();
        }
        if keymap.create.matches(&key) {
            return Step::navigate(NavRequest::BirthdayEditor {
                owner: self.owner.clone(),
                editing_id: 0,
            });
        }
        if keymap.edit.matches(&key) {
            if let Some(row) = self.rows.get(self.selected) {
                return Step::navigate(NavRequest::BirthdayEditor {
                    owner: self.owner.clone(),
                    editing_id: row.id,
                });
            }
        }
        Step::none()
    }

    pub fn handle_store(&mut self, outcome: StoreOutcome, today: Date) -> Step {
        match outcome {
            StoreOutcome::BirthdaysFetched { owner, rows } if owner == self.owner => {
                let mut list: Vec<ListRow> = rows
                    .into_iter()
                    .map(|record| {
                        let days_until = datemath::days_until_next_occurrence(
                            record.month,
                            record.day,
                            today,
                        );
                        ListRow {
                            id: record.id,
                            name: record.name,
                            month: record.month,
                            day: record.day,
                            year: record.year,
                            days_until,
                        }
                    })
                    .collect();
                // Stable sort: ties keep the store's natural row order.
                list.sort_by_key(|row| row.days_until);
                self.rows = list;
                self.selected = self.selected.min(self.rows.len().saturating_sub(1));
                self.error = None;
                Step::none()
            }
            StoreOutcome::Failed { message } => {
                self.error = Some(message);
                Step::none()
            }
            _ => Step::none(),
        }
    }
}
