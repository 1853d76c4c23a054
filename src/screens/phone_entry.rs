use crossterm::event::{KeyCode, KeyEvent};

use super::{typed_char, NavRequest, Step, StoreCommand, StoreOutcome};
use crate::keymap::KeyMap;

/// First screen of every session: collects the phone number reminders go
/// to. Registration is idempotent, so returning users type the same number
/// and land on their existing birthday list.
#[derive(Debug)]
pub struct PhoneEntryScreen {
    pub draft_number: String,
    pub error: Option<String>,
}

impl PhoneEntryScreen {
    pub fn new() -> Self {
        Self {
            draft_number: "+1".to_string(),
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, keymap: &KeyMap) -> Step {
        if keymap.submit.matches(&key) {
            return match validate_us_phone_number(&self.draft_number) {
                Ok(()) => {
                    self.error = None;
                    Step::command(StoreCommand::UpsertPhoneNumber {
                        number: self.draft_number.clone(),
                    })
                }
                Err(message) => {
                    self.error = Some(message);
                    Step::none()
                }
            };
        }

        if let Some(c) = typed_char(&key) {
            self.error = None;
            self.draft_number.push(c);
        } else if key.code == KeyCode::Backspace {
            self.error = None;
            self.draft_number.pop();
        }
        Step::none()
    }

    pub fn handle_store(&mut self, outcome: StoreOutcome) -> Step {
        match outcome {
            StoreOutcome::PhoneNumberSaved { number } if number == self.draft_number => {
                Step::navigate(NavRequest::BirthdayList { owner: number })
            }
            StoreOutcome::Failed { message } => {
                self.error = Some(message);
                Step::none()
            }
            // Anything else is the tail of a command issued before the user
            // navigated here; it has no claim on this screen.
            _ => Step::none(),
        }
    }
}

/// Canonical form: `+1` followed by exactly ten digits.
pub fn validate_us_phone_number(number: &str) -> Result<(), String> {
    let bytes = number.as_bytes();
    if bytes.len() != 12 {
        return Err("must be exactly 12 digits".to_string());
    }
    if bytes[0] != b'+' || bytes[1] != b'1' {
        return Err("not a valid US phone number".to_string());
    }
    if !bytes[2..].iter().all(u8::is_ascii_digit) {
        return Err("numbers only".to_string());
    }
    Ok(())
}
