use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use time::OffsetDateTime;

use crate::bus::{CommandBus, SessionEvent};
use crate::keymap::KeyMap;
use crate::screens::{NavRequest, Screen, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns the single active screen of a session. All input and all store
/// outcomes pass through `dispatch`, one at a time; screens never see the
/// bus, the terminal, or each other.
pub struct NavigationController {
    screen: Screen,
    keymap: KeyMap,
    bus: CommandBus,
}

impl NavigationController {
    /// Every session starts at phone entry.
    pub fn new(bus: CommandBus, keymap: KeyMap) -> Self {
        let mut controller = Self {
            screen: Screen::phone_entry(),
            keymap,
            bus,
        };
        if let Some(command) = controller.screen.on_enter() {
            controller.bus.submit(command);
        }
        controller
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Flow {
        let today = OffsetDateTime::now_utc().date();
        let step = match event {
            SessionEvent::Key(key) => {
                if key.kind == KeyEventKind::Release {
                    return Flow::Continue;
                }
                if is_interrupt(&key) {
                    return Flow::Quit;
                }
                self.screen.handle_key(key, &self.keymap, today)
            }
            SessionEvent::Store(outcome) => self.screen.handle_store(outcome, today),
            SessionEvent::Resize => Step::none(),
            SessionEvent::Closed => return Flow::Quit,
        };
        self.apply(step)
    }

    fn apply(&mut self, step: Step) -> Flow {
        if let Some(command) = step.command {
            self.bus.submit(command);
        }
        if let Some(request) = step.navigate {
            self.navigate(request);
        }
        if step.quit {
            Flow::Quit
        } else {
            Flow::Continue
        }
    }

    /// Whole-screen replacement: swap the active screen, then run its entry
    /// hook so any fetch is in flight before the next event lands.
    fn navigate(&mut self, request: NavRequest) {
        self.screen = Screen::build(request);
        if let Some(command) = self.screen.on_enter() {
            self.bus.submit(command);
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests;
