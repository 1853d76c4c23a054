use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Decodes the raw byte stream a remote terminal sends into key events.
/// Only the keys the screens react to are recognized; unknown escape
/// sequences are swallowed so they never leak into text fields.
#[derive(Debug, Default)]
pub struct InputParser {
    state: State,
    last_was_cr: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    Escape,
    Csi,
    Utf8 {
        pending: Vec<u8>,
        need: usize,
    },
}

impl InputParser {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        let mut keys = Vec::new();
        for &byte in bytes {
            self.step(byte, &mut keys);
        }
        // A read ending on a bare ESC is the Esc key; terminals send whole
        // escape sequences in one write.
        if self.state == State::Escape {
            self.state = State::Idle;
            keys.push(plain(KeyCode::Esc));
        }
        keys
    }

    fn step(&mut self, byte: u8, keys: &mut Vec<KeyEvent>) {
        match &mut self.state {
            State::Idle => self.idle_byte(byte, keys),
            State::Escape => match byte {
                b'[' | b'O' => self.state = State::Csi,
                0x1b => keys.push(plain(KeyCode::Esc)),
                other => {
                    self.state = State::Idle;
                    keys.push(plain(KeyCode::Esc));
                    self.idle_byte(other, keys);
                }
            },
            State::Csi => {
                // Parameter bytes continue the sequence; a final byte ends it.
                if (0x40..=0x7e).contains(&byte) {
                    match byte {
                        b'A' => keys.push(plain(KeyCode::Up)),
                        b'B' => keys.push(plain(KeyCode::Down)),
                        b'C' => keys.push(plain(KeyCode::Right)),
                        b'D' => keys.push(plain(KeyCode::Left)),
                        _ => {}
                    }
                    self.state = State::Idle;
                }
            }
            State::Utf8 { pending, need } => {
                pending.push(byte);
                if pending.len() >= *need {
                    if let Ok(text) = std::str::from_utf8(pending) {
                        if let Some(c) = text.chars().next() {
                            keys.push(char_key(c));
                        }
                    }
                    self.state = State::Idle;
                }
            }
        }
    }

    fn idle_byte(&mut self, byte: u8, keys: &mut Vec<KeyEvent>) {
        let was_cr = self.last_was_cr;
        self.last_was_cr = false;
        match byte {
            0x1b => self.state = State::Escape,
            b'\r' => {
                keys.push(plain(KeyCode::Enter));
                self.last_was_cr = true;
            }
            b'\n' => {
                // Swallow the LF of a CRLF pair.
                if !was_cr {
                    keys.push(plain(KeyCode::Enter));
                }
            }
            0x7f | 0x08 => keys.push(plain(KeyCode::Backspace)),
            b'\t' => keys.push(plain(KeyCode::Tab)),
            0x03 => keys.push(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            0x20..=0x7e => keys.push(char_key(byte as char)),
            lead if lead >= 0xc2 => {
                if let Some(need) = utf8_len(lead) {
                    self.state = State::Utf8 {
                        pending: vec![lead],
                        need,
                    };
                }
            }
            _ => {}
        }
    }
}

fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn plain(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn char_key(c: char) -> KeyEvent {
    let modifiers = if c.is_uppercase() {
        KeyModifiers::SHIFT
    } else {
        KeyModifiers::NONE
    };
    KeyEvent::new(KeyCode::Char(c), modifiers)
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};

    use super::InputParser;

    fn codes(parser: &mut InputParser, bytes: &[u8]) -> Vec<KeyCode> {
        parser.feed(bytes).into_iter().map(|key| key.code).collect()
    }

    #[test]
    fn decodes_printable_characters() {
        let mut parser = InputParser::default();
        assert_eq!(
            codes(&mut parser, b"+1q"),
            vec![
                KeyCode::Char('+'),
                KeyCode::Char('1'),
                KeyCode::Char('q')
            ]
        );
    }

    #[test]
    fn decodes_arrow_sequences() {
        let mut parser = InputParser::default();
        assert_eq!(
            codes(&mut parser, b"\x1b[A\x1b[B\x1bOC"),
            vec![KeyCode::Up, KeyCode::Down, KeyCode::Right]
        );
    }

    #[test]
    fn a_bare_escape_is_the_esc_key() {
        let mut parser = InputParser::default();
        assert_eq!(codes(&mut parser, b"\x1b"), vec![KeyCode::Esc]);
    }

    #[test]
    fn escape_followed_by_a_plain_byte_emits_both() {
        let mut parser = InputParser::default();
        assert_eq!(
            codes(&mut parser, b"\x1bx"),
            vec![KeyCode::Esc, KeyCode::Char('x')]
        );
    }

    #[test]
    fn crlf_is_a_single_enter() {
        let mut parser = InputParser::default();
        assert_eq!(codes(&mut parser, b"\r\n"), vec![KeyCode::Enter]);
        assert_eq!(codes(&mut parser, b"\n"), vec![KeyCode::Enter]);
    }

    #[test]
    fn both_backspace_bytes_map_to_backspace() {
        let mut parser = InputParser::default();
        assert_eq!(
            codes(&mut parser, b"\x7f\x08"),
            vec![KeyCode::Backspace, KeyCode::Backspace]
        );
    }

    #[test]
    fn ctrl_c_carries_the_control_modifier() {
        let mut parser = InputParser::default();
        let keys = parser.feed(&[0x03]);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, KeyCode::Char('c'));
        assert!(keys[0].modifiers.contains(KeyModifiers::CONTROL));
    }

    #[test]
    fn multibyte_characters_survive_split_reads() {
        let mut parser = InputParser::default();
        assert!(parser.feed(&[0xc3]).is_empty());
        assert_eq!(codes(&mut parser, &[0xa9]), vec![KeyCode::Char('é')]);
    }

    #[test]
    fn unknown_csi_sequences_are_swallowed() {
        let mut parser = InputParser::default();
        // Delete key: ESC [ 3 ~
        assert!(codes(&mut parser, b"\x1b[3~").is_empty());
        // The parser is back in sync afterwards.
        assert_eq!(codes(&mut parser, b"a"), vec![KeyCode::Char('a')]);
    }
}
