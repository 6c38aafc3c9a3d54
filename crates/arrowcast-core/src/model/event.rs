// ── Event log entries ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::player::Player;
use super::timestamp::Timestamp;

/// Something that happened in a tournament or match, with a message
/// template and sparse substitution values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: Timestamp,
    pub kind: String,
    pub message: String,
    pub items: BTreeMap<String, Value>,
    /// Built from `items.person` when present.
    #[serde(skip)]
    pub player: Option<Player>,
}

impl Event {
    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// Render `message`, replacing each `{key}` with the matching item.
    ///
    /// Missing keys render as nothing; `{{` and `}}` are literal braces.
    pub fn print(&self) -> String {
        let mut out = String::with_capacity(self.message.len());
        let mut chars = self.message.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if closed {
                        if let Some(value) = self.items.get(key.trim()) {
                            push_value(&mut out, value);
                        }
                    } else {
                        out.push('{');
                        out.push_str(&key);
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(message: &str, items: Value) -> Event {
        Event {
            message: message.into(),
            items: serde_json::from_value(items).unwrap_or_default(),
            ..Event::default()
        }
    }

    #[test]
    fn substitutes_items() {
        let e = event(
            "{player} killed {victim} with {arrows} arrows",
            json!({"player": "thiderman", "victim": "ghost", "arrows": 3}),
        );
        assert_eq!(e.print(), "thiderman killed ghost with 3 arrows");
    }

    #[test]
    fn missing_keys_render_empty() {
        let e = event("{nick} joined{suffix}", json!({"nick": "a"}));
        assert_eq!(e.print(), "a joined");
    }

    #[test]
    fn escaped_and_unclosed_braces() {
        let e = event("{{literal}} and {open", json!({}));
        assert_eq!(e.print(), "{literal} and {open");
    }
}
