//! Labelled input forms used by the edit, clone and snapshot dialogs

use super::TextInputState;
use crossterm::event::KeyCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(TextInputState),
    Toggle(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: FieldValue,
}

impl FormField {
    pub fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: FieldValue::Text(TextInputState::with_value(value)),
        }
    }

    pub fn toggle(label: &'static str, on: bool) -> Self {
        Self {
            label,
            value: FieldValue::Toggle(on),
        }
    }
}

/// What a key did to the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    /// Keep editing
    Continue,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<FormField>,
    focus: usize,
}

impl Form {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Text of the field labelled `label`, empty if there is none
    pub fn text(&self, label: &str) -> String {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .and_then(|f| match &f.value {
                FieldValue::Text(input) => Some(input.value().to_string()),
                FieldValue::Toggle(_) => None,
            })
            .unwrap_or_default()
    }

    pub fn toggle(&self, label: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.label == label && f.value == FieldValue::Toggle(true))
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormEvent {
        match code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => return FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            _ => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    match &mut field.value {
                        FieldValue::Text(input) => {
                            input.handle_key(code);
                        }
                        FieldValue::Toggle(on) => {
                            if code == KeyCode::Char(' ') {
                                *on = !*on;
                            }
                        }
                    }
                }
            }
        }
        FormEvent::Continue
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len() - 1);
        }
    }
}
