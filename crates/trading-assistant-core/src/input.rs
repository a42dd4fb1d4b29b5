/// Single-line text input with a character-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.text.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let char_count = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_in_middle() {
        let mut input = InputBuffer::new();
        input.set("AAPL?");
        input.move_left();
        for c in " price".chars() {
            input.insert(c);
        }
        assert_eq!(input.as_str(), "AAPL price?");
        assert_eq!(input.cursor(), 10);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = InputBuffer::new();
        input.set("€uro→");
        input.backspace();
        assert_eq!(input.as_str(), "€uro");
        input.move_home();
        input.delete();
        assert_eq!(input.as_str(), "uro");
        input.insert('é');
        assert_eq!(input.as_str(), "éuro");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut input = InputBuffer::new();
        input.move_left();
        input.backspace();
        input.delete();
        assert_eq!(input.cursor(), 0);

        input.set("ab");
        input.move_right();
        assert_eq!(input.cursor(), 2);
        input.move_home();
        input.move_end();
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn test_blank_detection_and_clear() {
        let mut input = InputBuffer::new();
        assert!(input.is_blank());
        input.set(" \t ");
        assert!(input.is_blank());
        input.set(" x ");
        assert!(!input.is_blank());
        input.clear();
        assert_eq!(input.as_str(), "");
        assert_eq!(input.cursor(), 0);
    }
}
