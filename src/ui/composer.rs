//! Single-line composer with send suppression

/// Input line plus the "send outstanding" flag.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    input: String,
    sending: bool,
}

impl Composer {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn insert(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Take the trimmed input for sending. Yields `None` for blank input or
    /// while a previous send is outstanding; otherwise clears the input and
    /// marks a send outstanding until `finish`.
    pub fn submit(&mut self) -> Option<String> {
        if self.sending {
            return None;
        }
        let text = self.input.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.input.clear();
        self.sending = true;
        Some(text)
    }

    pub fn finish(&mut self) {
        self.sending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> Composer {
        let mut composer = Composer::default();
        text.chars().for_each(|c| composer.insert(c));
        composer
    }

    #[test]
    fn test_blank_input_is_not_sent() {
        assert_eq!(typed("").submit(), None);
        assert_eq!(typed("  \t ").submit(), None);
    }

    #[test]
    fn test_submit_trims_and_clears() {
        let mut composer = typed("  שלום  ");
        assert_eq!(composer.submit().as_deref(), Some("שלום"));
        assert_eq!(composer.input(), "");
        assert!(composer.is_sending());
    }

    #[test]
    fn test_submissions_suppressed_while_sending() {
        let mut composer = typed("first");
        assert!(composer.submit().is_some());

        "second".chars().for_each(|c| composer.insert(c));
        assert_eq!(composer.submit(), None);
        assert_eq!(composer.input(), "second");

        composer.finish();
        assert_eq!(composer.submit().as_deref(), Some("second"));
    }

    #[test]
    fn test_backspace() {
        let mut composer = typed("ab");
        composer.backspace();
        assert_eq!(composer.input(), "a");
        composer.backspace();
        composer.backspace();
        assert_eq!(composer.input(), "");
    }
}
