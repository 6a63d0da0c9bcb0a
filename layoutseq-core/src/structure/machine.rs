//! Shift/reduce state machine turning flat labels into open/close actions.

use super::tags::Vocabulary;
use crate::classifier::{LabeledToken, LineMarker};
use crate::grouping::strip_span_prefix;
use log::debug;

/// One structural effect of feeding a token to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open(String),
    Close(String),
    Token(String),
    /// Line-end hyphen joining the halves of a split word
    Conjunction,
}

pub struct ReconstructionMachine<'v> {
    vocabulary: &'v Vocabulary,
    stack: Vec<String>,
    division_has_content: bool,
}

impl<'v> ReconstructionMachine<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            stack: Vec::new(),
            division_has_content: false,
        }
    }

    /// Labels currently open, outermost first.
    pub fn open_labels(&self) -> &[String] {
        &self.stack
    }

    /// Open the root container.
    pub fn start(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.ensure_root(&mut actions);
        actions
    }

    pub fn step(&mut self, token: &LabeledToken) -> Vec<Action> {
        let mut actions = Vec::new();
        let vocabulary = self.vocabulary;
        let (label, label_start) = strip_span_prefix(&token.label);

        if vocabulary.is_dropped(label) {
            return actions;
        }

        let emitted = if token.text == "-" && token.line_marker == Some(LineMarker::End) {
            Action::Conjunction
        } else {
            Action::Token(token.text.clone())
        };

        self.ensure_root(&mut actions);

        let spec = match vocabulary.get(label) {
            Some(spec) => spec,
            None => {
                debug!("Unknown label {:?} for token {:?}", label, token.text);
                self.emit(emitted, &mut actions);
                return actions;
            }
        };

        if spec.starts_division && label_start && self.division_has_content {
            self.close_all(&mut actions);
            self.ensure_root(&mut actions);
        }

        let top = self.stack.last().map(String::as_str).unwrap_or_default();
        if top == label {
            if label_start {
                actions.push(Action::Close(label.to_string()));
                actions.push(Action::Open(label.to_string()));
            }
        } else if spec.priority < vocabulary.priority(top) {
            self.push(label, &mut actions);
        } else {
            while let Some(top) = self.stack.last() {
                if vocabulary.priority(top) >= spec.priority {
                    break;
                }
                let closed = self.stack.pop().unwrap_or_default();
                actions.push(Action::Close(closed));
            }
            if self.stack.last().map(String::as_str) != Some(label) {
                self.push(label, &mut actions);
            }
        }

        self.emit(emitted, &mut actions);
        actions
    }

    /// Close every open element, innermost first.
    pub fn finish(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.close_all(&mut actions);
        actions
    }

    fn ensure_root(&mut self, actions: &mut Vec<Action>) {
        if self.stack.is_empty() {
            let root = self.vocabulary.root_label().to_string();
            self.stack.push(root.clone());
            self.division_has_content = false;
            actions.push(Action::Open(root));
        }
    }

    fn push(&mut self, label: &str, actions: &mut Vec<Action>) {
        self.stack.push(label.to_string());
        actions.push(Action::Open(label.to_string()));
    }

    fn close_all(&mut self, actions: &mut Vec<Action>) {
        while let Some(label) = self.stack.pop() {
            actions.push(Action::Close(label));
        }
    }

    fn emit(&mut self, action: Action, actions: &mut Vec<Action>) {
        self.division_has_content = true;
        actions.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(label: &str) -> Action {
        Action::Open(label.to_string())
    }

    fn close(label: &str) -> Action {
        Action::Close(label.to_string())
    }

    fn token(text: &str) -> Action {
        Action::Token(text.to_string())
    }

    fn started(vocabulary: &Vocabulary) -> ReconstructionMachine<'_> {
        let mut machine = ReconstructionMachine::new(vocabulary);
        assert_eq!(machine.start(), vec![open("<division>")]);
        machine
    }

    #[test]
    fn test_dropped_label_has_no_effect() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("text", "I-<paragraph>"));
        let actions = machine.step(&LabeledToken::new("Fig", "I-<figure_marker>"));
        assert!(actions.is_empty());
        assert_eq!(machine.open_labels(), &["<division>", "<paragraph>"]);
    }

    #[test]
    fn test_line_end_hyphen_becomes_conjunction() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("co", "I-<paragraph>"));
        let actions = machine.step(&LabeledToken::new("-", "<paragraph>").at_line_end());
        assert_eq!(actions, vec![Action::Conjunction]);
        let actions = machine.step(&LabeledToken::new("-", "<paragraph>"));
        assert_eq!(actions, vec![token("-")]);
    }

    #[test]
    fn test_same_label_span_start_reopens() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("text", "I-<paragraph>"));
        assert_eq!(
            machine.step(&LabeledToken::new("more", "<paragraph>")),
            vec![token("more")]
        );
        assert_eq!(
            machine.step(&LabeledToken::new("Body", "I-<paragraph>")),
            vec![close("<paragraph>"), open("<paragraph>"), token("Body")]
        );
    }

    #[test]
    fn test_lower_priority_nests() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("see", "I-<paragraph>"));
        assert_eq!(
            machine.step(&LabeledToken::new("[1]", "I-<citation_marker>")),
            vec![open("<citation_marker>"), token("[1]")]
        );
        assert_eq!(
            machine.open_labels(),
            &["<division>", "<paragraph>", "<citation_marker>"]
        );
    }

    #[test]
    fn test_higher_priority_closes_outward() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("Intro", "I-<section>"));
        assert_eq!(
            machine.step(&LabeledToken::new("text", "I-<paragraph>")),
            vec![close("<section>"), open("<paragraph>"), token("text")]
        );
        machine.step(&LabeledToken::new("[1]", "I-<citation_marker>"));
        // back to the enclosing paragraph without reopening it
        assert_eq!(
            machine.step(&LabeledToken::new("after", "<paragraph>")),
            vec![close("<citation_marker>"), token("after")]
        );
    }

    #[test]
    fn test_section_start_opens_new_division() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        let first = machine.step(&LabeledToken::new("Intro", "I-<section>"));
        assert_eq!(first, vec![open("<section>"), token("Intro")]);
        machine.step(&LabeledToken::new("text", "I-<paragraph>"));
        assert_eq!(
            machine.step(&LabeledToken::new("Methods", "I-<section>")),
            vec![
                close("<paragraph>"),
                close("<division>"),
                open("<division>"),
                open("<section>"),
                token("Methods")
            ]
        );
    }

    #[test]
    fn test_unknown_label_keeps_token_in_place() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("text", "I-<paragraph>"));
        assert_eq!(
            machine.step(&LabeledToken::new("x", "I-<mystery>")),
            vec![token("x")]
        );
        assert_eq!(machine.open_labels(), &["<division>", "<paragraph>"]);
    }

    #[test]
    fn test_finish_closes_innermost_first() {
        let vocabulary = Vocabulary::default();
        let mut machine = started(&vocabulary);
        machine.step(&LabeledToken::new("text", "I-<paragraph>"));
        assert_eq!(
            machine.finish(),
            vec![close("<paragraph>"), close("<division>")]
        );
        assert!(machine.open_labels().is_empty());
    }
}
