/*

Input mode state machine
========================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::collections::VecDeque;

use tracing::trace;

use crate::glkapi::constants::key_name_to_code;
use crate::Presenter;

/** What kind of input the VM is currently waiting for */
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InputMode {
    /** Nothing is accepted; events only scroll */
    #[default]
    None,
    /** The VM is running; keypresses are kept for later */
    Buffer,
    /** A character event is outstanding */
    GetKey,
    /** A line event is outstanding; the prompt handles the typing */
    GetLine,
    /** The story has ended */
    EndGame,
}

impl InputMode {
    pub fn name(self) -> &'static str {
        match self {
            InputMode::None => "none",
            InputMode::Buffer => "buffer",
            InputMode::GetKey => "getkey",
            InputMode::GetLine => "getline",
            InputMode::EndGame => "endgame",
        }
    }
}

/** A raw keyboard or mouse event from the page */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyEvent {
    /** Glk keycode, or the character's code point */
    pub key: u32,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    /** A synthetic event which should be delivered even if the page isn't scrolled down */
    pub force: bool,
}

impl KeyEvent {
    pub fn key(key: u32) -> Self {
        KeyEvent {
            key,
            ..Default::default()
        }
    }

    /** A key event from its DOM key name */
    pub fn named(name: &str) -> Self {
        KeyEvent::key(key_name_to_code(name))
    }

    /** A click anywhere counts as pressing space */
    pub fn click() -> Self {
        KeyEvent::key(' ' as u32)
    }

    fn has_modifier(&self) -> bool {
        self.alt || self.ctrl || self.meta || self.shift
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitHookOutcome {
    Proceed,
    /** Hold the keypress until `resolve_deferred` is called */
    Defer,
}

/** Called when a keypress is about to be delivered to the VM */
pub trait SubmitHook {
    fn before_submit(&mut self, key: u32) -> SubmitHookOutcome;
}

impl<F> SubmitHook for F
where F: FnMut(u32) -> SubmitHookOutcome {
    fn before_submit(&mut self, key: u32) -> SubmitHookOutcome {
        self(key)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineFilterOutcome {
    Keep,
    Replace(String),
    /** Drop the line; the line request stays open */
    Reject,
}

/** Called on each submitted line before it is given to the VM */
pub trait LineFilter {
    fn filter(&mut self, line: &str) -> LineFilterOutcome;
}

impl<F> LineFilter for F
where F: FnMut(&str) -> LineFilterOutcome {
    fn filter(&mut self, line: &str) -> LineFilterOutcome {
        self(line)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /** A modifier key was held */
    Ignored,
    /** Kept as typeahead */
    Buffered,
    /** Handed to the scroll/focus handler */
    Passed,
    /** The page scrolled instead of taking the key */
    Scrolled,
    /** Ready for the VM */
    Delivered(u32),
    /** A submit hook is holding the key */
    Deferred(u32),
    /** The session is over and the page is moving on */
    Ended,
}

#[derive(Default)]
pub struct InputMachine {
    buffer: VecDeque<u32>,
    deferred: Option<u32>,
    mode: InputMode,
    submit_hooks: Vec<Box<dyn SubmitHook>>,
}

impl InputMachine {
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        trace!(from = self.mode.name(), to = mode.name(), "input mode");
        self.mode = mode;
    }

    pub fn add_submit_hook(&mut self, hook: Box<dyn SubmitHook>) {
        self.submit_hooks.push(hook);
    }

    /** Interpret a raw event according to the current mode */
    pub fn send(&mut self, event: KeyEvent, presenter: &mut dyn Presenter) -> SendOutcome {
        if event.has_modifier() {
            return SendOutcome::Ignored;
        }
        match self.mode {
            InputMode::Buffer => {
                self.buffer.push_back(event.key);
                SendOutcome::Buffered
            },
            InputMode::GetLine | InputMode::None => {
                presenter.scroll_or_focus();
                SendOutcome::Passed
            },
            InputMode::GetKey => self.deliver(event, presenter),
            InputMode::EndGame => {
                presenter.navigate_away();
                SendOutcome::Ended
            },
        }
    }

    fn deliver(&mut self, event: KeyEvent, presenter: &mut dyn Presenter) -> SendOutcome {
        // Let the player finish reading before a keypress moves the story on
        if !event.force && !presenter.is_scrolled_to_bottom() {
            presenter.scroll_to_end();
            return SendOutcome::Scrolled;
        }
        self.set_mode(InputMode::Buffer);
        let mut outcome = SendOutcome::Delivered(event.key);
        for hook in self.submit_hooks.iter_mut() {
            if hook.before_submit(event.key) == SubmitHookOutcome::Defer {
                outcome = SendOutcome::Deferred(event.key);
            }
        }
        if let SendOutcome::Deferred(key) = outcome {
            self.deferred = Some(key);
        }
        outcome
    }

    /** Release a keypress held by a submit hook */
    pub fn resolve_deferred(&mut self) -> Option<u32> {
        self.deferred.take()
    }

    /** Start waiting for a keypress. A key typed ahead of time is delivered straight away */
    pub fn wait(&mut self, presenter: &mut dyn Presenter) -> Option<SendOutcome> {
        self.set_mode(InputMode::GetKey);
        presenter.scroll_or_focus();
        presenter.expect_keypress();
        let key = self.buffer.pop_front()?;
        Some(self.deliver(KeyEvent {
            force: true,
            ..KeyEvent::key(key)
        }, presenter))
    }

    pub fn is_waiting(&self) -> bool {
        !self.buffer.is_empty()
    }

    /** Take a typed-ahead key, for VMs which poll in buffer mode */
    pub fn take_buffered(&mut self) -> Option<u32> {
        self.buffer.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::headless::HeadlessSystem;

    #[test]
    fn buffer_mode_queues_without_changing_mode() {
        let mut system = HeadlessSystem::default();
        let mut input = InputMachine::default();
        input.set_mode(InputMode::Buffer);
        assert_eq!(input.send(KeyEvent::key('x' as u32), &mut system), SendOutcome::Buffered);
        assert_eq!(input.mode(), InputMode::Buffer);
        assert!(input.is_waiting());
        assert_eq!(input.take_buffered(), Some('x' as u32));
        assert!(!input.is_waiting());
    }

    #[test]
    fn modifiers_are_ignored() {
        let mut system = HeadlessSystem::default();
        let mut input = InputMachine::default();
        input.set_mode(InputMode::Buffer);
        let event = KeyEvent {
            ctrl: true,
            ..KeyEvent::key('c' as u32)
        };
        assert_eq!(input.send(event, &mut system), SendOutcome::Ignored);
        assert!(!input.is_waiting());
    }

    #[test]
    fn getkey_delivers_and_returns_to_buffer() {
        let mut system = HeadlessSystem::default();
        let mut input = InputMachine::default();
        assert_eq!(input.wait(&mut system), None);
        assert_eq!(system.expect_keypress_count, 1);
        assert_eq!(input.mode(), InputMode::GetKey);
        assert_eq!(input.send(KeyEvent::named("Enter"), &mut system), SendOutcome::Delivered(0xfffffffa));
        assert_eq!(input.mode(), InputMode::Buffer);
    }

    #[test]
    fn scrolling_takes_precedence() {
        let mut system = HeadlessSystem::default();
        system.scrolled_to_bottom = false;
        let mut input = InputMachine::default();
        input.set_mode(InputMode::GetKey);
        assert_eq!(input.send(KeyEvent::click(), &mut system), SendOutcome::Scrolled);
        assert_eq!(input.mode(), InputMode::GetKey);
        assert_eq!(system.scroll_to_end_count, 1);

        let forced = KeyEvent {
            force: true,
            ..KeyEvent::click()
        };
        assert_eq!(input.send(forced, &mut system), SendOutcome::Delivered(' ' as u32));
    }

    #[test]
    fn typeahead_is_delivered_on_wait() {
        let mut system = HeadlessSystem::default();
        system.scrolled_to_bottom = false;
        let mut input = InputMachine::default();
        input.set_mode(InputMode::Buffer);
        input.send(KeyEvent::key('y' as u32), &mut system);
        assert_eq!(input.wait(&mut system), Some(SendOutcome::Delivered('y' as u32)));
        assert_eq!(input.mode(), InputMode::Buffer);
    }

    #[test]
    fn hooks_can_defer() {
        let mut system = HeadlessSystem::default();
        let mut input = InputMachine::default();
        input.add_submit_hook(Box::new(|_: u32| SubmitHookOutcome::Defer));
        input.set_mode(InputMode::GetKey);
        assert_eq!(input.send(KeyEvent::key('z' as u32), &mut system), SendOutcome::Deferred('z' as u32));
        assert_eq!(input.resolve_deferred(), Some('z' as u32));
        assert_eq!(input.resolve_deferred(), None);
    }

    #[test]
    fn other_modes() {
        let mut system = HeadlessSystem::default();
        let mut input = InputMachine::default();
        input.set_mode(InputMode::GetLine);
        assert_eq!(input.send(KeyEvent::key('a' as u32), &mut system), SendOutcome::Passed);
        input.set_mode(InputMode::EndGame);
        assert_eq!(input.send(KeyEvent::key('a' as u32), &mut system), SendOutcome::Ended);
        assert!(system.navigated_away);
    }
}
