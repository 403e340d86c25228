/*

A Glk bridge for browser-hosted interactive fiction
===================================================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

pub mod config;
pub mod glkapi;
pub mod input;
pub mod output;
pub mod scripting;
pub mod systems;
pub mod vfs;

use glkapi::protocol::{FilePrompt, ResourceChunk};
use output::StyleTarget;
use scripting::ScriptValue;

/** The page the story is shown on. Windows are numbered as on the page: 0 is the main window, 1 the status line */
pub trait Presenter {
    fn window_exists(&self, win: u32) -> bool;
    fn window_append(&mut self, win: u32, html: &str, classes: &[String]);
    fn window_clear(&mut self, win: u32);
    fn set_classes(&mut self, target: StyleTarget, classes: &[String]);
    fn is_scrolled_to_bottom(&self) -> bool;
    fn scroll_or_focus(&mut self);
    fn scroll_to_end(&mut self);
    /** The story is over and a key was pressed */
    fn navigate_away(&mut self);
    /** Tell listeners a keypress is wanted */
    fn expect_keypress(&mut self) {}
}

/** Glk's access to the host environment */
pub trait GlkSystem: Presenter {
    /** Show the line input prompt */
    fn request_line(&mut self, win: u32, initial: &str);
    /** Hide the line input prompt, because the story cancelled its request */
    fn cancel_line(&mut self, win: u32);
    fn show_fatal_error(&mut self, message: &str);
    /** Show a file dialog. The choice comes back through `GlkApi::resume_file_prompt` */
    fn prompt_file(&mut self, prompt: FilePrompt);
    fn evaluate_script(&mut self, code: &str) -> Result<ScriptValue, String>;
    fn get_resource(&mut self, _filenum: u32) -> Option<ResourceChunk> {
        None
    }
}
