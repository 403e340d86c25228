/*

Whole session scenarios
=======================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::num::NonZeroU32;

use pretty_assertions::assert_eq;

use glkbridge::config::GlkOptions;
use glkbridge::glkapi::constants::*;
use glkbridge::glkapi::protocol::*;
use glkbridge::glkapi::{GlkApi, GlkApiError, GlkOwnedBuffer};
use glkbridge::input::{InputMode, KeyEvent, SubmitHookOutcome};
use glkbridge::scripting::ScriptValue;
use glkbridge::systems::headless::HeadlessSystem;
use glkbridge::vfs::{FileContent, MemoryFs, ReadOptions, VirtualFs, WriteOptions};

type Session = GlkApi<HeadlessSystem>;

/** A stand-in script engine which understands JSON literals */
fn json_engine() -> HeadlessSystem {
    HeadlessSystem::with_evaluator(|code: &str| {
        serde_json::from_str::<serde_json::Value>(code.trim())
            .map(ScriptValue::from)
            .map_err(|err| err.to_string())
    })
}

fn start(system: HeadlessSystem) -> (Session, NonZeroU32) {
    let mut glkapi = GlkApi::new(system, Box::new(MemoryFs::default()), GlkOptions::default());
    assert!(glkapi.init_session());
    let win = glkapi.glk_window_open(None, 0, 0, wintype_TextBuffer, 0).unwrap().unwrap();
    glkapi.glk_set_window(Some(win)).unwrap();
    (glkapi, win)
}

fn write_named(glkapi: &mut Session, name: &str, content: &[u8]) {
    let fref = glkapi.glk_fileref_create_by_name(fileusage_Data | fileusage_TextMode, name, 0).unwrap();
    let str = glkapi.glk_stream_open_file(Some(fref), filemode_Write, 0).unwrap();
    glkapi.glk_put_string_stream(str, content).unwrap();
    glkapi.glk_stream_close(str).unwrap();
    glkapi.glk_fileref_destroy(Some(fref)).unwrap();
}

fn read_named(glkapi: &mut Session, name: &str) -> Option<String> {
    let fref = glkapi.glk_fileref_create_by_name(fileusage_Data | fileusage_TextMode, name, 0).unwrap();
    let str = glkapi.glk_stream_open_file(Some(fref), filemode_Read, 0).unwrap()?;
    let mut buf = [0u8; 256];
    let len = glkapi.glk_get_buffer_stream(Some(str), &mut buf).unwrap() as usize;
    glkapi.glk_stream_close(Some(str)).unwrap();
    glkapi.glk_fileref_destroy(Some(fref)).unwrap();
    Some(buf[..len].iter().map(|&ch| ch as char).collect())
}

#[test]
fn printing_then_line_input() {
    let (mut glkapi, win) = start(HeadlessSystem::default());
    glkapi.glk_put_string(b"Hello\n").unwrap();
    glkapi.glk_request_line_event(Some(win), vec![0; 64].into_boxed_slice(), 0).unwrap();
    assert_eq!(glkapi.glk_select(), Ok(CallResult::DidNotReturn));

    assert_eq!(glkapi.system().text(0), "Hello\n");
    assert_eq!(glkapi.input_mode(), InputMode::GetLine);
    assert_eq!(glkapi.input_mode().name(), "getline");
    assert_eq!(glkapi.system().line_requests, vec![(0, String::new())]);

    let Ok(Some(Resumption::Line(event, GlkOwnedBuffer::U8(buf)))) = glkapi.send_line("look") else {
        panic!("line event expected");
    };
    assert_eq!(event.evtype, GlkEventType::Line);
    assert_eq!(event.win, Some(win));
    assert_eq!(&buf[..event.val1 as usize], b"look");
    assert_eq!(glkapi.system().text(0), "Hello\nlook\n");
    assert_eq!(glkapi.input_mode(), InputMode::Buffer);
}

#[test]
fn text_before_a_line_break_waits_for_a_flush() {
    let (mut glkapi, win) = start(HeadlessSystem::default());
    glkapi.glk_put_string(b"> ").unwrap();
    assert_eq!(glkapi.system().text(0), "");
    glkapi.glk_request_char_event(Some(win)).unwrap();
    assert_eq!(glkapi.system().text(0), "> ");
}

#[test]
fn version_6_handshake() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    assert_eq!(glkapi.interpreter_version(), None);
    write_named(&mut glkapi, "VpHndshk", b"Callooh!");
    assert_eq!(glkapi.interpreter_version(), Some(6));
    assert_eq!(read_named(&mut glkapi, "VpHndshk").as_deref(), Some("Callay!"));

    // Repeating the handshake changes nothing
    write_named(&mut glkapi, "VpHndshk", b"Callooh!");
    assert_eq!(glkapi.interpreter_version(), Some(6));
    assert_eq!(read_named(&mut glkapi, "VpHndshk").as_deref(), Some("Callay!"));
}

#[test]
fn version_7_handshake_uses_headers() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    write_named(&mut glkapi, "VpHndshk", b"* //MYGAME// VpHndshk\nCallooh!");
    assert_eq!(glkapi.interpreter_version(), Some(7));
    assert_eq!(read_named(&mut glkapi, "VpHndshk").as_deref(), Some("* //MYGAME// VpHndshk\nCallay!"));
}

#[test]
fn handshake_file_always_exists() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    let fref = glkapi.glk_fileref_create_by_name(fileusage_Data, "VpHndshk", 0).unwrap();
    assert_eq!(glkapi.glk_fileref_does_file_exist(Some(fref)), Ok(true));
}

#[test]
fn evaluating_a_number() {
    let (mut glkapi, _) = start(json_engine());
    write_named(&mut glkapi, "VpHndshk", b"Callooh!");
    write_named(&mut glkapi, "VpJSEval", b"42");
    assert_eq!(read_named(&mut glkapi, "VpRetTyp").as_deref(), Some("number"));
    assert_eq!(read_named(&mut glkapi, "VpReturn").as_deref(), Some("42"));
}

#[test]
fn evaluating_text_and_large_numbers() {
    let (mut glkapi, _) = start(json_engine());
    write_named(&mut glkapi, "VpJSEval", br#""abc""#);
    assert_eq!(read_named(&mut glkapi, "VpRetTyp").as_deref(), Some("text"));
    assert_eq!(read_named(&mut glkapi, "VpReturn").as_deref(), Some(r#""abc""#));

    write_named(&mut glkapi, "VpJSEval", b"1e25");
    assert_eq!(read_named(&mut glkapi, "VpRetTyp").as_deref(), Some("number"));
    assert_eq!(read_named(&mut glkapi, "VpReturn").as_deref(), Some("10000000000000000000000000"));
}

#[test]
fn failed_evaluation_writes_nothing() {
    let (mut glkapi, _) = start(json_engine());
    write_named(&mut glkapi, "VpJSEval", b"not a literal");
    assert_eq!(read_named(&mut glkapi, "VpRetTyp"), None);
    assert_eq!(read_named(&mut glkapi, "VpReturn"), None);
    assert!(!glkapi.is_halted());
}

#[test]
fn version_7_evaluation_results_have_headers() {
    let (mut glkapi, _) = start(json_engine());
    write_named(&mut glkapi, "VpHndshk", b"* //MYGAME// VpHndshk\nCallooh!");
    write_named(&mut glkapi, "VpJSEval", b"* //MYGAME// VpJSEval\ntrue");
    assert_eq!(read_named(&mut glkapi, "VpRetTyp").as_deref(), Some("* //MYGAME// VpRetTyp\ntruth state"));

    // The host helpers strip the header
    let value = glkapi.read_file("/scripting/VpReturn", ReadOptions {
        binary: false,
        header: true,
    });
    assert_eq!(value, Some(FileContent::Text("true".to_string())));
}

#[test]
fn cancelling_a_restore() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    assert_eq!(glkapi.glk_fileref_create_by_prompt(fileusage_SavedGame, filemode_Read, 0), Ok(CallResult::DidNotReturn));
    let prompts = &glkapi.system().file_prompts;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].kind, FilePromptKind::Restore);

    assert_eq!(glkapi.resume_file_prompt(None), Ok(Resumption::FileRef(None)));
    assert_eq!(glkapi.pending_request(), None);
    assert!(!glkapi.is_halted());
}

#[test]
fn saving_through_a_prompt() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    glkapi.glk_fileref_create_by_prompt(fileusage_SavedGame, filemode_Write, 0).unwrap();
    let Ok(Resumption::FileRef(fref)) = glkapi.resume_file_prompt(Some("morning")) else {
        panic!("fileref expected");
    };
    let str = glkapi.glk_stream_open_file(fref, filemode_Write, 0).unwrap();
    glkapi.glk_put_buffer_stream(str, &[1, 2, 3]).unwrap();
    glkapi.glk_stream_close(str).unwrap();
    assert_eq!(glkapi.fs().read("/savefiles/morning.glksave"), Some(vec![1, 2, 3]));
    assert!(glkapi.fs().readdir("/savefiles").unwrap().contains(&"morning.glksave".to_string()));
}

#[test]
fn keypress_scrolls_before_it_is_delivered() {
    let (mut glkapi, win) = start(HeadlessSystem::default());
    glkapi.glk_request_char_event(Some(win)).unwrap();
    assert_eq!(glkapi.glk_select(), Ok(CallResult::DidNotReturn));
    assert_eq!(glkapi.input_mode(), InputMode::GetKey);

    glkapi.system_mut().scrolled_to_bottom = false;
    assert_eq!(glkapi.send_key(KeyEvent::click()), None);
    assert_eq!(glkapi.system().scroll_to_end_count, 1);

    let expected = GlkEvent {
        evtype: GlkEventType::Char,
        win: Some(win),
        val1: ' ' as u32,
        val2: 0,
    };
    assert_eq!(glkapi.send_key(KeyEvent::click()), Some(Resumption::Event(expected)));
}

#[test]
fn deferred_keypress() {
    let (mut glkapi, win) = start(HeadlessSystem::default());
    glkapi.add_submit_hook(Box::new(|_: u32| SubmitHookOutcome::Defer));
    glkapi.glk_request_char_event(Some(win)).unwrap();
    glkapi.glk_select().unwrap();
    assert_eq!(glkapi.send_char('n' as u32), None);
    let Some(Resumption::Event(event)) = glkapi.resolve_deferred_keypress() else {
        panic!("char event expected");
    };
    assert_eq!(event.val1, 'n' as u32);
}

#[test]
fn host_helpers_resolve_against_the_data_dir() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    assert!(!glkapi.write_file("notes/today.txt", FileContent::Text("hi".to_string()), WriteOptions::default()));
    glkapi.fs_mut().mkdir("/gamedata/notes");
    assert!(glkapi.write_file("notes/today.txt", FileContent::Text("hi".to_string()), WriteOptions::default()));
    assert!(glkapi.file_exists("/gamedata/notes/today.txt"));
    assert!(glkapi.copy_file("notes/today.txt", "copy.txt", false));
    assert!(glkapi.move_file("copy.txt", "notes/moved.txt", false));
    assert!(!glkapi.file_exists("copy.txt"));
    assert_eq!(glkapi.read_file("notes/moved.txt", ReadOptions::default()), Some(FileContent::Text("hi".to_string())));
    let binary = ReadOptions {
        binary: true,
        header: false,
    };
    assert_eq!(glkapi.read_file("notes/moved.txt", binary), Some(FileContent::Binary(b"hi".to_vec())));
    assert!(glkapi.move_file("notes/moved.txt", "/gamedata/notes/../notes/moved.txt", true));
    assert!(glkapi.file_exists("notes/moved.txt"));
}

#[test]
fn the_end() {
    let (mut glkapi, _) = start(HeadlessSystem::default());
    glkapi.glk_put_string(b"*** The End ***").unwrap();
    glkapi.glk_exit();
    assert_eq!(glkapi.system().text(0), "*** The End ***");
    assert_eq!(glkapi.input_mode(), InputMode::EndGame);
    assert_eq!(glkapi.glk_put_string(b"more"), Err(GlkApiError::Halted));

    glkapi.send_key(KeyEvent::key('x' as u32));
    assert!(glkapi.system().navigated_away);
}
