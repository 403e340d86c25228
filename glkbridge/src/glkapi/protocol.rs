/*

Events, requests and resumptions
================================

Copyright (c) 2022 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::num::NonZeroU32;

use serde::Serialize;

use super::arrays::GlkOwnedBuffer;
use super::constants::*;

/** The event record filled in when `glk_select` returns */
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GlkEvent {
    pub evtype: GlkEventType,
    pub win: Option<NonZeroU32>,
    pub val1: u32,
    pub val2: u32,
}

/** The one request the VM can be suspended on */
#[derive(Clone, Debug, PartialEq)]
pub enum PendingRequest {
    AwaitingChar {
        win: NonZeroU32,
    },
    AwaitingLine {
        win: NonZeroU32,
    },
    AwaitingFileChoice {
        prompt: FilePrompt,
        usage: u32,
        rock: u32,
        /** Whether the host has been asked to show the prompt yet */
        dispatched: bool,
    },
}

/** What the VM gets back when a suspended call completes */
#[derive(Clone, Debug, PartialEq)]
pub enum Resumption {
    Event(GlkEvent),
    /** A line event, along with the buffer the VM passed to `glk_request_line_event` */
    Line(GlkEvent, GlkOwnedBuffer),
    /** `None` if the player cancelled the prompt */
    FileRef(Option<NonZeroU32>),
}

/** The result of a VM call which may have to wait for the player */
#[derive(Clone, Debug, PartialEq)]
pub enum CallResult {
    Returned(Resumption),
    /** The VM must wait to be resumed with a `Resumption` */
    DidNotReturn,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilePromptKind {
    /** Choose from the existing saves */
    Restore,
    /** Name a new save */
    Save,
    Transcript,
    Generic,
}

/** A request for the host to show a file choice dialog */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilePrompt {
    pub kind: FilePromptKind,
    pub filetype: FileType,
    pub fmode: FileMode,
    pub gameid: Option<String>,
    /** Names already in the directory this prompt chooses from */
    pub existing: Vec<String>,
}

impl FilePrompt {
    pub fn new(filetype: FileType, fmode: FileMode, gameid: Option<String>, existing: Vec<String>) -> Self {
        let kind = match (filetype, fmode) {
            (FileType::SavedGame, FileMode::Read) => FilePromptKind::Restore,
            (FileType::SavedGame, _) => FilePromptKind::Save,
            (FileType::Transcript | FileType::InputRecord, _) => FilePromptKind::Transcript,
            (FileType::Data, _) => FilePromptKind::Generic,
        };
        FilePrompt {
            kind,
            filetype,
            fmode,
            gameid,
            existing,
        }
    }
}

/** A blorb chunk provided by the host */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceChunk {
    pub data: Vec<u8>,
    /** BINA chunks are binary, TEXT chunks are not */
    pub binary: bool,
}

/** One accumulated run of window text in a single style */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContentRun {
    pub style: &'static str,
    pub text: String,
}

/** The legacy structured update of a window's text */
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ContentUpdate {
    pub id: u32,
    pub clear: bool,
    pub text: Vec<ContentRun>,
}

/** Final read/write character counts of a stream, and a memory stream's buffer */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClosedStream {
    pub read_count: u32,
    pub write_count: u32,
    pub buffer: Option<GlkOwnedBuffer>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlkTimeval {
    pub high_sec: i32,
    pub low_sec: u32,
    pub microsec: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlkDate {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    /** 0 is Sunday */
    pub weekday: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub microsec: i32,
}
