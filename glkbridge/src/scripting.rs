/*

The scripting handshake
=======================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::{debug, error, warn};

use crate::config::GlkOptions;
use crate::vfs::*;

pub const HANDSHAKE_FILENAME: &str = "VpHndshk";
pub const EVAL_FILENAME: &str = "VpJSEval";
pub const RETURN_VALUE_FILENAME: &str = "VpReturn";
pub const RETURN_TYPE_FILENAME: &str = "VpRetTyp";
const SCRIPTING_FILENAMES: [&str; 4] = [HANDSHAKE_FILENAME, EVAL_FILENAME, RETURN_VALUE_FILENAME, RETURN_TYPE_FILENAME];

pub const HANDSHAKE_INIT: &str = "Callooh!";
pub const HANDSHAKE_ACK: &str = "Callay!";

fn header_regex() -> &'static Regex {
    static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADER_REGEX.get_or_init(|| Regex::new(r"^([-*]) //(.*)// .*\n").expect("header regex"))
}

/** Whether the story wants file headers, as decided by the handshake */
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InterpreterVersion {
    /** No headers */
    V6,
    /** Every file starts with a header line */
    V7,
}

impl InterpreterVersion {
    pub fn number(self) -> u32 {
        match self {
            InterpreterVersion::V6 => 6,
            InterpreterVersion::V7 => 7,
        }
    }
}

/** A parsed file header line */
#[derive(Clone, Debug, PartialEq)]
pub struct FileHeader {
    pub ready: bool,
    pub project: String,
}

/** Split a header line off the front of some file data */
pub fn split_header(data: &[u8]) -> (Option<FileHeader>, &[u8]) {
    let Some(newline) = data.iter().position(|&byte| byte == b'\n') else {
        return (None, data);
    };
    let Ok(line) = std::str::from_utf8(&data[..=newline]) else {
        return (None, data);
    };
    match header_regex().captures(line) {
        Some(captures) => (Some(FileHeader {
            ready: &captures[1] == "*",
            project: captures[2].to_string(),
        }), &data[newline + 1..]),
        None => (None, data),
    }
}

/** A value produced by evaluating a script in the host */
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Set(Vec<ScriptValue>),
    Object(Vec<(String, ScriptValue)>),
    /** A function's source text */
    Function(String),
    /** A symbol's description */
    Symbol(String),
}

impl ScriptValue {
    /** The type name the story reads back */
    pub fn type_tag(&self) -> &'static str {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => "nothing",
            ScriptValue::Bool(_) => "truth state",
            ScriptValue::Number(num) if num.is_nan() => "NaN",
            ScriptValue::Number(num) if num.is_infinite() => "infinity",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) | ScriptValue::Symbol(_) => "text",
            ScriptValue::Array(_) | ScriptValue::Set(_) => "list",
            ScriptValue::Object(_) => "object",
            ScriptValue::Function(_) => "function",
        }
    }

    /** The text the story reads back as the value */
    pub fn to_return_value(&self) -> String {
        match self {
            ScriptValue::Undefined => String::new(),
            ScriptValue::Number(num) => format_number(*num),
            ScriptValue::Function(text) | ScriptValue::Symbol(text) => text.clone(),
            value => serde_json::to_string(&value.to_json()).unwrap_or_else(|_| "null".to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => Value::Null,
            ScriptValue::Bool(val) => Value::Bool(*val),
            ScriptValue::Number(num) => json_number(*num),
            ScriptValue::String(text) | ScriptValue::Function(text) | ScriptValue::Symbol(text) => Value::String(text.clone()),
            ScriptValue::Array(items) | ScriptValue::Set(items) => Value::Array(items.iter().map(ScriptValue::to_json).collect()),
            ScriptValue::Object(entries) => Value::Object(entries.iter()
                .filter(|(_, val)| *val != ScriptValue::Undefined)
                .map(|(key, val)| (key.clone(), val.to_json()))
                .collect::<Map<String, Value>>()),
        }
    }
}

impl From<Value> for ScriptValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ScriptValue::Null,
            Value::Bool(val) => ScriptValue::Bool(val),
            Value::Number(num) => ScriptValue::Number(num.as_f64().unwrap_or(f64::NAN)),
            Value::String(text) => ScriptValue::String(text),
            Value::Array(items) => ScriptValue::Array(items.into_iter().map(ScriptValue::from).collect()),
            Value::Object(entries) => ScriptValue::Object(entries.into_iter().map(|(key, val)| (key, val.into())).collect()),
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

fn json_number(num: f64) -> Value {
    if num.fract() == 0.0 && num.abs() <= MAX_SAFE_INTEGER {
        Value::Number(Number::from(num as i64))
    }
    else {
        // Non-finite numbers can't be represented
        Number::from_f64(num).map_or(Value::Null, Value::Number)
    }
}

/** Format a number the way a script engine prints it, except that large integers are written out in full */
pub fn format_number(num: f64) -> String {
    if num.is_nan() {
        return "null".to_string();
    }
    if num.is_infinite() {
        return if num > 0.0 {"Infinity"} else {"-Infinity"}.to_string();
    }
    if num == 0.0 {
        return "0".to_string();
    }
    if num.fract() != 0.0 {
        return num.to_string();
    }
    // Expand the shortest round-trip digits, so 1e25 becomes a 1 followed by 25 zeros
    let scientific = format!("{num:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: usize = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|&ch| ch != '.').collect();
    let zeros = (exponent + 1).saturating_sub(digits.len());
    format!("{sign}{digits}{}", "0".repeat(zeros))
}

/** The handshake state, plus header-aware access to the scripting files */
pub struct Scripting {
    data_dir: String,
    dir: String,
    project: String,
    version: Option<InterpreterVersion>,
}

impl Scripting {
    pub fn new(options: &GlkOptions) -> Self {
        Scripting {
            data_dir: options.data_dir.clone(),
            dir: options.scripting_dir.clone(),
            project: options.project.clone(),
            version: None,
        }
    }

    pub fn version(&self) -> Option<InterpreterVersion> {
        self.version
    }

    pub fn headers_enabled(&self) -> bool {
        self.version == Some(InterpreterVersion::V7)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn path(&self, name: &str) -> String {
        join(&self.dir, name)
    }

    /** The path of a file the story opens by name, if it is one of the scripting files */
    pub fn scripting_path(&self, name: &str) -> Option<String> {
        SCRIPTING_FILENAMES.contains(&name).then(|| self.path(name))
    }

    pub fn is_handshake(&self, path: &str) -> bool {
        path == self.path(HANDSHAKE_FILENAME)
    }

    pub fn is_eval(&self, path: &str) -> bool {
        path == self.path(EVAL_FILENAME)
    }

    pub fn header(&self, path: &str, ready: bool) -> String {
        format!("{} //{}// {}\n", if ready {'*'} else {'-'}, self.project, basename(path))
    }

    /** Prepare the scripting directory for a new story */
    pub fn init_session(&self, fs: &mut dyn VirtualFs) -> bool {
        if !mkdir_all(fs, &self.dir) {
            return false;
        }
        for name in [EVAL_FILENAME, RETURN_VALUE_FILENAME, RETURN_TYPE_FILENAME] {
            let path = self.path(name);
            if fs.exists(&path) {
                fs.unlink(&path);
            }
        }
        let created = fs.write(&self.path(HANDSHAKE_FILENAME), b"", false);
        fs.syncfs();
        created
    }

    /** Interpret the story's first write to the handshake file */
    pub fn detect_handshake(&mut self, content: &[u8]) -> bool {
        if self.version.is_some() {
            return false;
        }
        let (header, body) = split_header(content);
        if body.strip_suffix(b"\n").unwrap_or(body) != HANDSHAKE_INIT.as_bytes() {
            warn!(content = %String::from_utf8_lossy(content), "unrecognised handshake");
            return false;
        }
        self.version = Some(match header {
            Some(header) => {
                self.project = header.project;
                InterpreterVersion::V7
            },
            None => InterpreterVersion::V6,
        });
        debug!(version = ?self.version, "scripting handshake");
        true
    }

    pub fn handshake_reply(&self) -> Vec<u8> {
        let mut reply = String::new();
        if self.headers_enabled() {
            reply.push_str(&self.header(&self.path(HANDSHAKE_FILENAME), true));
        }
        reply.push_str(HANDSHAKE_ACK);
        reply.into_bytes()
    }

    /** Read a file's raw bytes. The handshake file always gives the acknowledgement */
    pub fn read_bytes(&self, fs: &dyn VirtualFs, path: &str) -> Option<Vec<u8>> {
        if self.is_handshake(path) {
            return Some(self.handshake_reply());
        }
        fs.read(path)
    }

    /** Write a file's raw bytes. Until the version is known, writing the handshake file performs the handshake */
    pub fn write_bytes(&mut self, fs: &mut dyn VirtualFs, path: &str, data: &[u8], append: bool) -> bool {
        if self.is_handshake(path) && self.version.is_none() {
            return self.detect_handshake(data);
        }
        fs.write(path, data, append)
    }

    /** Read a file for the host, resolving relative paths against the data directory */
    pub fn read_file(&self, fs: &dyn VirtualFs, path: &str, options: ReadOptions) -> Option<FileContent> {
        let path = resolve(&self.data_dir, path);
        let data = self.read_bytes(fs, &path)?;
        let data = if options.header && self.headers_enabled() {split_header(&data).1.to_vec()} else {data};
        Some(if options.binary {
            FileContent::Binary(data)
        }
        else {
            FileContent::Text(String::from_utf8_lossy(&data).into_owned())
        })
    }

    /** Write a file for the host, resolving relative paths against the data directory */
    pub fn write_file(&mut self, fs: &mut dyn VirtualFs, path: &str, content: FileContent, options: WriteOptions) -> bool {
        let path = resolve(&self.data_dir, path);
        let mut data = Vec::new();
        if options.header && !options.append && self.headers_enabled() {
            data.extend_from_slice(self.header(&path, true).as_bytes());
        }
        data.extend(content.into_bytes());
        self.write_bytes(fs, &path, &data, options.append)
    }

    /** Run the script in a closed evaluate file, and write its result to the return files */
    pub fn evaluate(&mut self, fs: &mut dyn VirtualFs, content: &[u8], eval: impl FnOnce(&str) -> Result<ScriptValue, String>) -> bool {
        let code = String::from_utf8_lossy(split_header(content).1);
        match eval(&code) {
            Ok(value) => {
                let type_written = self.write_return(fs, RETURN_TYPE_FILENAME, value.type_tag());
                let value_written = self.write_return(fs, RETURN_VALUE_FILENAME, &value.to_return_value());
                type_written && value_written
            },
            Err(err) => {
                error!(%code, "script evaluation failed: {err}");
                false
            },
        }
    }

    fn write_return(&self, fs: &mut dyn VirtualFs, name: &str, text: &str) -> bool {
        let path = self.path(name);
        let mut data = String::new();
        if self.headers_enabled() {
            data.push_str(&self.header(&path, true));
        }
        data.push_str(text);
        fs.write(&path, data.as_bytes(), false)
    }
}
