/*

Virtual filesystem
==================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::collections::{BTreeMap, BTreeSet};

/** The storage backend. Paths are absolute and `/` separated.
    Negative results are routine here (missing files, non-empty directories), so they are plain `false`/`None`. */
pub trait VirtualFs {
    fn read(&self, path: &str) -> Option<Vec<u8>>;
    /** Write a file, whose directory must already exist */
    fn write(&mut self, path: &str, data: &[u8], append: bool) -> bool;
    fn exists(&self, path: &str) -> bool;
    fn is_dir(&self, path: &str) -> bool;
    fn mkdir(&mut self, path: &str) -> bool;
    /** Names (not paths) of a directory's entries */
    fn readdir(&self, path: &str) -> Option<Vec<String>>;
    fn unlink(&mut self, path: &str) -> bool;
    /** Remove an empty directory */
    fn rmdir(&mut self, path: &str) -> bool;
    /** Persist anything held in memory by an asynchronous backend */
    fn syncfs(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOptions {
    pub binary: bool,
    /** Strip a file header, when the story uses them */
    pub header: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOptions {
    pub append: bool,
    pub binary: bool,
    /** Add a file header, when the story uses them */
    pub header: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FileContent {
    Binary(Vec<u8>),
    Text(String),
}

impl FileContent {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContent::Binary(data) => data,
            FileContent::Text(text) => text.into_bytes(),
        }
    }
}

pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(index) => &path[..index],
        None => "",
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    }
    else {
        format!("{dir}/{name}")
    }
}

/** Resolve a path against a root directory, normalising `.` and `..` */
pub fn resolve(root: &str, path: &str) -> String {
    let full = if path.starts_with('/') {path.to_string()} else {join(root, path)};
    let mut parts: Vec<&str> = Vec::new();
    for part in full.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

/** Create a directory and any missing parents */
pub fn mkdir_all(fs: &mut dyn VirtualFs, path: &str) -> bool {
    if fs.is_dir(path) {
        return true;
    }
    if fs.exists(path) {
        return false;
    }
    let parent = dirname(path);
    if !parent.is_empty() && parent != path && !mkdir_all(fs, parent) {
        return false;
    }
    fs.mkdir(path)
}

/** Copy a file. If `to` is a directory the file keeps its name inside it */
pub fn copy(fs: &mut dyn VirtualFs, from: &str, to: &str, replace: bool) -> bool {
    if fs.is_dir(from) {
        return false;
    }
    let Some(data) = fs.read(from) else {
        return false;
    };
    let target = target_path(fs, from, to);
    if fs.exists(&target) && !replace {
        return false;
    }
    fs.write(&target, &data, false)
}

pub fn move_file(fs: &mut dyn VirtualFs, from: &str, to: &str, replace: bool) -> bool {
    // Moving a file onto itself leaves it where it is
    if target_path(fs, from, to) == from {
        return fs.exists(from) && !fs.is_dir(from);
    }
    copy(fs, from, to, replace) && fs.unlink(from)
}

fn target_path(fs: &dyn VirtualFs, from: &str, to: &str) -> String {
    if fs.is_dir(to) {join(to, basename(from))} else {to.to_string()}
}

/** A simple in-memory filesystem */
#[derive(Debug)]
pub struct MemoryFs {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    pub sync_count: u32,
}

impl Default for MemoryFs {
    fn default() -> Self {
        MemoryFs {
            dirs: BTreeSet::from(["/".to_string()]),
            files: BTreeMap::new(),
            sync_count: 0,
        }
    }
}

impl MemoryFs {
    fn has_children(&self, path: &str) -> bool {
        let prefix = join(path, "");
        self.files.keys().chain(self.dirs.iter())
            .any(|entry| entry.starts_with(&prefix) && entry.len() > prefix.len())
    }
}

impl VirtualFs for MemoryFs {
    fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn write(&mut self, path: &str, data: &[u8], append: bool) -> bool {
        if self.dirs.contains(path) || !self.dirs.contains(dirname(path)) {
            return false;
        }
        let file = self.files.entry(path.to_string()).or_default();
        if !append {
            file.clear();
        }
        file.extend_from_slice(data);
        true
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    fn mkdir(&mut self, path: &str) -> bool {
        if self.exists(path) || !self.dirs.contains(dirname(path)) {
            return false;
        }
        self.dirs.insert(path.to_string());
        true
    }

    fn readdir(&self, path: &str) -> Option<Vec<String>> {
        if !self.dirs.contains(path) {
            return None;
        }
        let entries = self.files.keys().chain(self.dirs.iter())
            .filter(|entry| entry.as_str() != "/" && dirname(entry) == path)
            .map(|entry| basename(entry).to_string())
            .collect::<BTreeSet<_>>();
        Some(entries.into_iter().collect())
    }

    fn unlink(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }

    fn rmdir(&mut self, path: &str) -> bool {
        if path == "/" || !self.dirs.contains(path) || self.has_children(path) {
            return false;
        }
        self.dirs.remove(path)
    }

    fn syncfs(&mut self) {
        self.sync_count += 1;
    }
}
