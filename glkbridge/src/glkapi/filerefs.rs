/*

Glk FileRefs
============

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use super::*;

#[derive(Clone, Debug, PartialEq)]
pub struct FileRef {
    pub binary: bool,
    pub filetype: FileType,
    pub path: String,
}

impl FileRef {
    pub fn new(path: String, usage: u32) -> Self {
        FileRef {
            binary: (usage & fileusage_TextMode) == 0,
            filetype: file_type(usage),
            path,
        }
    }
}

/** Remove anything from a story-supplied name which could escape its directory */
pub fn clean_filename(name: &str) -> String {
    let cleaned: String = name.chars()
        .filter(|ch| !matches!(ch, '/' | '\\' | '<' | '>' | ':' | '|' | '?' | '*' | '"' | '\0'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {"null".to_string()} else {cleaned.to_string()}
}

/** Add the usual suffix for a file's type, unless it already has one */
pub fn with_suffix(name: &str, filetype: FileType) -> String {
    let suffix = filetype_suffix(filetype);
    if name.ends_with(suffix) {name.to_string()} else {format!("{name}{suffix}")}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(clean_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(clean_filename("..."), "null");
        assert_eq!(with_suffix("notes", FileType::Data), "notes.glkdata");
        assert_eq!(with_suffix("game.glksave", FileType::SavedGame), "game.glksave");
        assert_eq!(with_suffix("log", FileType::InputRecord), "log.txt");
    }

    #[test]
    fn usage_flags() {
        let fref = FileRef::new("/x".to_string(), fileusage_Transcript | fileusage_TextMode);
        assert!(!fref.binary);
        assert_eq!(fref.filetype, FileType::Transcript);
        assert!(FileRef::new("/x".to_string(), fileusage_SavedGame).binary);
    }
}
