//! Response language detection.
//!
//! A character-set heuristic: Arabic-script letters vote for Persian,
//! Latin letters vote for English. Digits, punctuation and emoji don't vote.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Persian,
    English,
}

impl Language {
    /// Detect the dominant language of `text`.
    ///
    /// Returns `None` when the text has no letters at all, in which case the
    /// caller keeps whatever language the session already had. Ties go to
    /// Persian, the service's home language.
    pub fn detect(text: &str) -> Option<Language> {
        let mut persian = 0usize;
        let mut latin = 0usize;

        for ch in text.chars() {
            if is_arabic_script_letter(ch) {
                persian += 1;
            } else if ch.is_ascii_alphabetic() {
                latin += 1;
            }
        }

        match (persian, latin) {
            (0, 0) => None,
            (p, l) if p >= l => Some(Language::Persian),
            _ => Some(Language::English),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Persian => "Persian (Farsi)",
            Language::English => "English",
        }
    }

    /// Pick the localized variant of a fixed message.
    pub fn pick<'a>(&self, persian: &'a str, english: &'a str) -> &'a str {
        match self {
            Language::Persian => persian,
            Language::English => english,
        }
    }
}

/// ASCII value of a Western, Persian (۰-۹) or Arabic-Indic (٠-٩) digit.
pub fn ascii_digit(ch: char) -> Option<char> {
    let zero = match ch {
        '0'..='9' => return Some(ch),
        '۰'..='۹' => '۰',
        '٠'..='٩' => '٠',
        _ => return None,
    };
    char::from_digit(ch as u32 - zero as u32, 10)
}

fn is_arabic_script_letter(ch: char) -> bool {
    let in_block = matches!(
        ch,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
    );
    // excludes Arabic punctuation (، ؟) and Persian digits
    in_block && ch.is_alphabetic()
}
