//! Lexical prompt matching over snapshot text.
//!
//! A prompt such as "Find the login button" is reduced to lowercase tokens
//! with filler words removed. Tokens that name a role ("button", "link",
//! "field", ...) are kept apart from content tokens ("login"):
//!
//! - if any content token remains, every line containing one of them as a
//!   substring matches, `[role]` lines included, so "banner" finds `[banner]`;
//! - if the prompt names only roles, `[role]` lines for those roles match.

use crate::types::{MatchResult, PromptMatch};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid token regex"));

pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "am", "find", "where", "what",
    "which", "who", "how", "show", "me", "please", "locate", "get", "give", "click", "press",
    "tap", "on", "in", "at", "of", "to", "for", "from", "with", "by", "and", "or", "i", "my",
    "we", "our", "can", "could", "you", "your", "there", "here", "this", "that", "these",
    "those", "it", "its", "page", "element", "any", "all", "some", "do", "does", "want",
    "need", "see", "look", "into", "up",
];

/// Prompt words that refer to roles, and the roles they stand for.
const ROLE_WORDS: &[(&str, &[&str])] = &[
    ("button", &["button"]),
    ("buttons", &["button"]),
    ("link", &["link"]),
    ("links", &["link"]),
    ("input", &["textbox", "searchbox", "combobox", "spinbutton"]),
    ("inputs", &["textbox", "searchbox", "combobox", "spinbutton"]),
    ("field", &["textbox", "searchbox", "combobox", "spinbutton"]),
    ("fields", &["textbox", "searchbox", "combobox", "spinbutton"]),
    ("textbox", &["textbox"]),
    ("searchbox", &["searchbox"]),
    ("dropdown", &["combobox", "listbox"]),
    ("checkbox", &["checkbox"]),
    ("checkboxes", &["checkbox"]),
    ("radio", &["radio"]),
    ("heading", &["heading"]),
    ("headings", &["heading"]),
    ("title", &["heading"]),
    ("image", &["img"]),
    ("images", &["img"]),
    ("picture", &["img"]),
    ("form", &["form"]),
    ("table", &["table"]),
    ("list", &["list"]),
    ("menu", &["menu", "menubar"]),
    ("navigation", &["navigation"]),
    ("nav", &["navigation"]),
    ("tab", &["tab"]),
    ("dialog", &["dialog", "alertdialog"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTokens {
    pub content: Vec<String>,
    pub roles: Vec<String>,
}

impl PromptTokens {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.roles.is_empty()
    }
}

pub fn tokenize(prompt: &str) -> PromptTokens {
    let mut tokens = PromptTokens::default();
    let lowered = prompt.to_lowercase();

    for word in TOKEN.find_iter(&lowered).map(|m| m.as_str()) {
        if STOPWORDS.contains(&word) {
            continue;
        }
        match ROLE_WORDS.iter().find(|(w, _)| *w == word) {
            Some((_, roles)) => {
                for role in roles.iter() {
                    push_unique(&mut tokens.roles, role);
                }
            }
            None => push_unique(&mut tokens.content, word),
        }
    }
    tokens
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

/// The role named by a bare `[role]` line.
fn role_marker(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
}

pub fn match_prompt(snapshot: &str, prompt: &str) -> MatchResult {
    let tokens = tokenize(prompt);
    let lines: Vec<&str> = if snapshot.is_empty() {
        Vec::new()
    } else {
        snapshot.lines().collect()
    };

    let mut matches = Vec::new();
    if !tokens.is_empty() {
        for (idx, line) in lines.iter().enumerate() {
            if line_matches(line, &tokens) {
                matches.push(PromptMatch {
                    line_number: idx + 1,
                    line_content: line.trim().to_string(),
                    context: context_around(&lines, idx),
                });
            }
        }
    }

    MatchResult {
        total_matches: matches.len(),
        matches,
        prompt: prompt.to_string(),
    }
}

fn line_matches(line: &str, tokens: &PromptTokens) -> bool {
    let marker = role_marker(line);
    if tokens.content.is_empty() {
        return marker.is_some_and(|role| {
            let role = role.to_lowercase();
            tokens.roles.iter().any(|r| *r == role)
        });
    }
    let lowered = line.to_lowercase();
    tokens.content.iter().any(|t| lowered.contains(t.as_str()))
}

/// The matched line with up to one neighbour on each side.
fn context_around(lines: &[&str], idx: usize) -> String {
    let start = idx.saturating_sub(1);
    let end = (idx + 2).min(lines.len());
    lines[start..end].join("\n")
}
