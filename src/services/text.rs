//! Markdown and prose scanning shared by the structural and grounding gates.

use std::sync::LazyLock;

use regex::Regex;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("heading regex is valid"));

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]{}"'`]+"#).expect("url regex is valid")
});

static SECTION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)*)[.):]?\s*").expect("section number regex is valid")
});

/// One markdown section: an ATX heading and the text under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: usize,
    pub title: String,
    /// Non-heading lines up to the next heading of the same or higher level,
    /// so a parent section includes the text of its subsections.
    pub body: String,
}

impl Section {
    /// Title without a leading section number or trailing colon, lowercased.
    pub fn normalized_title(&self) -> String {
        normalize_heading(&self.title)
    }

    /// Leading section number of the title, such as `2.1` in `2.1 Scope`.
    pub fn number(&self) -> Option<&str> {
        let title = self.title.trim_start();
        let len = title
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
            .last()
            .map(|(i, c)| i + c.len_utf8())?;
        let number = title[..len].trim_end_matches('.');
        (!number.is_empty()).then_some(number)
    }

    pub fn body_chars(&self) -> usize {
        self.body.chars().filter(|c| !c.is_whitespace()).count()
    }
}

pub fn normalize_heading(title: &str) -> String {
    let stripped = SECTION_NUMBER.replace(title.trim(), "");
    stripped
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

/// Split markdown into sections. Text before the first heading belongs to
/// no section. Headings inside fenced code blocks are ignored.
pub fn sections(text: &str) -> Vec<Section> {
    let mut headings: Vec<(usize, usize, String)> = Vec::new();
    let lines: Vec<&str> = text.lines().collect();
    let mut in_fence = false;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING.captures(trimmed) {
            headings.push((idx, caps[1].len(), caps[2].to_string()));
        }
    }

    let heading_lines: Vec<usize> = headings.iter().map(|(idx, _, _)| *idx).collect();

    headings
        .iter()
        .enumerate()
        .map(|(i, (start, level, title))| {
            let end = headings[i + 1..]
                .iter()
                .find(|(_, next_level, _)| next_level <= level)
                .map_or(lines.len(), |(idx, _, _)| *idx);
            let body = lines[start + 1..end]
                .iter()
                .enumerate()
                .filter(|(offset, _)| !heading_lines.contains(&(start + 1 + offset)))
                .map(|(_, line)| *line)
                .collect::<Vec<_>>()
                .join("\n");
            Section {
                level: *level,
                title: title.clone(),
                body,
            }
        })
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Distinct URL-shaped tokens in order of first appearance, without
/// trailing sentence punctuation.
pub fn urls(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in URL.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !found.iter().any(|u| u == url) {
            found.push(url.to_string());
        }
    }
    found
}
