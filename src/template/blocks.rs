//! Tag scanning for block constructs and inline `{{ ... }}` tags.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\{\{\s*(?:#(?P<open>if|each)\s+(?P<expr>[^{}]*?)|(?P<else>else)|/(?P<close>if|each))\s*\}\}",
    )
    .expect("block tag pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind<'a> {
    IfOpen(&'a str),
    Else,
    IfClose,
    EachOpen(&'a str),
    EachClose,
}

/// A block tag and its byte span in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTag<'a> {
    pub kind: TagKind<'a>,
    pub start: usize,
    pub end: usize,
}

/// Lists every block tag in `text` in order of appearance.
pub fn block_tags(text: &str) -> Vec<BlockTag<'_>> {
    BLOCK_TAG
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = if let Some(open) = caps.name("open") {
                let expr = caps.name("expr").map_or("", |m| m.as_str().trim());
                match open.as_str() {
                    "if" => TagKind::IfOpen(expr),
                    _ => TagKind::EachOpen(expr),
                }
            } else if caps.name("else").is_some() {
                TagKind::Else
            } else {
                match caps.name("close")?.as_str() {
                    "if" => TagKind::IfClose,
                    _ => TagKind::EachClose,
                }
            };
            Some(BlockTag { kind, start: whole.start(), end: whole.end() })
        })
        .collect()
}

/// A resolved `{{#if}}` block: tag indices into the scanned tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfBlock {
    pub open: usize,
    pub else_at: Option<usize>,
    pub close: usize,
}

/// Finds the `{{/if}}` matching the `{{#if}}` at `tags[open]`.
///
/// Nested `{{#if}}` tags raise the depth and `{{/if}}` lowers it; only the
/// first `{{else}}` seen at depth 1 belongs to this block. Iteration bodies
/// are stepped over whole. Returns `None` for an unterminated block.
pub fn match_if(tags: &[BlockTag<'_>], open: usize) -> Option<IfBlock> {
    let mut depth = 1usize;
    let mut else_at = None;
    let mut i = open + 1;

    while i < tags.len() {
        match tags[i].kind {
            TagKind::IfOpen(_) => depth += 1,
            TagKind::IfClose => {
                depth -= 1;
                if depth == 0 {
                    return Some(IfBlock { open, else_at, close: i });
                }
            }
            TagKind::Else if depth == 1 && else_at.is_none() => else_at = Some(i),
            TagKind::EachOpen(_) => {
                if let Some(close) = match_each(tags, i) {
                    i = close;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the first `{{/each}}` after `tags[open]`. Loops do not nest.
pub fn match_each(tags: &[BlockTag<'_>], open: usize) -> Option<usize> {
    tags.iter()
        .enumerate()
        .skip(open + 1)
        .find(|(_, tag)| tag.kind == TagKind::EachClose)
        .map(|(i, _)| i)
}

/// Rewrites every `{{ ... }}` tag of `text` with `replace`, keeping tags it declines.
///
/// The tag body ends at the first `}}` outside quotes; quotes only count
/// after the first whitespace, so quoted helper arguments may contain `}}`.
pub fn replace_tags<F>(text: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find("{{") {
        let open = cursor + found;
        let body_start = open + 2;
        let Some(body_end) = find_tag_end(&text[body_start..]).map(|e| body_start + e) else {
            break;
        };

        out.push_str(&text[cursor..open]);
        let close = body_end + 2;
        match replace(&text[body_start..body_end]) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&text[open..close]),
        }
        cursor = close;
    }

    out.push_str(&text[cursor..]);
    out
}

fn find_tag_end(body: &str) -> Option<usize> {
    let mut seen_space = false;
    let mut quote: Option<char> = None;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c.is_whitespace() => seen_space = true,
            None if seen_space && (c == '"' || c == '\'') => quote = Some(c),
            None if c == '}' && chars.peek().is_some_and(|&(_, n)| n == '}') => return Some(i),
            None => {}
        }
    }
    None
}
