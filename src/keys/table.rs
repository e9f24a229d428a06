//! WebDriver keyboard code points
//!
//! Named keys map to the fixed control code points from the WebDriver
//! keyboard-actions table; single characters pass through unmapped.

/// Normalize a keypress token for lookup: lower-case, drop the word
/// "arrow", trim surrounding whitespace.
pub(crate) fn normalize(token: &str) -> String {
    token.to_lowercase().replace("arrow", "").trim().to_string()
}

/// Split a keypress id into its simultaneous-press parts.
///
/// `_` and `+` both join keys pressed together. Compound direction names
/// split by authoring tools are reassembled first, so `PAGE_DOWN` comes out
/// as the single part `pagedown` rather than `page` + `down`. Parts left
/// empty by normalization (a bare "arrow" word) are dropped, except that a
/// wholly empty id still yields one empty part so validation can flag it.
pub(crate) fn split_parts(id: &str) -> Vec<String> {
    let raw: Vec<String> = id.split(['_', '+']).map(|part| normalize(part)).collect();

    let mut parts = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();
    while let Some(part) = iter.next() {
        if part == "page" && matches!(iter.peek().map(String::as_str), Some("up" | "down")) {
            let direction = iter.next().unwrap_or_default();
            parts.push(format!("page{direction}"));
        } else if !part.is_empty() {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        parts.push(String::new());
    }
    parts
}

/// Code point for a named key, if recognized.
///
/// Expects a normalized (lower-case, compact) name. Common aliases are
/// accepted alongside the canonical WebDriver names.
pub(crate) fn code_point(name: &str) -> Option<char> {
    let code = match name {
        "null" => '\u{e000}',
        "cancel" => '\u{e001}',
        "help" => '\u{e002}',
        "backspace" => '\u{e003}',
        "tab" => '\u{e004}',
        "clear" => '\u{e005}',
        "return" => '\u{e006}',
        "enter" => '\u{e007}',
        "shift" => '\u{e008}',
        "control" | "ctrl" => '\u{e009}',
        "alt" | "option" | "opt" => '\u{e00a}',
        "pause" => '\u{e00b}',
        "escape" | "esc" => '\u{e00c}',
        "space" => '\u{e00d}',
        "pageup" => '\u{e00e}',
        "pagedown" => '\u{e00f}',
        "end" => '\u{e010}',
        "home" => '\u{e011}',
        "left" => '\u{e012}',
        "up" => '\u{e013}',
        "right" => '\u{e014}',
        "down" => '\u{e015}',
        "insert" | "ins" => '\u{e016}',
        "delete" | "del" => '\u{e017}',
        "semicolon" => '\u{e018}',
        "equals" => '\u{e019}',
        "numpad0" => '\u{e01a}',
        "numpad1" => '\u{e01b}',
        "numpad2" => '\u{e01c}',
        "numpad3" => '\u{e01d}',
        "numpad4" => '\u{e01e}',
        "numpad5" => '\u{e01f}',
        "numpad6" => '\u{e020}',
        "numpad7" => '\u{e021}',
        "numpad8" => '\u{e022}',
        "numpad9" => '\u{e023}',
        "multiply" => '\u{e024}',
        "add" => '\u{e025}',
        "separator" => '\u{e026}',
        "subtract" => '\u{e027}',
        "decimal" => '\u{e028}',
        "divide" => '\u{e029}',
        "f1" => '\u{e031}',
        "f2" => '\u{e032}',
        "f3" => '\u{e033}',
        "f4" => '\u{e034}',
        "f5" => '\u{e035}',
        "f6" => '\u{e036}',
        "f7" => '\u{e037}',
        "f8" => '\u{e038}',
        "f9" => '\u{e039}',
        "f10" => '\u{e03a}',
        "f11" => '\u{e03b}',
        "f12" => '\u{e03c}',
        "meta" | "command" | "cmd" => '\u{e03d}',
        _ => return None,
    };
    Some(code)
}
