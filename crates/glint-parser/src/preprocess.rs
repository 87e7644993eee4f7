//! The preprocessor adapter.
//!
//! Expands object-like macros, evaluates `#ifdef` conditionals, and records
//! `#version` / `#extension` directives. Output preserves the input's line
//! count, so downstream diagnostics keep their source lines.

use std::collections::HashMap;

use glint_ir::Diagnostic;

use crate::{Dialect, LanguageVersion};

/// Extensions the implementation knows how to honor.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "GL_ARB_draw_buffers",
    "GL_ARB_fragment_coord_conventions",
    "GL_EXT_texture_array",
    "GL_NV_texture_rectangle",
];

/// The result of a successful preprocessing pass.
#[derive(Clone, Debug)]
pub struct ExpandedSource {
    /// Macro-expanded text, one output line per input line.
    pub text: String,
    /// Detected (or defaulted) language version.
    pub version: LanguageVersion,
    /// Extensions enabled via `#extension`.
    pub extensions: Vec<String>,
    /// Non-fatal diagnostics to carry onto the unit's log.
    pub warnings: Vec<Diagnostic>,
}

struct CondFrame {
    parent_active: bool,
    /// Whether any branch of this conditional has been taken yet.
    taken: bool,
    active: bool,
    else_seen: bool,
}

/// Expands `source`, returning the expanded text or the first diagnostic.
pub fn preprocess(source: &str, dialect: Dialect) -> Result<ExpandedSource, Diagnostic> {
    let stripped = strip_comments(source)?;

    let mut defines: HashMap<String, String> = HashMap::new();
    if dialect == Dialect::Es {
        defines.insert("GL_ES".into(), "1".into());
    }

    let mut version: Option<LanguageVersion> = None;
    let mut extensions: Vec<String> = Vec::new();
    let mut warnings: Vec<Diagnostic> = Vec::new();
    let mut stack: Vec<CondFrame> = Vec::new();
    let mut out_lines: Vec<String> = Vec::new();
    let mut saw_content = false;

    for (idx, raw_line) in stripped.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let active = stack.iter().all(|f| f.active);
        let trimmed = raw_line.trim();

        let Some(body) = trimmed.strip_prefix('#') else {
            if active {
                if !trimmed.is_empty() {
                    saw_content = true;
                }
                out_lines.push(substitute(raw_line, &defines));
            } else {
                out_lines.push(String::new());
            }
            continue;
        };

        // Directive lines contribute nothing to the output text but keep
        // their slot so line numbers stay stable.
        out_lines.push(String::new());

        let body = body.trim_start();
        let directive = body
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("");
        let rest = body[directive.len()..].trim_start();

        match directive {
            // A lone `#` is allowed and ignored.
            "" => {}

            "ifdef" | "ifndef" => {
                let name = rest.split_whitespace().next().ok_or_else(|| {
                    Diagnostic::error(format!("malformed #{directive} directive: missing macro name"))
                        .with_line(line_no)
                })?;
                let mut cond = defines.contains_key(name);
                if directive == "ifndef" {
                    cond = !cond;
                }
                stack.push(CondFrame {
                    parent_active: active,
                    taken: cond,
                    active: active && cond,
                    else_seen: false,
                });
            }
            "else" => match stack.last_mut() {
                None => {
                    return Err(
                        Diagnostic::error("#else without a matching #ifdef").with_line(line_no)
                    )
                }
                Some(frame) if frame.else_seen => {
                    return Err(Diagnostic::error("duplicate #else").with_line(line_no))
                }
                Some(frame) => {
                    frame.else_seen = true;
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
            },
            "endif" => {
                if stack.pop().is_none() {
                    return Err(
                        Diagnostic::error("#endif without a matching #ifdef").with_line(line_no)
                    );
                }
            }
            "if" | "elif" => {
                return Err(Diagnostic::error(format!(
                    "#{directive} expressions are not supported; use #ifdef / #ifndef"
                ))
                .with_line(line_no));
            }

            "version" if active => {
                if saw_content || version.is_some() {
                    return Err(Diagnostic::error(
                        "#version directive must appear before anything else",
                    )
                    .with_line(line_no));
                }
                let mut parts = rest.split_whitespace();
                let number: u16 = parts
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| {
                        Diagnostic::error("malformed #version directive").with_line(line_no)
                    })?;
                let es = match parts.next() {
                    None => false,
                    Some("es") => true,
                    Some("core") | Some("compatibility") => false,
                    Some(profile) => {
                        return Err(Diagnostic::error(format!(
                            "unknown profile `{profile}` in #version directive"
                        ))
                        .with_line(line_no))
                    }
                };
                defines.insert("__VERSION__".into(), number.to_string());
                version = Some(LanguageVersion { number, es });
            }
            "define" if active => {
                let name: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                if name.is_empty() {
                    return Err(Diagnostic::error(
                        "malformed #define directive: missing macro name",
                    )
                    .with_line(line_no));
                }
                let after_name = &rest[name.len()..];
                if after_name.starts_with('(') {
                    return Err(Diagnostic::error(format!(
                        "function-like macro `{name}` is not supported"
                    ))
                    .with_line(line_no));
                }
                defines.insert(name, after_name.trim().to_string());
                saw_content = true;
            }
            "undef" if active => {
                let name = rest.split_whitespace().next().ok_or_else(|| {
                    Diagnostic::error("malformed #undef directive: missing macro name")
                        .with_line(line_no)
                })?;
                defines.remove(name);
                saw_content = true;
            }
            "extension" if active => {
                handle_extension(rest, line_no, &mut extensions, &mut warnings)?;
                saw_content = true;
            }
            "error" if active => {
                let message = if rest.is_empty() {
                    "#error".to_string()
                } else {
                    format!("#error: {rest}")
                };
                return Err(Diagnostic::error(message).with_line(line_no));
            }
            "pragma" | "line" if active => {
                saw_content = true;
            }
            "include" if active => {
                return Err(Diagnostic::error("#include is not supported").with_line(line_no));
            }
            _ if active => {
                return Err(Diagnostic::error(format!(
                    "unrecognized preprocessor directive `#{directive}`"
                ))
                .with_line(line_no));
            }
            // Non-conditional directives inside an inactive block are skipped.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Diagnostic::error(
            "unterminated conditional directive (missing #endif)",
        ));
    }

    Ok(ExpandedSource {
        text: out_lines.join("\n"),
        version: version.unwrap_or_else(|| LanguageVersion::default_for(dialect)),
        extensions,
        warnings,
    })
}

fn handle_extension(
    rest: &str,
    line_no: u32,
    extensions: &mut Vec<String>,
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    let malformed =
        || Diagnostic::error("malformed #extension directive").with_line(line_no);

    let (name, behavior) = rest.split_once(':').ok_or_else(malformed)?;
    let name = name.trim();
    let behavior = behavior.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    match behavior {
        "enable" | "require" | "warn" | "disable" => {}
        _ => {
            return Err(Diagnostic::error(format!(
                "unknown behavior `{behavior}` in #extension directive"
            ))
            .with_line(line_no))
        }
    }

    if name == "all" {
        if behavior == "require" || behavior == "enable" {
            return Err(Diagnostic::error(format!(
                "cannot {behavior} all extensions"
            ))
            .with_line(line_no));
        }
        return Ok(());
    }

    if SUPPORTED_EXTENSIONS.contains(&name) {
        if behavior != "disable" {
            extensions.push(name.to_string());
        }
    } else if behavior == "require" {
        return Err(
            Diagnostic::error(format!("unsupported extension `{name}`")).with_line(line_no)
        );
    } else if behavior != "disable" {
        warnings.push(
            Diagnostic::warning(format!("ignoring unsupported extension `{name}`"))
                .with_line(line_no),
        );
    }
    Ok(())
}

/// Replaces `//` and `/* */` comments with whitespace, preserving newlines.
fn strip_comments(source: &str) -> Result<String, Diagnostic> {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line = 1u32;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start_line = line;
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\n' {
                        line += 1;
                        out.push('\n');
                    } else if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(
                        Diagnostic::error("unterminated block comment").with_line(start_line)
                    );
                }
                out.push(' ');
            }
            '\n' => {
                line += 1;
                out.push('\n');
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Expands object-like macros in a line, re-scanning up to a fixed depth so
/// macros that expand to other macros resolve without recursing forever.
fn substitute(line: &str, defines: &HashMap<String, String>) -> String {
    let mut current = line.to_string();
    for _ in 0..8 {
        let (next, changed) = substitute_once(&current, defines);
        current = next;
        if !changed {
            break;
        }
    }
    current
}

fn substitute_once(line: &str, defines: &HashMap<String, String>) -> (String, bool) {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            match defines.get(&ident) {
                Some(value) => {
                    out.push_str(value);
                    changed = true;
                }
                None => out.push_str(&ident),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    (out, changed)
}
