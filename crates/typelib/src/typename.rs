// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Type name grammar.
//!
//! Names are `/`-separated paths: `/ns1/ns2/Name`. A name may carry
//! template arguments (`/std/vector</int32_t>`) and trailing modifiers
//! applied left to right: `[N]` for a fixed array, `*` for a pointer.
//! Anything between `<` and `>` is opaque to the separator and modifier
//! scanners.

/// Namespace separator.
pub const SEPARATOR: char = '/';

/// Root namespace.
pub const ROOT_NAMESPACE: &str = "/";

/// A trailing type modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `[N]`
    Array(usize),
    /// `*`
    Pointer,
}

/// Returns `true` if the name starts at the root namespace.
pub fn is_absolute(name: &str) -> bool {
    name.starts_with(SEPARATOR)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(' ')
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
}

/// Splits `s` on `sep` occurrences that are not nested inside `<...>`.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Byte index of the `>` matching the `<` at `open`.
fn matching_angle(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a modifier suffix (`[10]*[2]`), returning `None` on garbage.
fn parse_modifiers(mut s: &str) -> Option<Vec<Modifier>> {
    let mut modifiers = Vec::new();
    while !s.is_empty() {
        if let Some(rest) = s.strip_prefix('*') {
            modifiers.push(Modifier::Pointer);
            s = rest;
        } else if let Some(rest) = s.strip_prefix('[') {
            let close = rest.find(']')?;
            let digits = &rest[..close];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            modifiers.push(Modifier::Array(digits.parse().ok()?));
            s = &rest[close + 1..];
        } else {
            return None;
        }
    }
    Some(modifiers)
}

fn is_valid_basename(segment: &str) -> bool {
    let ident_end = segment
        .find(|c| c == '<' || c == '[' || c == '*')
        .unwrap_or(segment.len());
    if !is_identifier(&segment[..ident_end]) {
        return false;
    }
    let mut rest = &segment[ident_end..];
    if rest.starts_with('<') {
        let Some(close) = matching_angle(rest, 0) else {
            return false;
        };
        let args = &rest[1..close];
        if args.is_empty()
            || !split_top_level(args, ',')
                .into_iter()
                .all(|arg| is_valid_typename(arg.trim(), true))
        {
            return false;
        }
        rest = &rest[close + 1..];
    }
    parse_modifiers(rest).is_some()
}

/// Checks a type name against the grammar.
///
/// With `absolute`, the name must start at the root namespace.
pub fn is_valid_typename(name: &str, absolute: bool) -> bool {
    if name.is_empty() || (absolute && !is_absolute(name)) {
        return false;
    }
    let segments = split_top_level(name, SEPARATOR);
    let (last, namespaces) = match segments.split_last() {
        Some(split) => split,
        None => return false,
    };
    let namespaces = if is_absolute(name) {
        &namespaces[1..]
    } else {
        namespaces
    };
    namespaces.iter().all(|ns| is_identifier(ns)) && is_valid_basename(last)
}

/// Checks a namespace: `/`-terminated path of identifiers.
pub fn is_valid_namespace(ns: &str, absolute: bool) -> bool {
    if !ns.ends_with(SEPARATOR) || (absolute && !is_absolute(ns)) {
        return false;
    }
    if ns == ROOT_NAMESPACE {
        return true;
    }
    let inner = ns.strip_prefix(SEPARATOR).unwrap_or(ns);
    let inner = &inner[..inner.len() - 1];
    inner.split(SEPARATOR).all(is_identifier)
}

/// Adds the missing leading and trailing separators.
pub fn normalize_namespace(ns: &str) -> String {
    let mut out = String::with_capacity(ns.len() + 2);
    if !is_absolute(ns) {
        out.push(SEPARATOR);
    }
    out.push_str(ns);
    if !out.ends_with(SEPARATOR) {
        out.push(SEPARATOR);
    }
    out
}

/// Byte index one past the last top-level separator.
fn basename_start(name: &str) -> usize {
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in name.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            SEPARATOR if depth == 0 => start = i + 1,
            _ => {}
        }
    }
    start
}

/// Namespace part of a name, separator included (`/a/b/T` -> `/a/b/`).
pub fn namespace_of(name: &str) -> &str {
    &name[..basename_start(name)]
}

/// Name without its namespace (`/a/b/T` -> `T`).
pub fn basename(name: &str) -> &str {
    &name[basename_start(name)..]
}

/// Name relative to `ns`, if it lives in that namespace or below it.
pub fn relative_name<'a>(name: &'a str, ns: &str) -> Option<&'a str> {
    name.strip_prefix(ns).filter(|rest| !rest.is_empty())
}

/// Splits trailing modifiers off a name.
///
/// `/a/T*[10]` gives `("/a/T", [Pointer, Array(10)])`. Brackets inside
/// template arguments are not modifiers.
pub fn split_modifiers(name: &str) -> Option<(&str, Vec<Modifier>)> {
    let mut depth = 0usize;
    let mut base_end = name.len();
    for (i, c) in name.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '[' | '*' if depth == 0 => {
                base_end = i;
                break;
            }
            _ => {}
        }
    }
    let modifiers = parse_modifiers(&name[base_end..])?;
    Some((&name[..base_end], modifiers))
}

/// Splits `/std/vector</int32_t>` into `("/std/vector", ["/int32_t"])`.
///
/// Returns `None` when the name carries no template arguments.
pub fn template_arguments(name: &str) -> Option<(&str, Vec<&str>)> {
    let start = basename_start(name);
    let open = start + name[start..].find('<')?;
    let close = matching_angle(name, open)?;
    let args = split_top_level(&name[open + 1..close], ',')
        .into_iter()
        .map(str::trim)
        .collect();
    Some((&name[..open], args))
}

/// Name of an array of `element` with `dimension` items.
pub fn array_name(element: &str, dimension: usize) -> String {
    format!("{}[{}]", element, dimension)
}

/// Name of a pointer to `target`.
pub fn pointer_name(target: &str) -> String {
    format!("{}*", target)
}

/// Name of the `kind` container instantiated on `element`.
pub fn container_name(kind: &str, element: &str) -> String {
    format!("{}<{}>", kind, element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_typenames() {
        for name in [
            "/int",
            "/unsigned int",
            "/NS1/NS2/Test",
            "/std/vector</int32_t>",
            "/std/map</std/string,/double>",
            "/a/type*[10]",
            "/double[3][4]",
            "/std/vector</double[3]>[2]*",
        ] {
            assert!(is_valid_typename(name, true), "{} should be valid", name);
        }
        assert!(is_valid_typename("Test", false));
        assert!(is_valid_typename("ns/Test", false));
    }

    #[test]
    fn test_invalid_typenames() {
        for name in [
            "",
            "/",
            "/ns/",
            "//Test",
            "/ns//Test",
            "/Bad-Name",
            "/ T",
            "/T[]",
            "/T[x]",
            "/T[3",
            "/vector<>",
            "/vector</int",
            "/vector<int>",
            "/T*x",
        ] {
            assert!(!is_valid_typename(name, true), "{} should be invalid", name);
        }
        assert!(!is_valid_typename("Test", true));
    }

    #[test]
    fn test_namespaces() {
        assert!(is_valid_namespace("/", true));
        assert!(is_valid_namespace("/a/b/", true));
        assert!(is_valid_namespace("a/", false));
        assert!(!is_valid_namespace("/a/b", true));
        assert!(!is_valid_namespace("a/", true));
        assert!(!is_valid_namespace("/a//", true));
        assert_eq!(normalize_namespace("NS2"), "/NS2/");
        assert_eq!(normalize_namespace("/NS2/"), "/NS2/");
    }

    #[test]
    fn test_namespace_and_basename() {
        assert_eq!(namespace_of("/a/b/T"), "/a/b/");
        assert_eq!(basename("/a/b/T"), "T");
        assert_eq!(namespace_of("/std/vector</a/b>"), "/std/");
        assert_eq!(basename("/std/vector</a/b>"), "vector</a/b>");
        assert_eq!(relative_name("/a/b/T", "/a/"), Some("b/T"));
        assert_eq!(relative_name("/a/b/T", "/c/"), None);
    }

    #[test]
    fn test_modifiers_applied_left_to_right() {
        let (base, mods) = split_modifiers("/a/type*[10]").unwrap();
        assert_eq!(base, "/a/type");
        assert_eq!(mods, vec![Modifier::Pointer, Modifier::Array(10)]);

        let (base, mods) = split_modifiers("/int").unwrap();
        assert_eq!(base, "/int");
        assert!(mods.is_empty());
    }

    #[test]
    fn test_modifiers_inside_templates_are_opaque() {
        let (base, mods) = split_modifiers("/std/vector</int[4]*>[2]").unwrap();
        assert_eq!(base, "/std/vector</int[4]*>");
        assert_eq!(mods, vec![Modifier::Array(2)]);
        assert!(split_modifiers("/T[2]x").is_none());
    }

    #[test]
    fn test_template_arguments() {
        let (template, args) = template_arguments("/std/vector</int32_t>").unwrap();
        assert_eq!(template, "/std/vector");
        assert_eq!(args, vec!["/int32_t"]);

        let (template, args) =
            template_arguments("/std/map</std/vector</a>, /b>").unwrap();
        assert_eq!(template, "/std/map");
        assert_eq!(args, vec!["/std/vector</a>", "/b"]);

        assert!(template_arguments("/int").is_none());
    }
}
