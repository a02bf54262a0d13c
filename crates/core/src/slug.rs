// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Session-name, branch-slug, and project-slug lexers (spec §6).

/// Session names: `^[A-Za-z0-9._-]+$`, 1-64 chars.
pub fn is_valid_session_name(name: &str) -> bool {
    (1..=64).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Branch slugs: `^[a-z0-9][a-z0-9-]*$`, 1-64 chars.
pub fn is_valid_branch_slug(slug: &str) -> bool {
    if !(1..=64).contains(&slug.len()) {
        return false;
    }
    let mut bytes = slug.bytes();
    let Some(first) = bytes.next() else { return false };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }
    bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Lowercase a name, replace `/` with `-`, collapse repeated `-`, and fall
/// back to `"project"` if the result is empty.
pub fn project_slug(name: &str) -> String {
    let lowered = name.to_lowercase().replace('/', "-");
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for ch in lowered.chars() {
        if ch == '-' {
            if !last_was_dash {
                out.push('-');
            }
            last_was_dash = true;
        } else {
            out.push(ch);
            last_was_dash = false;
        }
    }
    if out.is_empty() {
        "project".to_string()
    } else {
        out
    }
}

/// Compose a branch instance's compose-project name: `<base>--<branch>`.
pub fn branch_compose_name(base: &str, branch: &str) -> String {
    format!("{base}--{branch}")
}

/// Split a compose-project name into `(base, branch)` if it matches the
/// `<base>--<branch>` shape with a valid branch slug.
pub fn split_branch_compose_name(compose_project: &str) -> Option<(&str, &str)> {
    let (base, branch) = compose_project.split_once("--")?;
    if base.is_empty() || !is_valid_branch_slug(branch) {
        return None;
    }
    Some((base, branch))
}
