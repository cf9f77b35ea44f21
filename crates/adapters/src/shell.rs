// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! POSIX shell quoting for command lines sent to remote hosts

/// Characters that force an argument into single quotes
const SHELL_META: &[char] = &[
    ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}', '<',
    '>', '|', '&', ';', '#', '~', '=',
];

/// Replace `'` with `'\''` for use inside single quotes
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote one argument, leaving plain words untouched
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }
    format!("'{}'", escape_single_quote_content(arg))
}

/// Always single-quote, for whole command strings passed to `sh -c`
pub fn quote_always(value: &str) -> String {
    format!("'{}'", escape_single_quote_content(value))
}

/// Quote a directory for `cd`, keeping a leading `~` expandable
pub fn quote_path(path: &str) -> String {
    if path == "~" {
        return "~".to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return format!("~/{}", quote_always(rest));
    }
    quote_always(path)
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
