// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "make", "make" },
    empty = { "", "''" },
    space = { "a b", "'a b'" },
    dollar = { "$HOME", "'$HOME'" },
    single_quote = { "it's", "'it'\\''s'" },
    assignment = { "K=V", "'K=V'" },
)]
fn quotes_argument(input: &str, expected: &str) {
    assert_eq!(quote_arg(input), expected);
}

#[parameterized(
    home = { "~", "~" },
    under_home = { "~/apps/my app", "~/'apps/my app'" },
    absolute = { "/srv/app", "'/srv/app'" },
    quote_in_path = { "/srv/o'neil", "'/srv/o'\\''neil'" },
)]
fn quotes_path(input: &str, expected: &str) {
    assert_eq!(quote_path(input), expected);
}

#[test]
fn quote_always_wraps_plain_words() {
    assert_eq!(quote_always("uptime"), "'uptime'");
}
