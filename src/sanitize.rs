// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Strips markup from imported free-text fields: `<script>`/`<style>`
/// elements go together with their content, any remaining tags are removed,
/// and the result is trimmed. Category and account names must be non-empty
/// after this; notes collapse to absent.
pub fn sanitize_text(input: &str) -> String {
    let without_blocks = SCRIPT_BLOCK_RE.replace_all(input, "");
    let without_tags = TAG_RE.replace_all(&without_blocks, "");
    without_tags.trim().to_string()
}
