// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use paper_renamer::metadata::MetadataRecord;
use paper_renamer::pattern::{Pattern, Resolver};

#[derive(Arbitrary, Debug)]
struct Input {
    pattern: String,
    year: Option<i32>,
    author: Option<String>,
    title: Option<String>,
    journal: Option<String>,
    tags: Vec<String>,
    original: String,
    max_length: u8,
}

const ILLEGAL: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

fuzz_target!(|input: Input| {
    let record = MetadataRecord::new(input.year, input.author, input.title, input.journal);
    let resolver = Resolver::new(Pattern::parse(&input.pattern), input.tags)
        .with_max_length(usize::from(input.max_length));

    let resolution = resolver.resolve(&record, &input.original);
    let stem = resolution.stem;

    assert!(!stem.is_empty());
    assert!(stem.chars().count() <= usize::from(input.max_length).max(1));
    assert!(!stem.chars().any(|c| ILLEGAL.contains(&c) || c.is_control()));
    assert!(!stem.contains("--"));
    assert!(!stem.starts_with(['-', '_', ' ']) && !stem.ends_with(['-', '_', ' ']));
});
