#![allow(dead_code)]

pub mod utils;

/// Upper bound on pages followed by a walk, so a cursor bug cannot loop forever.
const MAX_PAGES: usize = 1_000;
