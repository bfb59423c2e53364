//! Natural (numeric-aware) ordering of report file names
//!
//! "PC-2.htm" sorts before "PC-10.htm". Letters compare case-insensitively.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk {
    Number(String),
    Text(String),
}

fn chunks(s: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in s.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            out.push(make_chunk(std::mem::take(&mut current), in_digits));
        }
        in_digits = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(make_chunk(current, in_digits));
    }
    out
}

fn make_chunk(s: String, digits: bool) -> Chunk {
    if digits {
        Chunk::Number(s)
    } else {
        Chunk::Text(s.to_lowercase())
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Compare two names the way a person would sort them
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Chunk::Number(x), Chunk::Number(y)) => compare_numbers(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}
