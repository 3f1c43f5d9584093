//! Natural ordering for asset identifiers: digit runs compare by value and
//! letters compare case-insensitively, so `asset2` sorts before `asset10`.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let ordering = compare_digit_runs(&lhs, &rhs);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = fold(l).cmp(&fold(r));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }

    // equal under folding: fall back to a strict comparison so the order is total
    a.cmp(b)
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(ch) = chars.peek().copied() {
        if !ch.is_ascii_digit() {
            break;
        }
        run.push(ch);
        chars.next();
    }
    run
}

fn compare_digit_runs(lhs: &str, rhs: &str) -> Ordering {
    let lhs_trimmed = lhs.trim_start_matches('0');
    let rhs_trimmed = rhs.trim_start_matches('0');
    lhs_trimmed
        .len()
        .cmp(&rhs_trimmed.len())
        .then_with(|| lhs_trimmed.cmp(rhs_trimmed))
        // "007" after "7"
        .then_with(|| lhs.len().cmp(&rhs.len()))
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(items: &[&str]) -> Vec<String> {
        let mut owned = items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        owned.sort_by(|a, b| natural_cmp(a, b));
        owned
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(
            sorted(&["asset10", "asset2", "asset1"]),
            vec!["asset1", "asset2", "asset10"]
        );
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(sorted(&["beta", "Alpha", "alpha2"]), vec!["Alpha", "alpha2", "beta"]);
    }

    #[test]
    fn leading_zeros_and_prefixes() {
        assert_eq!(natural_cmp("a7", "a007"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("x", "x"), Ordering::Equal);
    }

    #[test]
    fn total_order_on_case_ties() {
        assert_ne!(natural_cmp("A", "a"), Ordering::Equal);
    }
}
