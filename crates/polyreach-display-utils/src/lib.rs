//! This crate contains utility functions for displaying iterators, vectors
//! and matrices in a uniform way across the polyreach crates.

use std::fmt::Display;

/// Size of a tab when displaying nested structures
pub const TAB_SIZE: usize = 4;

/// Join iterators over displayable types using the given separator
///
/// The separator can be any string, including an empty string. It is not
/// appended to the end of the result.
///
/// # Example
///
/// ```
/// use polyreach_display_utils::join_iterator;
///
/// let list = vec!["a", "b", "c"];
/// assert_eq!(join_iterator(list.iter(), ", "), "a, b, c");
/// ```
pub fn join_iterator<T: ToString, U: Iterator<Item = T>, S: Into<String>>(
    list: U,
    sep: S,
) -> String {
    list.map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep.into().as_str())
}

/// Indent every line of the given text by one tab
///
/// # Example
///
/// ```
/// use polyreach_display_utils::indent_all;
///
/// assert_eq!(indent_all("a\nb"), "    a\n    b");
/// ```
pub fn indent_all<S: Display>(text: S) -> String {
    let indent = " ".repeat(TAB_SIZE);
    text.to_string()
        .lines()
        .map(|l| format!("{indent}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a row of coefficients as a space separated list
///
/// Coefficients are printed with the shortest representation that round
/// trips, which keeps matrix dumps readable.
///
/// # Example
///
/// ```
/// use polyreach_display_utils::format_coefficients;
///
/// assert_eq!(format_coefficients(&[1.0, -0.5, 0.0]), "1 -0.5 0");
/// ```
pub fn format_coefficients(row: &[f64]) -> String {
    join_iterator(row.iter(), " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_iterator_empty() {
        let list: Vec<&str> = vec![];
        assert_eq!(join_iterator(list.iter(), ", "), "");
    }

    #[test]
    fn test_join_iterator_single() {
        assert_eq!(join_iterator(["x"].iter(), " && "), "x");
    }

    #[test]
    fn test_indent_all_single_line() {
        assert_eq!(indent_all("x"), "    x");
    }

    #[test]
    fn test_format_coefficients() {
        assert_eq!(format_coefficients(&[0.25, 2.0]), "0.25 2");
    }
}
