//! A1 notation helpers.

/// Column letters for a 1-based column number (1 → `A`, 27 → `AA`).
///
/// Returns an empty string for column 0.
pub fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a worksheet name for use in a range (`My 'Sheet'` → `'My ''Sheet'''`).
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Range of a single cell, e.g. `'Challenge30'!D7`.
pub fn cell_range(sheet: &str, column: usize, row: usize) -> String {
    format!("{}!{}{}", quote_sheet_name(sheet), column_letters(column), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(5), "E");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(0), "");
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("Challenge30"), "'Challenge30'");
        assert_eq!(quote_sheet_name("Bob's queue"), "'Bob''s queue'");
    }

    #[test]
    fn test_cell_range() {
        assert_eq!(cell_range("Challenge30", 4, 7), "'Challenge30'!D7");
    }
}
