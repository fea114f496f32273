//! Square indices.
//!
//! A square is a `u8` in `0..64`. Index 0 is a8 and index 63 is h1, so the
//! board reads row by row the same way a FEN string does.

/// Column of `square`, 0 for the a-file.
#[inline]
pub const fn col(square: u8) -> u8 {
    square % 8
}

/// Row of `square`, 0 for the 8th rank.
#[inline]
pub const fn row(square: u8) -> u8 {
    square / 8
}

/// Square index from column and row.
#[inline]
pub const fn at(col: u8, row: u8) -> u8 {
    row * 8 + col
}

/// Reflects `square` vertically: a1 <-> a8, e2 <-> e7.
#[inline]
pub const fn mirror(square: u8) -> u8 {
    square ^ 56
}

/// True for the dark squares (a1, c1, ..., h8).
#[inline]
pub const fn is_dark(square: u8) -> bool {
    (col(square) + row(square)) % 2 == 1
}

/// Algebraic name, e.g. `"e4"`.
pub fn name(square: u8) -> String {
    debug_assert!(square < 64);
    let file = (b'a' + col(square)) as char;
    let rank = (b'8' - row(square)) as char;
    format!("{file}{rank}")
}

/// Parses an algebraic square name, e.g. `"e4"`.
pub fn parse(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let file = chars.next()?;
    let rank = chars.next()?;
    if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    let col = file as u8 - b'a';
    let row = b'8' - rank as u8;
    Some(at(col, row))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(name(0), "a8");
        assert_eq!(name(63), "h1");
        assert_eq!(name(52), "e2");
        assert_eq!(parse("e2"), Some(52));
        assert_eq!(parse("a8"), Some(0));
        assert_eq!(parse("i1"), None);
        assert_eq!(parse("e9"), None);
        assert_eq!(parse("e22"), None);
    }

    #[test]
    fn mirror_flips_rank() {
        assert_eq!(mirror(parse("e2").unwrap()), parse("e7").unwrap());
        assert_eq!(mirror(parse("a1").unwrap()), parse("a8").unwrap());
        for sq in 0..64 {
            assert_eq!(mirror(mirror(sq)), sq);
            assert_eq!(col(mirror(sq)), col(sq));
        }
    }

    #[test]
    fn square_colors() {
        assert!(is_dark(parse("a1").unwrap()));
        assert!(!is_dark(parse("h1").unwrap()));
        assert!(is_dark(parse("h8").unwrap()));
    }
}
