//! Shared types for CLI commands.
//!
//! Per-display lists are written as `;`-separated entries, each entry a
//! `,`-separated tuple: `--offsets "0,0;-12,40"`.

use std::str::FromStr;

use crate::display::SpanMode;

/// Span mode as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliSpanMode {
    /// One image across the true desktop area.
    #[default]
    Single,
    /// One image per span group, corrected for density, bezels and perspective.
    Advanced,
    /// One image per display.
    Multi,
}

impl From<CliSpanMode> for SpanMode {
    fn from(mode: CliSpanMode) -> Self {
        match mode {
            CliSpanMode::Single => Self::Single,
            CliSpanMode::Advanced => Self::Advanced,
            CliSpanMode::Multi => Self::Multi,
        }
    }
}

fn entries(s: &str) -> impl Iterator<Item = &str> {
    s.split(';').map(str::trim).filter(|entry| !entry.is_empty())
}

fn fields<T: FromStr>(entry: &str, what: &str) -> Result<Vec<T>, String> {
    entry
        .split(',')
        .map(|field| field.trim().parse::<T>().map_err(|_| format!("Invalid {what} '{}'", field.trim())))
        .collect()
}

fn pair<T: FromStr + Copy>(entry: &str, what: &str) -> Result<(T, T), String> {
    match fields::<T>(entry, what)?.as_slice() {
        &[a, b] => Ok((a, b)),
        _ => Err(format!("Expected two values in '{entry}', e.g. '1,2'")),
    }
}

/// Span groups: `"0,1;2"` is displays 0 and 1 together, display 2 alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGroups(pub Vec<Vec<usize>>);

impl FromStr for IndexGroups {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups = entries(s).map(|entry| fields(entry, "display index")).collect::<Result<Vec<_>, _>>()?;
        if groups.is_empty() {
            return Err("Expected at least one span group, e.g. '0,1;2'".to_string());
        }
        Ok(Self(groups))
    }
}

/// Integer pairs per display, e.g. offsets `"0,0;-12,40"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntPairs(pub Vec<(i64, i64)>);

impl FromStr for IntPairs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entries(s).map(|entry| pair(entry, "offset")).collect::<Result<_, _>>().map(Self)
    }
}

/// Float pairs per display, e.g. bezels `"9.5,0;9.5,0"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatPairs(pub Vec<(f64, f64)>);

impl FromStr for FloatPairs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entries(s).map(|entry| pair(entry, "size")).collect::<Result<_, _>>().map(Self)
    }
}

/// Per-display diagonals in inches; `auto` keeps the detected size:
/// `"27;auto;24"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagonals(pub Vec<Option<f64>>);

impl FromStr for Diagonals {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entries(s)
            .map(|entry| {
                if entry.eq_ignore_ascii_case("auto") {
                    Ok(None)
                } else {
                    entry.parse::<f64>().map(Some).map_err(|_| format!("Invalid diagonal '{entry}'"))
                }
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_mode_conversion() {
        assert_eq!(SpanMode::from(CliSpanMode::Advanced), SpanMode::Advanced);
        assert_eq!(SpanMode::from(CliSpanMode::default()), SpanMode::Single);
    }

    #[test]
    fn test_index_groups() {
        assert_eq!("0,1;2".parse::<IndexGroups>().unwrap().0, vec![vec![0, 1], vec![2]]);
        assert_eq!(" 0 , 1 ; ".parse::<IndexGroups>().unwrap().0, vec![vec![0, 1]]);
        assert!("".parse::<IndexGroups>().is_err());
        assert!("0,x".parse::<IndexGroups>().is_err());
        assert!("-1".parse::<IndexGroups>().is_err());
    }

    #[test]
    fn test_int_pairs() {
        assert_eq!("0,0;-12,40".parse::<IntPairs>().unwrap().0, vec![(0, 0), (-12, 40)]);
        assert!("1,2,3".parse::<IntPairs>().is_err());
        assert!("1".parse::<IntPairs>().is_err());
    }

    #[test]
    fn test_float_pairs() {
        assert_eq!("9.5,0;9.5,0".parse::<FloatPairs>().unwrap().0, vec![(9.5, 0.0), (9.5, 0.0)]);
    }

    #[test]
    fn test_diagonals() {
        assert_eq!("27;auto;24.5".parse::<Diagonals>().unwrap().0, vec![Some(27.0), None, Some(24.5)]);
        assert!("big".parse::<Diagonals>().is_err());
    }
}
