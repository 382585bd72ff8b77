// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Numeric member parsing and formatting.
//!
//! Protocol numbers travel as text in two shapes: plain decimal, or
//! sexagesimal `deg[:min[:sec]]` with colon or space separators. Outbound
//! values are rendered through the member's printf style format string,
//! where the non-standard `m` conversion selects a sexagesimal layout.
//!
//! Rust's float formatting is locale independent, so both directions are
//! C-locale clean without any locale juggling.

/// Parse a protocol number body.
///
/// Accepts plain/scientific decimal first, then falls back to sexagesimal
/// with any run of non-numeric characters as a separator. A comma is
/// tolerated as a decimal point. A `-` anywhere negates the whole value.
///
/// Returns `None` when no leading number can be extracted.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', ".");

    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }

    let neg = s.contains('-');
    let mut parts = s
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .filter(|p| !p.is_empty());

    let deg: f64 = parts.next()?.parse().ok()?;
    let min: f64 = parts.next().map_or(Some(0.0), |p| p.parse().ok())?;
    let sec: f64 = parts.next().map_or(Some(0.0), |p| p.parse().ok())?;

    let v = deg + min / 60.0 + sec / 3600.0;
    Some(if neg { -v } else { v })
}

/// Render `value` through a printf style member format.
///
/// Supported conversions: `f`, `e`, `d` (rounded), `m` (sexagesimal) and
/// a `g`-ish shortest form for everything else. For `m` the fraction
/// digit count selects the layout: 9 = `:mm:ss.ss`, 8 = `:mm:ss.s`,
/// 6 = `:mm:ss`, 5 = `:mm.m`, anything else = `:mm`.
pub fn format_number(format: &str, value: f64) -> String {
    match parse_spec(format) {
        Some((width, prec, 'm')) => {
            let fracbase = match prec {
                9 => 360_000,
                8 => 36_000,
                6 => 3_600,
                5 => 600,
                _ => 60,
            };
            let frac_chars = prec.max(3);
            format_sexa(value, width.saturating_sub(frac_chars), fracbase)
        }
        Some((width, prec, 'f')) => format!("{:>w$.p$}", value, w = width, p = prec),
        Some((width, prec, 'e')) => format!("{:>w$.p$e}", value, w = width, p = prec),
        Some((width, _, 'd')) => format!("{:>w$}", value.round() as i64, w = width),
        _ => format!("{}", value),
    }
}

/// Split `%<width>.<prec><conv>` into its parts. Width and precision both
/// default to zero when absent.
fn parse_spec(format: &str) -> Option<(usize, usize, char)> {
    let rest = format.strip_prefix('%')?;
    let mut chars = rest.chars().peekable();

    let mut width = 0usize;
    while let Some(c) = chars.peek().copied() {
        if let Some(d) = c.to_digit(10) {
            width = width * 10 + d as usize;
            chars.next();
        } else {
            break;
        }
    }

    let mut prec = 0usize;
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(c) = chars.peek().copied() {
            if let Some(d) = c.to_digit(10) {
                prec = prec * 10 + d as usize;
                chars.next();
            } else {
                break;
            }
        }
    }

    let conv = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some((width, prec, conv))
}

/// Sexagesimal rendering: integer part right aligned in `int_width`, then
/// the fraction shape selected by `fracbase`.
fn format_sexa(value: f64, int_width: usize, fracbase: u64) -> String {
    let neg = value < 0.0;
    let n = (value.abs() * fracbase as f64 + 0.5) as u64;
    let whole = n / fracbase;
    let frac = n % fracbase;

    // Negative zero keeps its sign so -0:30 survives the round trip.
    let mut out = if neg && whole == 0 {
        format!("{:>w$}", "-0", w = int_width)
    } else {
        let signed = if neg { -(whole as i64) } else { whole as i64 };
        format!("{:>w$}", signed, w = int_width)
    };

    match fracbase {
        60 => out.push_str(&format!(":{:02}", frac)),
        600 => out.push_str(&format!(":{:02}.{}", frac / 10, frac % 10)),
        3_600 => out.push_str(&format!(":{:02}:{:02}", frac / 60, frac % 60)),
        36_000 => {
            let m = frac / 600;
            let r = frac % 600;
            out.push_str(&format!(":{:02}:{:02}.{}", m, r / 10, r % 10));
        }
        _ => {
            let m = frac / 6_000;
            let r = frac % 6_000;
            out.push_str(&format!(":{:02}:{:02}.{:02}", m, r / 100, r % 100));
        }
    }
    out
}
