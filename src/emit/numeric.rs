//! Exact PEG productions for bounded decimal numbers.
//!
//! Integer intervals are split into runs that share a digit prefix
//! (`100..=149` → `'1' [0-4] [0-9]`), the same decomposition as the
//! to-regex-range family of tools. Fractional end points get the same
//! treatment on the digits after the point. Alternatives are ordered longest
//! first so an ordered choice followed by `![0-9.eE]` never commits to a prefix.

use crate::expr::{Bound, Bounds};
use crate::ir::fmt_num;

/// Lookahead closing every numeric terminal.
pub const NUMBER_END: &str = "![0-9.eE]";

/// Fraction admitting anything, including none.
const ANY_FRACTION: &str = "('.' [0-9]+)?";

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// e.g. `int_ge0_le150`
    pub name: String,
    /// Right-hand side of the rule.
    pub body: String,
}

/// Terminal for an int field; `bounds` are inclusive integers.
pub fn int_terminal(bounds: Bounds) -> Terminal {
    let lo = bounds.lower.map(|b| b.value as i128);
    let hi = bounds.upper.map(|b| b.value as i128);

    let mut alts: Vec<String> = Vec::new();
    // negative side: magnitudes in [max(1, -hi), -lo]
    if lo.is_none_or(|l| l < 0) {
        let m_lo = hi.map_or(1, |h| (-h).max(1)) as u128;
        let m_hi = lo.map(|l| (-l) as u128);
        if m_hi.is_none_or(|m| m >= m_lo) {
            let inner = digit_alternatives(m_lo, m_hi);
            alts.push(format!("'-' {}", group(&inner)));
        }
    }
    // non-negative side: [max(0, lo), hi]
    if hi.is_none_or(|h| h >= 0) {
        let p_lo = lo.map_or(0, |l| l.max(0)) as u128;
        let p_hi = hi.map(|h| h as u128);
        if p_hi.is_none_or(|h| h >= p_lo) {
            alts.push(group(&digit_alternatives(p_lo, p_hi)));
        }
    }

    Terminal { name: format!("int_{}", bound_tags(bounds)), body: format!("{} {NUMBER_END}", group(&alts)) }
}

/// Terminal for a float field, exact for fractional end points too.
pub fn number_terminal(bounds: Bounds) -> Terminal {
    let zero_incl = Bound { value: 0.0, inclusive: true };
    let zero_excl = Bound { value: 0.0, inclusive: false };
    let mut alts: Vec<String> = Vec::new();

    // negative side, as magnitudes: (max(0, -hi), -lo]
    if bounds.lower.is_none_or(|l| l.value < 0.0) {
        let m_lo = match bounds.upper {
            Some(u) if u.value < 0.0 => Bound { value: -u.value, inclusive: u.inclusive },
            _ => zero_excl,
        };
        let m_hi = bounds.lower.map(|l| Bound { value: -l.value, inclusive: l.inclusive });
        let inner = magnitude_alternatives(m_lo, m_hi);
        if !inner.is_empty() {
            alts.push(format!("'-' {}", group(&inner)));
        }
    }
    // non-negative side
    if bounds.upper.is_none_or(|u| u.value > 0.0 || (u.value == 0.0 && u.inclusive)) {
        let p_lo = match bounds.lower {
            Some(l) if l.value >= 0.0 => l,
            _ => zero_incl,
        };
        let inner = magnitude_alternatives(p_lo, bounds.upper);
        if !inner.is_empty() {
            alts.push(group(&inner));
        }
    }

    Terminal { name: format!("number_{}", bound_tags(bounds)), body: format!("{} {NUMBER_END}", group(&alts)) }
}

/// `ge0_le150`, `gtm5_any`, ... (`m` marks a negative end point).
pub fn bound_tags(b: Bounds) -> String {
    let num = |v: f64| fmt_num(v).replace('-', "m").replace('.', "p");
    let lower = match b.lower {
        Some(l) => format!("{}{}", if l.inclusive { "ge" } else { "gt" }, num(l.value)),
        None => "any".to_string(),
    };
    let upper = match b.upper {
        Some(u) => format!("{}{}", if u.inclusive { "le" } else { "lt" }, num(u.value)),
        None => "any".to_string(),
    };
    format!("{lower}_{upper}")
}

/// Inverse of [`bound_tags`].
pub fn parse_bound_tags(tags: &str) -> Option<Bounds> {
    let (lower, upper) = tags.split_once('_')?;
    let side = |tag: &str, incl: &str, excl: &str| -> Option<Option<Bound>> {
        if tag == "any" {
            return Some(None);
        }
        let (inclusive, rest) = match (tag.strip_prefix(incl), tag.strip_prefix(excl)) {
            (Some(rest), _) => (true, rest),
            (_, Some(rest)) => (false, rest),
            _ => return None,
        };
        let value: f64 = rest.replace('m', "-").replace('p', ".").parse().ok()?;
        Some(Some(Bound { value, inclusive }))
    };
    Some(Bounds { lower: side(lower, "ge", "gt")?, upper: side(upper, "le", "lt")? })
}

// ---- float magnitudes ----

/// Non-negative decimals `m` with `lo <(=) m <(=) hi`.
fn magnitude_alternatives(lo: Bound, hi: Option<Bound>) -> Vec<String> {
    let (lo_int, lo_frac) = decimal_parts(lo.value);
    let lower = lower_fraction(&lo_frac, lo.inclusive);
    let mut keyed: Vec<(usize, String)> = Vec::new();

    let hi = hi.map(|h| (decimal_parts(h.value), h.inclusive));
    if let Some(((hi_int, hi_frac), hi_incl)) = &hi {
        if *hi_int == lo_int {
            // one whole part; the fraction carries both ends
            if let Some(frac) = fraction(lower, Some(upper_fraction(hi_frac, *hi_incl))) {
                keyed.push((digits(lo_int), whole_with(lo_int, &frac)));
            }
            return longest_first(keyed);
        }
    }

    // whole part of `lo`, unless it admits any fraction and joins the run below
    let start = match lower {
        None => lo_int,
        Some(side) => {
            if let Some(frac) = fraction(Some(side), None) {
                keyed.push((digits(lo_int), whole_with(lo_int, &frac)));
            }
            lo_int + 1
        }
    };
    // whole parts strictly inside admit any fraction
    let end = hi.as_ref().map(|((hi_int, _), _)| hi_int - 1);
    if end.is_none_or(|e| e >= start) {
        for (len, alt) in digit_runs(start, end) {
            keyed.push((len, format!("{alt} {ANY_FRACTION}")));
        }
    }
    // whole part of `hi`
    if let Some(((hi_int, hi_frac), hi_incl)) = &hi {
        if let Some(frac) = fraction(None, Some(upper_fraction(hi_frac, *hi_incl))) {
            keyed.push((digits(*hi_int), whole_with(*hi_int, &frac)));
        }
    }
    longest_first(keyed)
}

/// Alternatives over the digits after `.`, plus whether a missing fraction qualifies.
#[derive(Debug)]
struct FractionSide {
    alts: Vec<String>,
    bare: bool,
}

/// Fractions `f` with `0.f >(=) 0.d`; `None` when every fraction qualifies.
fn lower_fraction(d: &str, inclusive: bool) -> Option<FractionSide> {
    if d.is_empty() {
        return (!inclusive).then(|| FractionSide { alts: vec!["'0'* [1-9] [0-9]*".to_string()], bare: false });
    }
    let mut alts = Vec::new();
    for (i, c) in d.char_indices() {
        if c < '9' {
            alts.push(after(&d[..i], format!("{} [0-9]*", digit_class(step(c, 1), '9'))));
        }
    }
    alts.push(if inclusive { format!("'{d}' [0-9]*") } else { format!("'{d}' '0'* [1-9] [0-9]*") });
    Some(FractionSide { alts, bare: false })
}

/// Fractions `f` with `0.f <(=) 0.d`.
fn upper_fraction(d: &str, inclusive: bool) -> FractionSide {
    if d.is_empty() {
        let alts = if inclusive { vec!["'0'+".to_string()] } else { Vec::new() };
        return FractionSide { alts, bare: inclusive };
    }
    let mut alts = Vec::new();
    for (i, c) in d.char_indices() {
        if c > '0' {
            alts.push(after(&d[..i], format!("{} [0-9]*", digit_class('0', step(c, -1)))));
        }
        if i > 0 {
            alts.push(format!("'{}' ![0-9]", &d[..i]));
        }
    }
    if inclusive {
        alts.push(format!("'{d}' '0'*"));
    }
    FractionSide { alts, bare: true }
}

/// The `.digits` part for one whole number; `None` when nothing qualifies.
fn fraction(lower: Option<FractionSide>, upper: Option<FractionSide>) -> Option<String> {
    let (body, bare) = match (lower, upper) {
        (None, None) => return Some(ANY_FRACTION.to_string()),
        (Some(side), None) | (None, Some(side)) => (group(&side.alts), side.bare),
        (Some(l), Some(u)) if l.alts.is_empty() || u.alts.is_empty() => (String::new(), l.bare && u.bare),
        // both ends share the whole part: lookahead for one, consume with the other
        (Some(l), Some(u)) => (format!("&( {} ) {}", l.alts.join(" / "), group(&u.alts)), l.bare && u.bare),
    };
    match (body.is_empty(), bare) {
        (true, true) => Some(String::new()),
        (true, false) => None,
        (false, true) => Some(format!("('.' {body})?")),
        (false, false) => Some(format!("'.' {body}")),
    }
}

/// Whole part and trimmed fraction digits of a non-negative value (`9.25` → `(9, "25")`).
fn decimal_parts(v: f64) -> (u128, String) {
    // `Display` for f64 never switches to exponent notation
    let text = v.to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    (whole.parse().unwrap_or_default(), frac.trim_end_matches('0').to_string())
}

fn whole_with(whole: u128, frac: &str) -> String {
    if frac.is_empty() { format!("'{whole}'") } else { format!("'{whole}' {frac}") }
}

fn after(prefix: &str, rest: String) -> String {
    if prefix.is_empty() { rest } else { format!("'{prefix}' {rest}") }
}

fn digit_class(from: char, to: char) -> String {
    if from == to { format!("'{from}'") } else { format!("[{from}-{to}]") }
}

fn step(c: char, by: i8) -> char {
    (c as u8).wrapping_add_signed(by) as char
}

// ---- integer runs ----

/// Exact alternatives for the canonical spellings of `lo..=hi` (`None` = unbounded).
pub fn digit_alternatives(lo: u128, hi: Option<u128>) -> Vec<String> {
    longest_first(digit_runs(lo, hi))
}

fn digit_runs(lo: u128, hi: Option<u128>) -> Vec<(usize, String)> {
    match hi {
        Some(hi) if hi < lo => Vec::new(),
        Some(hi) => split_to_ranges(lo, hi).into_iter().map(|(a, b)| (digits(a), range_to_peg(a, b))).collect(),
        None => {
            // finite part up to the last number with as many digits as `lo`,
            // then "one more digit or longer"
            let d = digits(lo);
            let mut out: Vec<(usize, String)> = split_to_ranges(lo, pow10(d) - 1)
                .into_iter()
                .map(|(a, b)| (digits(a), range_to_peg(a, b)))
                .collect();
            let mut open = String::from("[1-9]");
            for _ in 0..d {
                open.push_str(" [0-9]");
            }
            open.push_str(" [0-9]*");
            out.push((d + 1, open));
            out
        }
    }
}

fn split_to_ranges(min: u128, max: u128) -> Vec<(u128, u128)> {
    let mut stops: Vec<u128> = vec![max];

    let mut nines = 1;
    let mut stop = fill_nines(min, nines);
    while min <= stop && stop <= max {
        if !stops.contains(&stop) {
            stops.push(stop);
        }
        nines += 1;
        stop = fill_nines(min, nines);
    }

    let mut zeros = 1;
    let mut stop = fill_zeros(max + 1, zeros).wrapping_sub(1);
    while min < stop && stop <= max {
        if !stops.contains(&stop) {
            stops.push(stop);
        }
        zeros += 1;
        stop = fill_zeros(max + 1, zeros).wrapping_sub(1);
    }

    stops.sort_unstable();
    let mut ranges = Vec::with_capacity(stops.len());
    let mut start = min;
    for stop in stops {
        ranges.push((start, stop));
        start = stop + 1;
    }
    ranges
}

/// `n` with its last `count` digits replaced by nines.
fn fill_nines(n: u128, count: u32) -> u128 {
    let p = 10u128.pow(count);
    (n / p) * p + (p - 1)
}

/// `n` with its last `count` digits replaced by zeros.
fn fill_zeros(n: u128, count: u32) -> u128 {
    let p = 10u128.pow(count);
    n - n % p
}

/// `start..=stop` share a digit count; emit one PEG sequence for them.
fn range_to_peg(start: u128, stop: u128) -> String {
    let (a, b) = (start.to_string(), stop.to_string());
    let mut parts: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut any_digits = 0usize;
    for (x, y) in a.chars().zip(b.chars()) {
        if x == y && any_digits == 0 {
            literal.push(x);
            continue;
        }
        if !literal.is_empty() {
            parts.push(format!("'{literal}'"));
            literal.clear();
        }
        if x == '0' && y == '9' {
            any_digits += 1;
        } else {
            parts.push(format!("[{x}-{y}]"));
        }
    }
    if !literal.is_empty() {
        parts.push(format!("'{literal}'"));
    }
    parts.extend(std::iter::repeat_n("[0-9]".to_string(), any_digits));
    parts.join(" ")
}

fn digits(n: u128) -> usize {
    n.to_string().len()
}

fn pow10(d: usize) -> u128 {
    10u128.pow(d as u32)
}

fn longest_first(mut keyed: Vec<(usize, String)>) -> Vec<String> {
    // stable: equal lengths keep ascending order
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, s)| s).collect()
}

fn group(alts: &[String]) -> String {
    match alts {
        [] => String::new(),
        [one] => one.clone(),
        _ => format!("( {} )", alts.join(" / ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal matcher for the subset of PEG produced here, to check terminals end to end.
    mod peg {
        #[derive(Debug, Clone)]
        enum P {
            Lit(String),
            Class(Vec<(char, char)>),
            Seq(Vec<P>),
            Choice(Vec<P>),
            Opt(Box<P>),
            Star(Box<P>),
            Plus(Box<P>),
            Not(Box<P>),
            And(Box<P>),
        }

        fn parse(src: &str) -> P {
            let toks = tokenize(src);
            let mut pos = 0;
            let p = choice(&toks, &mut pos);
            assert_eq!(pos, toks.len(), "trailing tokens in {src}");
            p
        }

        fn tokenize(src: &str) -> Vec<String> {
            let cs: Vec<char> = src.chars().collect();
            let mut out = Vec::new();
            let mut i = 0;
            while i < cs.len() {
                let c = cs[i];
                if c.is_whitespace() {
                    i += 1;
                } else if c == '\'' || c == '[' {
                    let close = if c == '\'' { '\'' } else { ']' };
                    let mut j = i + 1;
                    while cs[j] != close {
                        j += 1;
                    }
                    out.push(cs[i..=j].iter().collect());
                    i = j + 1;
                } else {
                    out.push(c.to_string());
                    i += 1;
                }
            }
            out
        }

        fn choice(t: &[String], pos: &mut usize) -> P {
            let mut alts = vec![seq(t, pos)];
            while t.get(*pos).is_some_and(|s| s == "/") {
                *pos += 1;
                alts.push(seq(t, pos));
            }
            if alts.len() == 1 { alts.remove(0) } else { P::Choice(alts) }
        }

        fn seq(t: &[String], pos: &mut usize) -> P {
            let mut items = Vec::new();
            while let Some(tok) = t.get(*pos) {
                if tok == "/" || tok == ")" {
                    break;
                }
                items.push(prefixed(t, pos));
            }
            P::Seq(items)
        }

        fn prefixed(t: &[String], pos: &mut usize) -> P {
            if t[*pos] == "!" {
                *pos += 1;
                return P::Not(Box::new(suffixed(t, pos)));
            }
            if t[*pos] == "&" {
                *pos += 1;
                return P::And(Box::new(suffixed(t, pos)));
            }
            suffixed(t, pos)
        }

        fn suffixed(t: &[String], pos: &mut usize) -> P {
            let tok = t[*pos].clone();
            *pos += 1;
            let mut p = if tok == "(" {
                let inner = choice(t, pos);
                *pos += 1; // ')'
                inner
            } else if let Some(lit) = tok.strip_prefix('\'') {
                P::Lit(lit.trim_end_matches('\'').to_string())
            } else {
                let body: Vec<char> = tok[1..tok.len() - 1].chars().collect();
                let mut ranges = Vec::new();
                let mut i = 0;
                while i < body.len() {
                    if i + 2 < body.len() && body[i + 1] == '-' {
                        ranges.push((body[i], body[i + 2]));
                        i += 3;
                    } else {
                        ranges.push((body[i], body[i]));
                        i += 1;
                    }
                }
                P::Class(ranges)
            };
            while let Some(op) = t.get(*pos) {
                p = match op.as_str() {
                    "?" => P::Opt(Box::new(p)),
                    "*" => P::Star(Box::new(p)),
                    "+" => P::Plus(Box::new(p)),
                    _ => break,
                };
                *pos += 1;
            }
            p
        }

        fn run(p: &P, s: &[char], i: usize) -> Option<usize> {
            match p {
                P::Lit(l) => {
                    let l: Vec<char> = l.chars().collect();
                    (s.len() >= i + l.len() && s[i..i + l.len()] == l[..]).then_some(i + l.len())
                }
                P::Class(rs) => s.get(i).filter(|c| rs.iter().any(|(a, b)| (a..=b).contains(c))).map(|_| i + 1),
                P::Seq(items) => items.iter().try_fold(i, |at, item| run(item, s, at)),
                P::Choice(alts) => alts.iter().find_map(|a| run(a, s, i)),
                P::Opt(inner) => Some(run(inner, s, i).unwrap_or(i)),
                P::Star(inner) => {
                    let mut at = i;
                    while let Some(next) = run(inner, s, at) {
                        at = next;
                    }
                    Some(at)
                }
                P::Plus(inner) => {
                    let mut at = run(inner, s, i)?;
                    while let Some(next) = run(inner, s, at) {
                        at = next;
                    }
                    Some(at)
                }
                P::Not(inner) => run(inner, s, i).is_none().then_some(i),
                P::And(inner) => run(inner, s, i).map(|_| i),
            }
        }

        /// Whole-input match.
        pub fn accepts(rule: &str, input: &str) -> bool {
            let s: Vec<char> = input.chars().collect();
            run(&parse(rule), &s, 0) == Some(s.len())
        }
    }

    fn incl(lo: Option<f64>, hi: Option<f64>) -> Bounds {
        Bounds {
            lower: lo.map(|value| Bound { value, inclusive: true }),
            upper: hi.map(|value| Bound { value, inclusive: true }),
        }
    }

    #[test]
    fn split_matches_known_decompositions() {
        assert_eq!(split_to_ranges(0, 150), vec![(0, 9), (10, 99), (100, 149), (150, 150)]);
        assert_eq!(split_to_ranges(1, 5), vec![(1, 5)]);
        assert_eq!(split_to_ranges(18, 65), vec![(18, 19), (20, 59), (60, 65)]);
        assert_eq!(range_to_peg(100, 149), "'1' [0-4] [0-9]");
        assert_eq!(range_to_peg(150, 150), "'150'");
        assert_eq!(range_to_peg(10, 99), "[1-9] [0-9]");
    }

    #[test]
    fn int_terminal_is_exact_on_age() {
        let t = int_terminal(Bounds::closed(0.0, 150.0));
        assert_eq!(t.name, "int_ge0_le150");
        for v in 0..=150 {
            assert!(peg::accepts(&t.body, &v.to_string()), "{v} rejected by {}", t.body);
        }
        for bad in ["151", "200", "1500", "-1", "01", "00", "1.5", "15e1", ""] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn int_terminal_handles_negative_and_open_ends() {
        let t = int_terminal(incl(Some(-12.0), Some(7.0)));
        assert_eq!(t.name, "int_gem12_le7");
        for v in -12..=7 {
            assert!(peg::accepts(&t.body, &v.to_string()), "{v} rejected by {}", t.body);
        }
        for bad in ["-13", "8", "-0", "-"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }

        let t = int_terminal(incl(Some(18.0), None));
        assert_eq!(t.name, "int_ge18_any");
        for ok in ["18", "99", "100", "123456789"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["17", "0", "-20", "018"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }

        let t = int_terminal(incl(None, Some(-3.0)));
        for ok in ["-3", "-4", "-10", "-99999"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["-2", "0", "3"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn number_terminal_respects_exclusive_zero() {
        let b = Bounds {
            lower: Some(Bound { value: 0.0, inclusive: false }),
            upper: Some(Bound { value: 1_000_000.0, inclusive: true }),
        };
        let t = number_terminal(b);
        assert_eq!(t.name, "number_gt0_le1000000");
        for ok in ["0.5", "0.001", "1", "999999.99", "1000000", "1000000.000", "42"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["0", "0.0", "0.000", "-1", "1000000.5", "1000001", "1e3", "01"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn number_terminal_straddles_zero() {
        let t = number_terminal(Bounds {
            lower: Some(Bound { value: -5.0, inclusive: true }),
            upper: Some(Bound { value: 5.0, inclusive: false }),
        });
        assert_eq!(t.name, "number_gem5_lt5");
        for ok in ["-5", "-5.0", "-4.99", "0", "0.0", "4.999", "-0.5"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["-5.01", "5", "5.0", "-6"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn fractional_end_points_are_exact() {
        let t = number_terminal(Bounds::closed(0.5, 9.25));
        assert_eq!(t.name, "number_ge0p5_le9p25");
        for ok in ["0.5", "0.50", "0.6", "0.75", "1", "5.5", "9", "9.0", "9.2", "9.24999", "9.25", "9.2500"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["0", "0.0", "0.1", "0.4999", "9.251", "9.26", "9.3", "9.9", "10", "-0.5"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn fractional_end_points_on_both_sides_of_zero() {
        let t = number_terminal(Bounds {
            lower: Some(Bound { value: -2.5, inclusive: true }),
            upper: Some(Bound { value: 0.75, inclusive: false }),
        });
        for ok in ["-2.5", "-2.49", "-2", "-1.999", "-0.1", "0", "0.5", "0.7", "0.7499"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["-2.51", "-3", "-0", "0.75", "0.750", "0.8", "1"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn fractional_end_points_sharing_a_whole_part() {
        let t = number_terminal(Bounds::closed(3.25, 3.5));
        for ok in ["3.25", "3.250", "3.3", "3.4999", "3.5", "3.50"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["3", "3.0", "3.2", "3.2499", "3.51", "3.6", "4"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }

        let t = number_terminal(Bounds {
            lower: Some(Bound { value: 0.05, inclusive: false }),
            upper: Some(Bound { value: 0.1, inclusive: true }),
        });
        for ok in ["0.051", "0.06", "0.09999", "0.1", "0.100"] {
            assert!(peg::accepts(&t.body, ok), "{ok} rejected by {}", t.body);
        }
        for bad in ["0.05", "0.050", "0.0", "0.04", "0.101", "0.2"] {
            assert!(!peg::accepts(&t.body, bad), "{bad} accepted by {}", t.body);
        }
    }

    #[test]
    fn tags_round_trip() {
        let b = Bounds { lower: Some(Bound { value: -2.5, inclusive: false }), upper: None };
        assert_eq!(bound_tags(b), "gtm2p5_any");
        assert_eq!(parse_bound_tags("gtm2p5_any"), Some(b));
        assert_eq!(parse_bound_tags("ge0_le150"), Some(Bounds::closed(0.0, 150.0)));
        assert_eq!(parse_bound_tags("nonsense"), None);
    }
}
