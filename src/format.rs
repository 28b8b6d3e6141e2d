use crate::{
    error::{
        Error,
        Result,
    },
    pools::MIST_PER_SUI,
    tickets::QUOTE_SCALE,
};
use chrono::{
    Local,
    TimeZone,
};
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

const SUI_DECIMALS: u32 = 9;
const QUOTE_DECIMALS: u32 = 4;

/// `Xh Ym Zs`, dropping leading zero units; `Expired` once nothing is left.
pub fn format_duration(ms: u64) -> String {
    if ms == 0 {
        return "Expired".to_string();
    }
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Fixed-point `units` at `scale` rendered with at most `max_fraction` digits.
fn format_fixed(units: u64, scale: u64, decimals: u32, max_fraction: u32) -> String {
    let step = 10u64.pow(decimals - max_fraction);
    let rounded = units.saturating_add(step / 2) / step;
    let shown_scale = scale / step;
    let whole = rounded / shown_scale;
    let fraction = rounded % shown_scale;
    let mut out = group_thousands(whole);
    if fraction > 0 {
        let digits = format!("{fraction:0width$}", width = max_fraction as usize);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

pub fn format_sui(mist: u64) -> String {
    format!("{} SUI", format_fixed(mist, MIST_PER_SUI, SUI_DECIMALS, 4))
}

/// Two fraction digits, as pots are shown in lists.
pub fn format_pot(mist: u64) -> String {
    format_fixed(mist, MIST_PER_SUI, SUI_DECIMALS, 2)
}

pub fn format_quote(quote: f64) -> String {
    let raw = crate::tickets::quote_to_raw(quote);
    format!("${}", format_fixed(raw, QUOTE_SCALE, QUOTE_DECIMALS, QUOTE_DECIMALS))
}

pub fn format_time(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn parse_fixed(input: &str, decimals: u32, what: &str) -> Result<u64> {
    let raw = input.trim();
    let invalid = || Error::invalid_input(format!("'{input}' is not a valid {what}"));
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(Error::invalid_input(format!(
            "{what} supports at most {decimals} decimal places"
        )));
    }
    let scale = 10u64.pow(decimals);
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };
    let value = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| Error::invalid_input(format!("{what} is too large")))?;
    if value == 0 {
        return Err(Error::invalid_input(format!("{what} must be greater than zero")));
    }
    Ok(value)
}

/// Decimal SUI amount to mist, without going through floating point.
pub fn parse_sui_amount(input: &str) -> Result<u64> {
    parse_fixed(input, SUI_DECIMALS, "SUI amount")
}

/// Price guess (`4.7`, `$4.7`) in on-chain fixed point.
pub fn parse_quote(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    parse_fixed(trimmed.strip_prefix('$').unwrap_or(trimmed), QUOTE_DECIMALS, "quote")
}

/// Truncates to `max` terminal columns, marking the cut with `…`.
pub fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// `0x5a91…2193`
pub fn short_address(address: &str) -> String {
    if address.len() <= 14 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
