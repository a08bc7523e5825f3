/// Shown wherever a count or rating is unavailable.
pub const PLACEHOLDER: &str = "-";

const THOUSAND: u64 = 1_000;
const MILLION: u64 = 1_000_000;
const BILLION: u64 = 1_000_000_000;

/// Compact a ratings count: `1234` → `1.23K`, `150000000` → `150M`.
/// `None` renders as the placeholder dash.
pub fn compact(count: Option<u64>) -> String {
    match count {
        Some(n) => compact_count(n),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn compact_count(n: u64) -> String {
    let (unit, suffix) = match n {
        n if n >= BILLION => (BILLION, "B"),
        n if n >= MILLION => (MILLION, "M"),
        n if n >= THOUSAND => (THOUSAND, "K"),
        n => return n.to_string(),
    };

    // Three tiers per unit: integer at >=100, one decimal at >=10, else two.
    let decimals = if n >= 100 * unit {
        0
    } else if n >= 10 * unit {
        1
    } else {
        2
    };

    format!("{}{}", fixed(n, unit, decimals), suffix)
}

/// `n / unit` to `decimals` places, rounding halves up on the exact decimal
/// value. Binary floating point would round `1005` to `1.00K`; this gives `1.01K`.
fn fixed(n: u64, unit: u64, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let unit = unit as u128;
    let scaled = (n as u128 * scale * 2 + unit) / (unit * 2);

    if decimals == 0 {
        return scaled.to_string();
    }
    format!(
        "{}.{:0width$}",
        scaled / scale,
        scaled % scale,
        width = decimals as usize
    )
}
