use chrono::{DateTime, Utc};

/// Two decimals with comma grouping, e.g. `10,000,000.00`. Missing or non-finite prices show as `0.00`.
pub fn format_price(price: Option<f64>) -> String {
    let price = match price {
        Some(p) if p.is_finite() => p,
        _ => return "0.00".to_string(),
    };
    let fixed = format!("{:.2}", price);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}{}.{}", sign, grouped, fraction)
}

/// `MM/DD/YYYY`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%m/%d/%Y").to_string()
}

/// `MM/DD/YYYY, hh:mm AM`
pub fn format_date_time(at: DateTime<Utc>) -> String {
    at.format("%m/%d/%Y, %I:%M %p").to_string()
}
