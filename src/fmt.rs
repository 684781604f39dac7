use crate::models::CellValue;

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let with_commas = group_thousands(int_part);

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.chars().rev().collect()
}

/// Plain number with separators; integers print without decimals.
pub fn number(val: f64) -> String {
    let sign = if val < 0.0 { "-" } else { "" };
    let abs = val.abs();
    if abs.fract() == 0.0 {
        format!("{sign}{}", group_thousands(&format!("{abs:.0}")))
    } else {
        let s = format!("{abs}");
        let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), ""));
        format!("{sign}{}.{dec_part}", group_thousands(int_part))
    }
}

pub fn percent(val: f64) -> String {
    let s = format!("{val:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{s}%")
}

pub fn cell(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => s.clone(),
        CellValue::Number(v) => number(*v),
        CellValue::Currency(v) => money(*v),
        CellValue::Percentage(v) => percent(*v),
    }
}
