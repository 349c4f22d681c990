/// Parses a display-formatted amount ("₹15,000", "Rs. 1,200.50", "$40") into
/// a number. Malformed input falls back to 0.0 so aggregates never see NaN.
pub fn parse_currency(raw: &str) -> f64 {
    let s = raw.trim();
    let negative = s.starts_with('-');

    // Skip the currency marker / prefix text; the number starts at the first
    // digit. "Rs." style prefixes carry a dot that must not be mistaken for a
    // decimal point.
    let Some(start) = s.find(|c: char| c.is_ascii_digit()) else {
        return 0.0;
    };

    let mut cleaned = String::new();
    for c in s[start..].chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' => {
                if cleaned.contains('.') {
                    // A second decimal point means the string is not an
                    // amount; fall back instead of guessing.
                    return 0.0;
                }
                cleaned.push(c);
            }
            // Thousands separators, including non-breaking spaces.
            ',' | ' ' | '\u{a0}' => {}
            _ => break,
        }
    }

    let value: f64 = match cleaned.parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };
    if negative {
        -value
    } else {
        value
    }
}
