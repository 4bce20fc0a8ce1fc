//! String normalization shared by the server and the browser controller.

/// Latest slot a rounded time may land on.
const LAST_SLOT_MINUTES: u32 = 23 * 60 + 30;

/// Lowercases an origin and strips a single trailing `/`.
pub fn normalize_origin(origin: &str) -> String {
    let lower = origin.trim().to_lowercase();
    match lower.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Compares an allow-list entry with a request origin.
pub fn origin_matches(allowed: &str, origin: &str) -> bool {
    normalize_origin(allowed) == normalize_origin(origin)
}

/// Rounds an `HH:MM` time to the nearest half hour.
///
/// Ties round down, so `09:15` becomes `09:00` and `09:16` becomes `09:30`.
/// Values that do not start with two numeric `:`-separated parts are
/// returned unchanged, and results never pass `23:30`.
///
/// # Example
///
/// ```
/// use intake_core::normalize::round_to_half_hour;
///
/// assert_eq!(round_to_half_hour("09:15"), "09:00");
/// assert_eq!(round_to_half_hour("09:16"), "09:30");
/// assert_eq!(round_to_half_hour("10:30"), "10:30");
/// ```
pub fn round_to_half_hour(value: &str) -> String {
    let mut parts = value.split(':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return value.to_string();
    };
    let (Ok(hours), Ok(minutes)) = (hours.trim().parse::<u32>(), minutes.trim().parse::<u32>())
    else {
        return value.to_string();
    };

    let total = hours.saturating_mul(60).saturating_add(minutes);
    let rounded = (total.saturating_add(14) / 30 * 30).min(LAST_SLOT_MINUTES);

    format!("{:02}:{:02}", rounded / 60, rounded % 60)
}

/// Rewrites a local phone number with a leading `0` into international form.
///
/// `0412 345 678` with country code `61` becomes `+61412345678`. Leading
/// whitespace is ignored when looking for the `0`. Numbers that do not start
/// with `0` are returned unchanged.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    match phone.trim().strip_prefix('0') {
        Some(rest) => {
            let digits: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
            format!("+{country_code}{digits}")
        },
        None => phone.to_string(),
    }
}

/// Loose shape check for an email address: `local@domain.tld`.
pub fn is_plausible_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
