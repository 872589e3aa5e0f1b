use rand::Rng;
use crate::error::{Result, WalletError};

/// Characters used in the random suffix of generated idempotency keys
pub const KEY_CHARACTER_SET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random suffix of generated idempotency keys
pub const KEY_SUFFIX_LENGTH: usize = 16;

/// Generates a random alphanumeric string of the given length
pub fn random_alphanumeric(length: usize) -> Result<String> {
    if length == 0 {
        return Err(WalletError::InvalidAmount("length must be a positive integer".to_string()));
    }

    let mut rng = rand::thread_rng();
    let chars: Vec<char> = KEY_CHARACTER_SET.chars().collect();

    Ok((0..length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect())
}

/// Generates a client-side idempotency key of the form `<scope>-<unix millis>-<random>`.
/// One key is generated per user intent and reused for every retry of that intent.
pub fn generate_idempotency_key(scope: &str) -> Result<String> {
    let scope = scope.trim();
    if scope.is_empty() {
        return Err(WalletError::InvalidAmount("idempotency key scope must not be empty".to_string()));
    }
    let millis = chrono::Utc::now().timestamp_millis();
    Ok(format!("{}-{}-{}", scope, millis, random_alphanumeric(KEY_SUFFIX_LENGTH)?))
}

/// Formats a canonical value for display, e.g. `1,250 QAR`
pub fn format_qar(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push_str(" QAR");
    out
}

/// Formats a signed ledger delta with an explicit sign, e.g. `+50 QAR` / `-150 QAR`
pub fn format_delta(delta: i64) -> String {
    let sign = if delta < 0 { '-' } else { '+' };
    format!("{}{}", sign, format_qar(delta.unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_alphanumeric() {
        let part = random_alphanumeric(10).unwrap();
        assert_eq!(part.len(), 10);
        assert!(part.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(random_alphanumeric(0).is_err());
    }

    #[test]
    fn test_idempotency_keys_are_unique() {
        let a = generate_idempotency_key("purchase").unwrap();
        let b = generate_idempotency_key("purchase").unwrap();
        assert!(a.starts_with("purchase-"));
        assert_ne!(a, b);
        assert!(generate_idempotency_key("  ").is_err());
    }

    #[test]
    fn test_format_qar() {
        assert_eq!(format_qar(0), "0 QAR");
        assert_eq!(format_qar(150), "150 QAR");
        assert_eq!(format_qar(1250), "1,250 QAR");
        assert_eq!(format_qar(1_000_000), "1,000,000 QAR");
        assert_eq!(format_delta(-150), "-150 QAR");
        assert_eq!(format_delta(50), "+50 QAR");
    }
}
