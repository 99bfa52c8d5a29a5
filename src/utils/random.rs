use rand::{Rng, distr::Alphanumeric};

/// Generates a random alphanumeric string of the specified length.
///
/// Used for the temporary password handed out when an account is provisioned without one.
///
/// # Examples
///
/// ```
/// use university_portal::utils::random::generate_random_string;
///
/// let password = generate_random_string(12);
/// assert_eq!(password.len(), 12);
/// ```
pub fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string_is_alphanumeric() {
        let value = generate_random_string(32);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_strings_differ() {
        assert_ne!(generate_random_string(16), generate_random_string(16));
    }
}
