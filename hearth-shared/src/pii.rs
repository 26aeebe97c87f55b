use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for guest contact details and card data that masks its value in
/// `Debug`/`Display` output. Serialization passes the real value through, so
/// API responses still carry it while `tracing` fields never do.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Masked<String> {
    /// Last four characters prefixed with asterisks, e.g. `****4242`.
    pub fn last_four(&self) -> String {
        let chars: Vec<char> = self.0.chars().filter(|c| !c.is_whitespace()).collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("****{}", tail)
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_masked() {
        let email = Masked::from("guest@example.com");
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
    }

    #[test]
    fn test_serialize_passes_through() {
        let email = Masked::from("guest@example.com");
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"guest@example.com\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose(), "guest@example.com");
    }

    #[test]
    fn test_last_four() {
        let card = Masked::from("4242 4242 4242 4242");
        assert_eq!(card.last_four(), "****4242");
        assert_eq!(Masked::from("12").last_four(), "****12");
    }
}
