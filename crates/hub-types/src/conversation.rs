/// Separator between the two participant ids of a conversation key.
/// Never appears in a hyphenated UUID.
pub const SEPARATOR: char = '_';

/// Derive the conversation key shared by two users.
///
/// The ids are ordered byte-wise before joining, so the key is the same
/// whichever of the two users sent the message.
pub fn conversation_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}{SEPARATOR}{hi}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn order_independent() {
        for _ in 0..64 {
            let a = Uuid::new_v4().to_string();
            let b = Uuid::new_v4().to_string();
            assert_eq!(conversation_id(&a, &b), conversation_id(&b, &a));
        }
    }

    #[test]
    fn lower_id_comes_first() {
        let key = conversation_id("b2", "a1");
        assert_eq!(key, "a1_b2");
    }

    #[test]
    fn same_user_twice() {
        assert_eq!(conversation_id("abc", "abc"), "abc_abc");
    }

    #[test]
    fn uuid_keys_have_one_separator() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let key = conversation_id(&a, &b);
        assert_eq!(key.matches(SEPARATOR).count(), 1);
        assert_eq!(key.len(), a.len() + b.len() + 1);
    }
}
