/// The dynamic value carried through pipeline configs, step outputs, and
/// templates: string / number / bool / sequence / mapping / null.
///
/// `serde_json::Value` already is exactly this sum type, so we reuse it
/// rather than hand-rolling an equivalent enum. Plugin config, context
/// reads/writes, and template resolution all speak `ConfigValue`.
pub type ConfigValue = serde_json::Value;

/// Truthiness used by the `if_else` control-flow primitive (see
/// `mimir-plugin`): empty, `"0"`, `"false"`, and `"null"` are false,
/// everything else is true. Operates on the string form of a resolved value.
pub fn is_truthy_str(s: &str) -> bool {
    !matches!(s, "" | "0" | "false" | "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_cases() {
        assert!(!is_truthy_str(""));
        assert!(!is_truthy_str("0"));
        assert!(!is_truthy_str("false"));
        assert!(!is_truthy_str("null"));
        assert!(is_truthy_str("1"));
        assert!(is_truthy_str("true"));
        assert!(is_truthy_str("anything"));
    }
}
