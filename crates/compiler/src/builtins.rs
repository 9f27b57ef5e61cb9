//! Built-in name table.
//!
//! A free symbol that survives resolution is either one of these
//! built-ins or a compile error. The mapping target is the descriptor
//! symbol exported by the runtime library and declared in `support.h`.

/// Map a surface symbol to its runtime descriptor symbol.
pub fn lookup(name: &str) -> Option<&'static str> {
    match name {
        "+" => Some("sup_builtin_add"),
        "-" => Some("sup_builtin_subtract"),
        "=" => Some("sup_builtin_equals"),
        "<" => Some("sup_builtin_less_than"),
        "or" => Some("sup_builtin_bitwise_or"),
        "and" => Some("sup_builtin_bitwise_and"),
        "prog-arg" => Some("sup_builtin_program_argument"),
        "str-to-num" => Some("sup_builtin_string_to_number"),
        "num-to-str" => Some("sup_builtin_number_to_string"),
        "put-str" => Some("sup_builtin_put_string"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_builtins() {
        assert_eq!(lookup("+"), Some("sup_builtin_add"));
        assert_eq!(lookup("prog-arg"), Some("sup_builtin_program_argument"));
        assert_eq!(lookup("put-str"), Some("sup_builtin_put_string"));
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(lookup("lambda"), None);
        assert_eq!(lookup("frobnicate"), None);
    }
}
