//! Port and wire naming utilities
//!
//! This module is the single source of truth for the names the engine
//! synthesizes when routing an XMR through the hierarchy. All passes use it
//! so that the port added to the target module, the pass-through ports on
//! intermediate modules, and the wire in the source module agree exactly.
//!
//! **Naming convention:** a reference `u_mid.u_bottom.counter` routes
//! through `__xmr__u_mid_u_bottom_counter`; array selects never take part
//! in the name (`u_sub.arr[3]` and `u_sub.arr[0]` share one port).

/// Prefix of every synthesized port/wire name
pub const PORT_PREFIX: &str = "__xmr__";

/// Synthesize the port name for an XMR path.
///
/// Dots, spaces, tabs, and newlines collapse to single underscores;
/// consecutive separators never produce empty parts, so the result is a
/// valid SystemVerilog identifier whenever the path segments are.
///
/// # Example
/// ```
/// use svbore_engine::naming::generate_port_name;
/// assert_eq!(generate_port_name("u_sub.sig"), "__xmr__u_sub_sig");
/// ```
pub fn generate_port_name(path: &str) -> String {
    let mut result = String::from(PORT_PREFIX);
    let mut last_was_underscore = true;
    for c in path.chars() {
        match c {
            '.' | ' ' | '\t' | '\n' => {
                if !last_was_underscore {
                    result.push('_');
                    last_was_underscore = true;
                }
            }
            _ => {
                result.push(c);
                last_was_underscore = false;
            }
        }
    }
    result
}

/// Strip every `[...]` subrange, leaving the identifier backbone.
///
/// # Example
/// ```
/// use svbore_engine::naming::extract_base_path;
/// assert_eq!(extract_base_path("u_sub.arr[3]"), "u_sub.arr");
/// ```
pub fn extract_base_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut depth = 0i32;
    for c in path.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }
    result
}

/// Concatenation of every `[...]` group in order.
///
/// Together with [`extract_base_path`], reassembling base + suffix is
/// equivalent to the original text up to whitespace inside brackets.
pub fn extract_array_suffix(path: &str) -> String {
    let mut suffix = String::new();
    let mut depth = 0i32;
    for c in path.chars() {
        match c {
            '[' => {
                depth += 1;
                suffix.push(c);
            }
            ']' => {
                suffix.push(c);
                depth -= 1;
            }
            _ if depth > 0 => suffix.push(c),
            _ => {}
        }
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_port_name() {
        assert_eq!(generate_port_name("u_sub.sig"), "__xmr__u_sub_sig");
        assert_eq!(
            generate_port_name("u_l1.u_l2.u_l3.deep"),
            "__xmr__u_l1_u_l2_u_l3_deep"
        );
    }

    #[test]
    fn test_separator_runs_collapse() {
        // Whitespace around dots must not create empty parts
        assert_eq!(generate_port_name("u_sub . sig"), "__xmr__u_sub_sig");
        assert_eq!(generate_port_name("a \t. b"), "__xmr__a_b");
    }

    #[test]
    fn test_name_is_a_homomorphism_of_concatenation() {
        let left = "u_mid";
        let right = "u_bottom.counter";
        let joined = format!("{}.{}", left, right);
        let expected = format!(
            "{}_{}",
            generate_port_name(left),
            &generate_port_name(right)[PORT_PREFIX.len()..]
        );
        assert_eq!(generate_port_name(&joined), expected);
    }

    #[test]
    fn test_extract_base_path() {
        assert_eq!(extract_base_path("u_sub.arr[3]"), "u_sub.arr");
        assert_eq!(extract_base_path("u_sub.arr[3][2:0]"), "u_sub.arr");
        assert_eq!(extract_base_path("no_selects"), "no_selects");
    }

    #[test]
    fn test_extract_array_suffix() {
        assert_eq!(extract_array_suffix("u_sub.arr[3]"), "[3]");
        assert_eq!(extract_array_suffix("u_sub.arr[3][7:4]"), "[3][7:4]");
        assert_eq!(extract_array_suffix("plain.sig"), "");
    }

    #[test]
    fn test_base_plus_suffix_recomposes() {
        let text = "u_sub.mem[idx][7:0]";
        let recomposed = format!("{}{}", extract_base_path(text), extract_array_suffix(text));
        assert_eq!(recomposed, text);
    }

    #[test]
    fn test_selects_never_reach_the_port_name() {
        let base = extract_base_path("u_sub.arr[3]");
        assert_eq!(generate_port_name(&base), "__xmr__u_sub_arr");
    }
}
