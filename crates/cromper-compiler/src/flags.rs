//! Compiler flag hygiene.

/// Flags that take the following token (or a glued suffix) as their argument.
const SKIP_FLAGS_WITH_ARGS: &[&str] = &["-B", "-I", "-U"];

/// Flags already baked into the command templates.
const SKIP_FLAGS: &[&str] = &["-ffreestanding", "-non_shared", "-Xcpluscomm", "-Wab,-r4300_mul", "-c"];

/// Strip infrastructure-only flags before they are stored or redisplayed.
pub fn filter_compiler_flags(compiler_flags: &str) -> String {
    let mut flags = Vec::new();
    let mut skip_next = false;
    for flag in compiler_flags.split_whitespace() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if SKIP_FLAGS.contains(&flag) {
            continue;
        }
        if SKIP_FLAGS_WITH_ARGS.contains(&flag) {
            skip_next = true;
            continue;
        }
        if SKIP_FLAGS_WITH_ARGS.iter().any(|f| flag.starts_with(f)) {
            continue;
        }
        flags.push(flag);
    }
    flags.join(" ")
}

/// Shell-quote each whitespace separated option so `${COMPILER_FLAGS}` can be
/// expanded unquoted in a template without further word splitting surprises.
pub fn quote_options(options: &str) -> String {
    options
        .split_whitespace()
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    let safe = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_strips_flag_and_glued_argument() {
        assert_eq!(filter_compiler_flags("-O2 -Bfoo -g"), "-O2 -g");
    }

    #[test]
    fn test_filter_strips_flag_and_separate_argument() {
        assert_eq!(filter_compiler_flags("-I/inc -U M -O2"), "-O2");
    }

    #[test]
    fn test_filter_strips_baked_in_flags() {
        assert_eq!(
            filter_compiler_flags("-c -O2 -non_shared -Xcpluscomm -Wab,-r4300_mul -ffreestanding -mips2"),
            "-O2 -mips2"
        );
        assert_eq!(filter_compiler_flags("   "), "");
    }

    #[test]
    fn test_quote_options() {
        assert_eq!(quote_options("-O2  -g3"), "-O2 -g3");
        assert_eq!(quote_options("-DNAME=\"x y\""), r#"'-DNAME="x' 'y"'"#);
        assert_eq!(quote_options("-D'Q'"), r#"'-D'"'"'Q'"'"''"#);
        assert_eq!(quote_options("-isystem/libs/directx/8.0/win32/include"), "-isystem/libs/directx/8.0/win32/include");
        assert_eq!(quote_options("$(reboot)"), "'$(reboot)'");
    }
}
