/// Replace `${ENV_VAR}` placeholders in a raw config string.
///
/// Unknown variables and malformed placeholders are left as-is so parse
/// errors point at the original text.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }
        chars.next(); // consume '{'

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        match (closed && !name.is_empty()).then(|| std::env::var(&name).ok()).flatten() {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("${");
                out.push_str(&name);
                if closed {
                    out.push('}');
                }
            },
        }
    }

    out
}
