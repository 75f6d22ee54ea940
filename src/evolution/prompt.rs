//! Minimal `{name}` template rendering for prompt files.
//!
//! Placeholders are `{identifier}`; `{{` and `}}` produce literal braces.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),
    #[error("unbalanced brace at byte {0}")]
    Unbalanced(usize),
}

/// Substitutes every placeholder from `args`.
pub fn render(template: &str, args: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    if inner == '{' {
                        return Err(TemplateError::Unbalanced(pos));
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(TemplateError::Unbalanced(pos));
                }
                let value = args
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, v)| *v)
                    .ok_or(TemplateError::UnknownPlaceholder(name))?;
                out.push_str(value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::Unbalanced(pos));
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Like [`render`], but never fails. A malformed template is logged and
/// only the known `{name}` placeholders are replaced; everything else is
/// sent verbatim.
pub fn render_lenient(template: &str, args: &[(&str, &str)]) -> String {
    match render(template, args) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Malformed prompt template, substituting known placeholders only"
            );
            args.iter().fold(template.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        }
    }
}

/// Renders with empty values; used to reject bad templates at load time.
pub fn check(template: &str, names: &[&str]) -> Result<(), TemplateError> {
    let args: Vec<(&str, &str)> = names.iter().map(|n| (*n, "")).collect();
    render(template, &args).map(|_| ())
}
