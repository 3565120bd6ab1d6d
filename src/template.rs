use crate::error::GenerateError;

/// Fill `{key}` placeholders in a prompt template.
///
/// `{{` and `}}` produce literal braces. A placeholder with no matching value
/// or a lone brace is reported against the template `name`, so a broken
/// template in the settings is easy to locate.
pub fn fill_template(
    name: &str,
    template: &str,
    values: &[(&str, &str)],
) -> Result<String, GenerateError> {
    let malformed = || GenerateError::MalformedTemplate {
        template: name.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(malformed()),
                        Some(k) => key.push(k),
                    }
                }
                let key = key.trim();
                let value = values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| GenerateError::MissingPlaceholder {
                        template: name.to_string(),
                        key: key.to_string(),
                    })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed()),
            other => out.push(other),
        }
    }

    Ok(out)
}
