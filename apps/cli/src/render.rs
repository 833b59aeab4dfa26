//! YAML rendering

use serde_json::Value;

const INDENT: &str = "  ";

/// Render `value` as a YAML document indented by two spaces.
pub fn indented_yaml(value: &Value) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(value)?;
    Ok(indent(&yaml))
}

fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + INDENT.len() * 8);
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str(INDENT);
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_document() {
        let value = json!({"Type": "Bucket", "Properties": {"Versioning": true}});
        assert_eq!(
            indented_yaml(&value).unwrap(),
            "  Type: Bucket\n  Properties:\n    Versioning: true\n"
        );
    }

    #[test]
    fn scalar_document() {
        assert_eq!(indented_yaml(&json!(3)).unwrap(), "  3\n");
    }

    #[test]
    fn blank_lines_stay_blank() {
        assert_eq!(indent("a\n\nb\n"), "  a\n\n  b\n");
    }
}
