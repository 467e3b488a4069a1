//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---

/// Import paths declared in a schema source, in declaration order.
///
/// This is a line scanner, not a parser: only lines whose first token is
/// `import` are inspected, optionally followed by `public` or `weak`, then a
/// double-quoted path.
pub fn scan_imports(source: &str) -> Vec<String> {
    source.lines().filter_map(parse_import_line).collect()
}

fn parse_import_line(line: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix("import")?;
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '"') {
        return None;
    }
    let mut rest = rest.trim_start();
    for modifier in ["public", "weak"] {
        if let Some(stripped) = rest.strip_prefix(modifier) {
            if stripped.starts_with(char::is_whitespace) {
                rest = stripped.trim_start();
                break;
            }
        }
    }
    let quoted = rest.strip_prefix('"')?;
    let end = quoted.find('"')?;
    let path = &quoted[..end];
    (!path.is_empty()).then(|| path.to_owned())
}
