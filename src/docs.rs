use crate::setting::Setting;
use crate::shape::{Shape, StructRef};
use std::{fs, path::Path};

struct DocRow {
    key: String,
    type_name: String,
    env: Option<&'static str>,
}

/// Markdown reference of every document key of `T`, its type and the
/// environment variable bound to it
pub fn docs<T: Setting>() -> String {
    let mut rows = Vec::new();
    if let Shape::Struct(root) = T::shape() {
        collect_rows("", &root, &mut rows);
    }

    let mut md = String::new();
    md.push_str("## Configuration Keys\n\n");
    md.push_str("| Key | Type | Environment Variable |\n");
    md.push_str("|-----|------|----------------------|\n");
    for row in &rows {
        md.push_str(&format!(
            "| `{}` | `{}` | {} |\n",
            row.key,
            row.type_name,
            row.env.map(|e| format!("`{}`", e)).unwrap_or_else(|| "-".to_string())
        ));
    }
    md
}

/// Writes [`docs`] to a markdown file
///
/// # Example
/// ```no_run
/// # #[derive(yaml_loadr::Setting)]
/// # struct Config { #[field(yaml = "port", env = "PORT")] pub port: u16 }
/// yaml_loadr::write_docs::<Config>("CONFIG.md").unwrap();
/// ```
pub fn write_docs<T: Setting>(path: impl AsRef<Path>) -> std::io::Result<()> {
    fs::write(path, docs::<T>())
}

fn collect_rows(prefix: &str, s: &StructRef, rows: &mut Vec<DocRow>) {
    for field in s.fields() {
        let (true, Some(tag), Some(shape)) = (field.exported, field.yaml, field.shape()) else {
            continue;
        };
        let key = if prefix.is_empty() {
            tag.to_string()
        } else {
            format!("{}.{}", prefix, tag)
        };
        rows.push(DocRow {
            key: key.clone(),
            type_name: shape.type_name(),
            env: field.env,
        });
        collect_nested(&key, &shape, rows);
    }
}

fn collect_nested(key: &str, shape: &Shape, rows: &mut Vec<DocRow>) {
    match shape.unwrap_pointers() {
        Shape::Struct(s) if !s.is_opaque() => collect_rows(key, s, rows),
        Shape::Seq(elem) | Shape::Array(elem, _) => collect_nested(&format!("{}[]", key), elem, rows),
        Shape::Map(_, value) => collect_nested(&format!("{}.<key>", key), value, rows),
        _ => {}
    }
}
