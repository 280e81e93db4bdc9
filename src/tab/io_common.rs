use log::warn;
use serde_json::Value as JSValue;
use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Identifiers for the rows of a file that does not provide them: `<file name>-<lineno>`.
pub fn make_default_id_lineno(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// The text of a scalar JSON value. Null, arrays and objects have none.
pub fn scalar_text(js: &JSValue) -> Option<String> {
    match js {
        JSValue::String(s) => Some(s.clone()),
        JSValue::Number(n) => Some(n.to_string()),
        JSValue::Bool(b) => Some(b.to_string()),
        JSValue::Null | JSValue::Array(_) | JSValue::Object(_) => None,
    }
}

/// The declared options of a question row.
///
/// Anything that is not a list means no options. The elements of the list that
/// have no text are dropped.
pub fn normalize_options(js: Option<&JSValue>) -> Vec<String> {
    match js {
        Some(JSValue::Array(elts)) => {
            let options: Vec<String> = elts.iter().filter_map(scalar_text).collect();
            if options.len() != elts.len() {
                warn!(
                    "normalize_options: dropped {} option(s) without text in {}",
                    elts.len() - options.len(),
                    JSValue::Array(elts.clone())
                );
            }
            options
        }
        Some(JSValue::Null) | None => vec![],
        Some(x) => {
            warn!("normalize_options: options are not a list: {}", x);
            vec![]
        }
    }
}
