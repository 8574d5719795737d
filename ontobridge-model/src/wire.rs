//! Statement wire format.
//!
//! Each statement is one line `<subject>\t<predicate>\t<object> .`; an entity's
//! statements end with a blank line. Batches sent to the remote store start
//! with [`PREFIX_DECLARATION`].

/// Namespace prefix declaration that heads every batch.
pub const PREFIX_DECLARATION: &str = "@prefix xsd:     <http://www.w3.org/2001/XMLSchema#> .\n\n";

/// Predicate of the geolocation statement.
pub const GEO_POSITION_PREDICATE: &str = "http://www.opengis.net/gml/pos";

/// Declares the class of `subject`.
pub fn class_statement(subject: &str, class: &str) -> String {
    format!("<{subject}>\ta\t<{class}> .\n")
}

/// Links `subject` to another entity.
pub fn object_statement(subject: &str, predicate: &str, target: &str) -> String {
    format!("<{subject}>\t<{predicate}>\t<{target}> .\n")
}

/// Attaches an already rendered literal (see [`literal`]) to `subject`.
pub fn data_statement(subject: &str, predicate: &str, literal: &str) -> String {
    format!("<{subject}>\t<{predicate}>\t{literal} .\n")
}

/// Renders a quoted, type-suffixed literal, escaping the lexical form.
pub fn literal(lexical: &str, xsd_type: &str) -> String {
    format!("\"{}\"^^{xsd_type}", escape(lexical))
}

/// Terminates an entity's statement block.
pub const ENTITY_TERMINATOR: &str = "\n";

fn escape(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    for c in lexical.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
