use crate::types::{Attribute, Node};
use std::fmt::{self, Write};

/// Deterministic tree serialization for tests comparing a virtual tree with a
/// materialized surface. Not a stable format.
///
/// Equivalence rules:
/// - Node kinds, element tags and text values must match.
/// - Child order is significant.
/// - Attributes are compared as a set keyed by name (sorted before rendering);
///   handler payloads are not rendered, only their event name.
/// - Node ids and handler ids can be ignored by options.
#[derive(Clone, Copy, Debug)]
pub struct DomSnapshotOptions {
    pub ignore_ids: bool,
    pub ignore_handler_ids: bool,
}

impl Default for DomSnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_ids: true,
            ignore_handler_ids: true,
        }
    }
}

#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new<M>(root: &Node<M>, options: DomSnapshotOptions) -> Self {
        let mut lines = Vec::new();
        walk_snapshot(root, &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// First differing line between two snapshots.
#[derive(Debug)]
pub struct DomMismatch {
    line: usize,
    expected: Option<String>,
    actual: Option<String>,
    expected_tree: String,
    actual_tree: String,
}

impl fmt::Display for DomMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tree mismatch at line {}", self.line + 1)?;
        writeln!(f, "expected: {}", self.expected.as_deref().unwrap_or("<end>"))?;
        writeln!(f, "actual:   {}", self.actual.as_deref().unwrap_or("<end>"))?;
        writeln!(f, "expected tree:\n{}", self.expected_tree)?;
        writeln!(f, "actual tree:\n{}", self.actual_tree)?;
        Ok(())
    }
}

impl std::error::Error for DomMismatch {}

pub fn compare_trees<A, B>(
    expected: &Node<A>,
    actual: &Node<B>,
    options: DomSnapshotOptions,
) -> Result<(), Box<DomMismatch>> {
    let expected = DomSnapshot::new(expected, options);
    let actual = DomSnapshot::new(actual, options);
    let len = expected.lines.len().max(actual.lines.len());
    for line in 0..len {
        let e = expected.lines.get(line);
        let a = actual.lines.get(line);
        if e != a {
            return Err(Box::new(DomMismatch {
                line,
                expected: e.cloned(),
                actual: a.cloned(),
                expected_tree: expected.render(),
                actual_tree: actual.render(),
            }));
        }
    }
    Ok(())
}

pub fn assert_same_shape<A, B>(expected: &Node<A>, actual: &Node<B>, options: DomSnapshotOptions) {
    if let Err(mismatch) = compare_trees(expected, actual, options) {
        panic!("{mismatch}");
    }
}

fn walk_snapshot<M>(
    node: &Node<M>,
    options: &DomSnapshotOptions,
    depth: usize,
    out: &mut Vec<String>,
) {
    let mut line = "  ".repeat(depth);
    match node {
        Node::Element {
            id,
            tag,
            attributes,
            children,
        } => {
            let _ = write!(&mut line, "<{tag}");
            if !options.ignore_ids {
                let _ = write!(&mut line, " #{id}");
            }
            let mut rendered: Vec<String> = attributes
                .iter()
                .map(|attr| render_attribute(attr, options))
                .collect();
            rendered.sort();
            for attr in rendered {
                line.push(' ');
                line.push_str(&attr);
            }
            line.push('>');
            out.push(line);
            for child in children {
                walk_snapshot(child, options, depth + 1, out);
            }
        }
        Node::Text { id, text } => {
            let _ = write!(&mut line, "{text:?}");
            if !options.ignore_ids {
                let _ = write!(&mut line, " #{id}");
            }
            out.push(line);
        }
    }
}

fn render_attribute<M>(attr: &Attribute<M>, options: &DomSnapshotOptions) -> String {
    match attr {
        Attribute::Plain { name, value } => format!("{name}={value:?}"),
        Attribute::Handler(handler) if options.ignore_handler_ids => {
            format!("on{}", handler.event)
        }
        Attribute::Handler(handler) => format!("on{}[{}]", handler.event, handler.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{element, text};

    #[test]
    fn snapshot_sorts_attributes_and_indents_children() {
        let tree: Node<()> = element("div")
            .attr("z", "1")
            .attr("a", "2")
            .on("click", ())
            .child(text("hi"))
            .build();
        let snapshot = DomSnapshot::new(&tree, DomSnapshotOptions::default());
        assert_eq!(
            snapshot.as_lines(),
            &["<div a=\"2\" onclick z=\"1\">".to_string(), "  \"hi\"".to_string()]
        );
    }

    #[test]
    fn compare_reports_first_mismatch() {
        let a: Node<()> = element("div").child(text("one")).build();
        let b: Node<u8> = element("div").child(text("two")).build();
        let err = compare_trees(&a, &b, DomSnapshotOptions::default()).expect_err("mismatch");
        assert!(err.to_string().contains("line 2"));
    }
}
