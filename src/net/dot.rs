//! Graphviz 导出：库所画圆、迁移画方框、抑制弧用 `odot` 箭头。
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::net::definition::PetriNet;
use crate::net::structure::Marking;

impl PetriNet {
    /// Render the net with its initial marking.
    pub fn to_dot(&self) -> String {
        self.to_dot_with_marking(&self.initial_marking())
    }

    /// Render the net with an explicit marking, e.g. mid-run state.
    pub fn to_dot_with_marking(&self, marking: &Marking) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph \"{}\" {{", escape_label(&self.schema));
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for place in self.places.values() {
            let tokens = marking.0.get(place.offset).copied().unwrap_or(0);
            let bound = if place.unbounded() {
                "∞".to_string()
            } else {
                place.capacity.to_string()
            };
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\\n{}/{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place.offset.raw(),
                escape_label(&place.label),
                tokens,
                bound,
            );
        }

        for (idx, transition) in self.transitions.values().enumerate() {
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\\n{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                idx,
                escape_label(&transition.label),
                escape_label(&transition.role.label),
            );
        }

        for arc in &self.arcs {
            // 端点解析不出来的弧不出图，留给索引阶段报错
            let (Some(from), Some(to)) = (self.dot_node(&arc.source), self.dot_node(&arc.target))
            else {
                continue;
            };
            let mut attrs = Vec::new();
            if arc.weight > 1 {
                attrs.push(format!("label=\"{}\"", arc.weight));
            }
            if arc.inhibit {
                attrs.push("arrowhead=odot".to_string());
            }
            if attrs.is_empty() {
                let _ = writeln!(&mut dot, "    {} -> {};", from, to);
            } else {
                let _ = writeln!(&mut dot, "    {} -> {} [{}];", from, to, attrs.join(", "));
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    /// Write the rendered graph to `path`, creating parent directories.
    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        self.write_dot_with_marking(path, &self.initial_marking())
    }

    pub fn write_dot_with_marking<P: AsRef<Path>>(
        &self,
        path: P,
        marking: &Marking,
    ) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_dot_with_marking(marking))
    }

    fn dot_node(&self, label: &str) -> Option<String> {
        if let Some(place) = self.places.get(label) {
            return Some(format!("place_{}", place.offset.raw()));
        }
        self.transitions
            .get_index_of(label)
            .map(|idx| format!("trans_{}", idx))
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{NetMode, Position};

    #[test]
    fn dot_renders_nodes_weights_and_inhibitors() {
        let mut net = PetriNet::declare("dotted", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let stock = b.place("stock", 2, 5, Position::new(0, 0));
            let brake = b.place("brake", 1, 0, Position::new(0, 80));
            let ship = b.transition("ship", &role, Position::new(90, 0));
            stock.tx(b, 2, &ship);
            brake.guard(b, 1, &ship);
        });
        net.index().unwrap();

        let dot = net.to_dot();
        assert!(dot.contains("digraph \"dotted\""));
        assert!(dot.contains("place_0 [label=\"stock\\n2/5\""));
        assert!(dot.contains("place_1 [label=\"brake\\n1/∞\""));
        assert!(dot.contains("trans_0 [label=\"ship\\ndefault\""));
        assert!(dot.contains("label=\"2\""));
        assert!(dot.contains("arrowhead=odot"));
    }

    #[test]
    fn escape_label_quotes_specials() {
        assert_eq!(escape_label(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_label("a\\b"), "a\\\\b");
        assert_eq!(escape_label("plain"), "plain");
    }
}
