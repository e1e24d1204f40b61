//! SVG serialization of a frame's settled state.

use std::fmt::Write;

use super::frame::{Frame, NodeFrame};
use super::layout::Canvas;
use crate::tooltip::IDLE_TEXT;

pub const DARK_MODE_CLASS: &str = "dark-Mode";

/// Tooltip built from the node's static description.
#[must_use]
pub fn static_title(node: &NodeFrame) -> String {
    node.description
        .clone()
        .unwrap_or_else(|| IDLE_TEXT.to_string())
}

/// Renders where every node and link ends up once `frame` has played.
/// `title` supplies each node's tooltip text.
#[must_use]
pub fn render_svg(
    frame: &Frame,
    canvas: &Canvas,
    dark_mode: bool,
    title: &dyn Fn(&NodeFrame) -> String,
) -> String {
    let mut out = String::new();
    let class = if dark_mode {
        format!(r#" class="{DARK_MODE_CLASS}""#)
    } else {
        String::new()
    };
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}"{class}>"#,
        canvas.width, canvas.height
    );
    let _ = write!(
        out,
        r#"<g transform="translate({},{})">"#,
        canvas.margin.left, canvas.margin.top
    );

    // Links go first so nodes paint over them.
    for link in frame.settled_links() {
        let _ = write!(out, r#"<path class="link" d="{}"/>"#, link.path.to.path());
    }

    for node in frame.settled_nodes() {
        let at = node.position.to;
        let _ = write!(
            out,
            r#"<g class="node" data-id="{}" transform="translate({},{})">"#,
            node.id, at.y, at.x
        );
        let _ = write!(
            out,
            r#"<circle r="{}" style="fill: {}"/>"#,
            node.radius.to,
            node.fill.css()
        );
        match node.url.as_deref() {
            Some(url) => {
                let _ = write!(
                    out,
                    r#"<a target="_blank" xlink:href="{}">"#,
                    escape(url)
                );
            }
            None => out.push_str(r#"<a target="_blank">"#),
        }
        let _ = write!(
            out,
            r#"<text x="{}" dy=".35em" text-anchor="{}" style="fill-opacity: {}">{}</text></a>"#,
            node.label.dx,
            node.label.anchor.as_str(),
            node.label_opacity.to,
            escape(&node.name)
        );
        let _ = write!(out, "<title>{}</title></g>", escape(&title(node)));
    }

    out.push_str("</g></svg>");
    out
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use arf_model::ToolNode;

    use crate::tree::TreeView;

    fn view() -> TreeView {
        TreeView::new(ToolNode::new("OSINT").with_children(vec![
            ToolNode::new("Search <Engines>").with_children(vec![ToolNode::new("Google")]),
            ToolNode::new("Shodan")
                .with_url("https://www.shodan.io/")
                .with_description("IoT & banner search"),
        ]))
    }

    #[test]
    fn renders_nodes_links_and_tooltips() {
        let mut view = view();
        let frame = view.render();
        let svg = view.to_svg(&frame);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</g></svg>"));
        assert_eq!(svg.matches(r#"class="node""#).count(), 3);
        assert_eq!(svg.matches(r#"class="link""#).count(), 2);
        assert!(svg.contains("Search &lt;Engines&gt;"));
        assert!(svg.contains(r#"xlink:href="https://www.shodan.io/""#));
        assert!(svg.contains("<title>IoT &amp; banner search</title>"));
        assert!(svg.contains("style=\"fill: lightsteelblue\""));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(!svg.contains("dark-Mode"));
    }

    #[test]
    fn dark_mode_marks_the_root_element() {
        let mut view = view();
        view.toggle_dark_mode();
        let frame = view.render();
        let svg = view.to_svg(&frame);
        assert!(svg.contains(r#"class="dark-Mode""#));
    }

    #[test]
    fn exiting_nodes_are_left_out() {
        let mut view = view();
        view.render();
        let search = view.root().branch().children()[0].id().expect("id");
        view.click(search).expect("expand");
        let frame = view.click(search).expect("collapse");
        let svg = view.to_svg(&frame);
        assert!(!svg.contains(">Google<"));
    }
}
