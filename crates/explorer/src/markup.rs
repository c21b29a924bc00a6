//! Rich text labels for tree nodes
//!
//! Labels are small HTML fragments. Every piece of text that comes from the session is escaped
//! before it is embedded.
use std::borrow::Cow;

/// Colours and font used when building labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStyle {
    pub normal: String,
    pub string: String,
    pub number: String,
    pub builtin: String,
    pub comment: String,
    pub font_family: String,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            normal: "#ffffff".to_string(),
            string: "#b0e686".to_string(),
            number: "#faed5c".to_string(),
            builtin: "#fab16c".to_string(),
            comment: "#7f7f7f".to_string(),
            font_family: "Monospace".to_string(),
        }
    }
}

/// Escape text for embedding in an HTML fragment
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

pub fn thread_label(style: &RenderStyle, name: &str) -> String {
    format!(
        "<!-- ThreadItem --><b style=\"color:{}\">{}</b>",
        style.normal,
        escape(name)
    )
}

/// Label of the placeholder shown under a thread with no frames
pub fn idle_label() -> String {
    "<!-- LineFrameItem --><p>idle</p>".to_string()
}

pub fn frame_label(
    style: &RenderStyle,
    basename: &str,
    lineno: u32,
    context: &str,
    source_line: &str,
) -> String {
    let mut label = format!(
        "<!-- LineFrameItem --><p style=\"color:'{normal}';\"><b> \
         <span style=\"color:'{string}';\">{basename}</span>:\
         <span style=\"color:'{number}';\">{lineno}</span></b>",
        normal = style.normal,
        string = style.string,
        number = style.number,
        basename = escape(basename),
    );
    if !context.is_empty() {
        label.push_str(&format!(
            " (<span style=\"color:'{}';\">{}</span>)",
            style.builtin,
            escape(context)
        ));
    }
    label.push_str(&format!(
        "    <span style=\"font-family:{};color:'{}';font-size:50%;\"><em>{}</em></span></p>",
        escape(&style.font_family),
        style.comment,
        escape(source_line)
    ));
    label
}
