//! rustc-like snippet rendering for errors that carry a location.
//!
//! Only a small window (two lines before and after the error line) is kept, and very long
//! lines are cropped to `crop_radius` columns around the error column so that context lines
//! stay aligned with the error line.

use annotate_snippets::{
    AnnotationKind, Level, Renderer, Snippet as AnnotateSnippet, renderer::DecorStyle,
};

use crate::location::Location;

/// Render `msg` with a window of `text` around `location`.
///
/// Falls back to the plain `"{msg} at line L, column C"` form whenever the location does
/// not point into `text`.
#[cold]
#[inline(never)]
pub(crate) fn render(msg: &str, location: &Location, text: &str, crop_radius: usize) -> String {
    render_window(msg, location, text, crop_radius).unwrap_or_else(|| {
        format!(
            "{msg} at line {}, column {}",
            location.line(),
            location.column()
        )
    })
}

fn render_window(msg: &str, location: &Location, text: &str, crop_radius: usize) -> Option<String> {
    // Locations are relative to the BOM-stripped text.
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let row = location.line() as usize;
    let col = location.column() as usize;
    if row == 0 || col == 0 {
        return None;
    }

    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if row > lines.len() {
        return None;
    }

    let first_row = row.saturating_sub(2).max(1);
    let last_row = row.saturating_add(2).min(lines.len());

    let left_col = col.saturating_sub(crop_radius).max(1);
    let right_col = col.saturating_add(crop_radius);

    let mut window = String::new();
    let mut span = 0..0;
    for (idx, line) in lines[first_row - 1..last_row].iter().enumerate() {
        if idx > 0 {
            window.push('\n');
        }
        let cropped: String = line
            .chars()
            .skip(left_col - 1)
            .take(right_col + 1 - left_col)
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        if first_row + idx == row {
            let line_start = window.len();
            let caret_chars = col - left_col;
            let start = cropped
                .char_indices()
                .nth(caret_chars)
                .map(|(i, _)| i)
                .unwrap_or(cropped.len());
            let end = cropped[start..]
                .chars()
                .next()
                .map(|c| start + c.len_utf8())
                .unwrap_or(start);
            span = line_start + start..line_start + end;
        }
        window.push_str(&cropped);
    }

    let report = &[Level::ERROR
        .primary_title(format!("line {row} column {col}: {msg}"))
        .element(
            AnnotateSnippet::source(window.as_str())
                .line_start(first_row)
                .path("<input>")
                .fold(false)
                .annotation(AnnotationKind::Primary.span(span).label(msg)),
        )];

    // Plain ASCII decorations keep error strings stable and free of escape sequences.
    let renderer = Renderer::plain().decor_style(DecorStyle::Ascii);
    Some(renderer.render(report).to_string())
}
