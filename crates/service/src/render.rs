//! Builtin notebook renderer.
//!
//! Used when nbconvert is not installed. The layout follows nbconvert's in
//! the one way that matters to the streamed view: a preamble, then one
//! top-level `div` per cell inside `<main>`.

use std::fmt::Write as _;

use nbsim_core::{escape_html, Cell, CellType, Notebook, Output};

/// Closing tags written after the last cell.
pub const DOCUMENT_CLOSE: &str = "</main></body></html>";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#fff;color:#222}\
main{max-width:960px;margin:0 auto;padding:1rem}\
.cell{margin:0.75rem 0}\
.cell-code pre{background:#f6f8fa;padding:0.5rem;overflow-x:auto}\
.prompt{color:#888;font-family:monospace;font-size:0.8rem}\
.output pre{margin:0;padding:0.25rem 0.5rem}\
.output-error pre{background:#fdd}";

#[must_use]
pub fn render_notebook(notebook: &Notebook) -> String {
    let title = notebook.title().unwrap_or_else(|| String::from("Notebook"));
    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n",
        escape_html(&title)
    );
    for cell in &notebook.cells {
        render_cell(&mut html, cell);
    }
    html.push_str(DOCUMENT_CLOSE);
    html
}

fn render_cell(html: &mut String, cell: &Cell) {
    let source = cell.source_text();
    match cell.cell_type {
        CellType::Markdown => {
            html.push_str("<div class=\"cell cell-markdown\">\n");
            render_markdown(html, &source);
            html.push_str("</div>\n");
        },
        CellType::Code => {
            html.push_str("<div class=\"cell cell-code\">\n");
            let prompt = cell.execution_count.map_or_else(|| String::from(" "), |n| n.to_string());
            let _ = write!(
                html,
                "<span class=\"prompt\">In [{prompt}]:</span>\n<pre><code class=\"language-python\">{}</code></pre>\n",
                escape_html(&source)
            );
            for output in cell.outputs.iter().flatten() {
                render_output(html, output);
            }
            html.push_str("</div>\n");
        },
        _ => {
            let _ = write!(
                html,
                "<div class=\"cell cell-raw\">\n<pre>{}</pre>\n</div>\n",
                escape_html(&source)
            );
        },
    }
}

fn render_markdown(html: &mut String, source: &str) {
    let mut paragraph: Vec<&str> = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&level) {
            flush_paragraph(html, &mut paragraph);
            let text = trimmed.get(level..).unwrap_or("").trim();
            let _ = writeln!(html, "<h{level}>{}</h{level}>", escape_html(text));
        } else if trimmed.is_empty() {
            flush_paragraph(html, &mut paragraph);
        } else {
            paragraph.push(trimmed);
        }
    }
    flush_paragraph(html, &mut paragraph);
}

fn flush_paragraph(html: &mut String, paragraph: &mut Vec<&str>) {
    if paragraph.is_empty() {
        return;
    }
    let _ = writeln!(html, "<p>{}</p>", escape_html(&paragraph.join(" ")));
    paragraph.clear();
}

fn render_output(html: &mut String, output: &Output) {
    match output.output_type.as_str() {
        "stream" => {
            let text = output.text.as_ref().map(|t| t.to_text()).unwrap_or_default();
            let _ = write!(
                html,
                "<div class=\"output output-stream\"><pre>{}</pre></div>\n",
                escape_html(&text)
            );
        },
        "error" => {
            let mut text = format!("{}: {}", output.ename, output.evalue);
            for line in &output.traceback {
                text.push('\n');
                text.push_str(line);
            }
            let _ = write!(
                html,
                "<div class=\"output output-error\"><pre>{}</pre></div>\n",
                escape_html(&text)
            );
        },
        _ => {
            html.push_str("<div class=\"output output-data\">");
            if let Some(png) = output.data.get("image/png") {
                let _ = write!(
                    html,
                    "<img src=\"data:image/png;base64,{}\">",
                    escape_html(png.to_text().trim())
                );
            } else if let Some(markup) = output.data.get("text/html") {
                // Trusted the same way nbconvert trusts notebook HTML outputs.
                html.push_str(&markup.to_text());
            } else if let Some(plain) = output.data.get("text/plain") {
                let _ = write!(html, "<pre>{}</pre>", escape_html(&plain.to_text()));
            }
            html.push_str("</div>\n");
        },
    }
}
