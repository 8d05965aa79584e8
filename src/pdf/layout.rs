use std::collections::HashMap;

use pdf_writer::{Content, Name, Str};

use crate::fonts::FontEntry;
use crate::model::{Alignment, Arrangement, Block, FontRole, Rgb, Run, TextBlock, TextStyle};

use super::FontTable;
use super::table;

pub(super) struct WordChunk {
    pub(super) font: FontRole,
    pub(super) text: String,
    pub(super) font_size: f32,
    pub(super) color: Rgb,
    pub(super) x_offset: f32, // x relative to line start
    pub(super) width: f32,
}

pub(super) struct TextLine {
    pub(super) chunks: Vec<WordChunk>,
    pub(super) total_width: f32,
}

fn finish_line(chunks: &mut Vec<WordChunk>) -> TextLine {
    let total_width = chunks.last().map(|c| c.x_offset + c.width).unwrap_or(0.0);
    TextLine {
        chunks: std::mem::take(chunks),
        total_width,
    }
}

/// Layout runs into wrapped lines.
/// No space is inserted between runs unless the preceding text ended with
/// whitespace or the new run starts with whitespace. Consecutive words in the
/// same font are merged into one chunk so each phrase is shown as one string.
pub(super) fn build_lines(
    runs: &[Run],
    style: &TextStyle,
    fonts: &FontTable,
    max_width: f32,
) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_chunks: Vec<WordChunk> = Vec::new();
    let mut current_x: f32 = 0.0;
    let mut prev_ended_with_ws = false;
    let mut prev_space_w: f32 = 0.0;
    let font_size = style.font_size;

    for run in runs {
        if run.line_break {
            lines.push(finish_line(&mut current_chunks));
            current_x = 0.0;
            prev_ended_with_ws = false;
            continue;
        }

        let role = if run.emphasis {
            FontRole::Emphasis
        } else {
            style.font
        };
        let entry = fonts.get(role);
        let space_w = entry.space_width(font_size);
        let starts_with_ws = run.text.starts_with(char::is_whitespace);

        for (i, word) in run.text.split_whitespace().enumerate() {
            for (j, piece) in split_long_word(word, entry, font_size, max_width)
                .into_iter()
                .enumerate()
            {
                let ww = entry.word_width(piece, font_size);

                let need_space = j == 0
                    && !current_chunks.is_empty()
                    && (i > 0 || starts_with_ws || prev_ended_with_ws);

                // The space belongs to whichever run holds the whitespace character
                let effective_space_w = if i > 0 || starts_with_ws {
                    space_w
                } else {
                    prev_space_w
                };

                let proposed_x = if need_space {
                    current_x + effective_space_w
                } else {
                    current_x
                };

                let wrapped =
                    !current_chunks.is_empty() && (j > 0 || proposed_x + ww > max_width);
                if wrapped {
                    lines.push(finish_line(&mut current_chunks));
                    current_x = 0.0;
                } else {
                    current_x = proposed_x;
                }

                match current_chunks.last_mut() {
                    Some(prev) if !wrapped && prev.font == role && prev.color == style.color => {
                        if need_space {
                            prev.text.push(' ');
                        }
                        prev.text.push_str(piece);
                        prev.width = current_x + ww - prev.x_offset;
                    }
                    _ => current_chunks.push(WordChunk {
                        font: role,
                        text: piece.to_string(),
                        font_size,
                        color: style.color,
                        x_offset: current_x,
                        width: ww,
                    }),
                }
                current_x += ww;
            }
        }

        if !run.text.is_empty() {
            prev_ended_with_ws = run.text.ends_with(char::is_whitespace);
            prev_space_w = space_w;
        }
    }

    if !current_chunks.is_empty() || lines.is_empty() {
        lines.push(finish_line(&mut current_chunks));
    }
    lines
}

/// Break a word wider than `max_width` at character boundaries. Every piece
/// holds at least one character.
fn split_long_word<'w>(
    word: &'w str,
    entry: &FontEntry,
    font_size: f32,
    max_width: f32,
) -> Vec<&'w str> {
    if entry.word_width(word, font_size) <= max_width {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut width = 0.0;
    for (idx, ch) in word.char_indices() {
        let cw = entry.char_width_1000(ch) * font_size / 1000.0;
        if idx > start && width + cw > max_width {
            pieces.push(&word[start..idx]);
            start = idx;
            width = 0.0;
        }
        width += cw;
    }
    pieces.push(&word[start..]);
    pieces
}

/// Draw pre-built lines with the given alignment, one `BT`/`ET` pair per line.
pub(super) fn paint_lines(
    content: &mut Content,
    lines: &[TextLine],
    alignment: Alignment,
    x: f32,
    width: f32,
    first_baseline_y: f32,
    leading: f32,
    fonts: &FontTable,
) {
    let mut current_color: Option<Rgb> = None;
    let mut current_font: Option<(FontRole, f32)> = None;

    content.save_state();
    for (line_num, line) in lines.iter().enumerate() {
        if line.chunks.is_empty() {
            continue;
        }
        let y = first_baseline_y - line_num as f32 * leading;
        let line_start_x = match alignment {
            Alignment::Center => x + (width - line.total_width) / 2.0,
            Alignment::Right => x + width - line.total_width,
            Alignment::Left => x,
        };

        content.begin_text();
        let mut td_x = 0.0_f32;
        let mut td_y = 0.0_f32;
        for chunk in &line.chunks {
            if current_color != Some(chunk.color) {
                let [r, g, b] = chunk.color;
                content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
                current_color = Some(chunk.color);
            }

            let entry = fonts.get(chunk.font);
            if current_font != Some((chunk.font, chunk.font_size)) {
                content.set_font(Name(entry.pdf_name.as_bytes()), chunk.font_size);
                current_font = Some((chunk.font, chunk.font_size));
            }

            let cx = line_start_x + chunk.x_offset;
            content.next_line(cx - td_x, y - td_y);
            td_x = cx;
            td_y = y;
            content.show(Str(&entry.encode(&chunk.text)));
        }
        content.end_text();
    }
    content.restore_state();
}

/// Measures and paints blocks. Positions are PDF user space: `top` is the
/// y coordinate of a block's upper edge and content grows downward.
pub(super) struct Painter<'a> {
    pub(super) fonts: &'a FontTable,
    /// Image key → XObject resource name.
    pub(super) images: &'a HashMap<String, String>,
}

impl Painter<'_> {
    pub(super) fn text_lines(&self, block: &TextBlock, width: f32) -> Vec<TextLine> {
        build_lines(&block.runs, &block.style, self.fonts, width)
    }

    pub(super) fn measure(&self, block: &Block, width: f32) -> f32 {
        match block {
            Block::Text(text) => {
                let lines = self.text_lines(text, width);
                text.style.space_before
                    + lines.len() as f32 * text.style.leading
                    + text.style.space_after
            }
            Block::Table(t) => table::layout_table(t, self).height(),
            Block::Spacer(h) => *h,
            Block::Image(img) => img.height,
            Block::Composite(c) => match &c.arrangement {
                Arrangement::Row(widths) => c
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.measure(child, widths.get(i).copied().unwrap_or(0.0)))
                    .fold(0.0, f32::max),
                Arrangement::Column => c.children.iter().map(|b| self.measure(b, width)).sum(),
            },
        }
    }

    pub(super) fn paint(&self, content: &mut Content, block: &Block, x: f32, top: f32, width: f32) {
        match block {
            Block::Text(text) => self.paint_text(content, text, x, top, width),
            Block::Table(t) => {
                let layout = table::layout_table(t, self);
                let table_x = x + (width - t.width()) / 2.0;
                table::paint_rows(self, content, t, &layout, 0..t.rows.len(), table_x, top);
            }
            Block::Spacer(_) => {}
            Block::Image(img) => {
                let Some(pdf_name) = self.images.get(&img.key) else {
                    log::debug!("Image {} was not embedded; leaving its space blank", img.key);
                    return;
                };
                content.save_state();
                content.transform([img.width, 0.0, 0.0, img.height, x, top - img.height]);
                content.x_object(Name(pdf_name.as_bytes()));
                content.restore_state();
            }
            Block::Composite(c) => match &c.arrangement {
                Arrangement::Row(widths) => {
                    let total: f32 = widths.iter().sum();
                    let mut child_x = x + (width - total) / 2.0;
                    for (i, child) in c.children.iter().enumerate() {
                        let w = widths.get(i).copied().unwrap_or(0.0);
                        self.paint(content, child, child_x, top, w);
                        child_x += w;
                    }
                }
                Arrangement::Column => {
                    let mut y = top;
                    for child in &c.children {
                        self.paint(content, child, x, y, width);
                        y -= self.measure(child, width);
                    }
                }
            },
        }
    }

    fn paint_text(&self, content: &mut Content, text: &TextBlock, x: f32, top: f32, width: f32) {
        let lines = self.text_lines(text, width);
        self.paint_text_lines(content, text, &lines, x, top - text.style.space_before, width);
    }

    /// Paint a slice of a text block's lines; `top` is the top of the first
    /// line, after any space before the block.
    pub(super) fn paint_text_lines(
        &self,
        content: &mut Content,
        text: &TextBlock,
        lines: &[TextLine],
        x: f32,
        top: f32,
        width: f32,
    ) {
        let style = &text.style;
        let first_role = text
            .runs
            .iter()
            .find(|r| !r.line_break)
            .map(|r| if r.emphasis { FontRole::Emphasis } else { style.font })
            .unwrap_or(style.font);
        let baseline = top - self.fonts.get(first_role).ascender(style.font_size);
        paint_lines(
            content,
            lines,
            style.alignment,
            x,
            width,
            baseline,
            style.leading,
            self.fonts,
        );
    }
}
