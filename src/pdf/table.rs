use std::ops::Range;

use pdf_writer::Content;

use crate::model::{
    Alignment, BLACK, Block, Border, Cell, FontRole, Rgb, Run, StyleAttr, TableBlock, TextStyle,
    VAlign,
};

use super::layout::{Painter, paint_lines};

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// Cell appearance after folding every matching style rule in order.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct CellStyle {
    pub(super) background: Option<Rgb>,
    pub(super) color: Rgb,
    pub(super) font: FontRole,
    pub(super) font_size: f32,
    pub(super) alignment: Alignment,
    pub(super) valign: VAlign,
    pub(super) padding_top: f32,
    pub(super) padding_bottom: f32,
    pub(super) padding_left: f32,
    pub(super) padding_right: f32,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            background: None,
            color: BLACK,
            font: FontRole::Regular,
            font_size: 10.0,
            alignment: Alignment::Left,
            valign: VAlign::Top,
            padding_top: 3.0,
            padding_bottom: 3.0,
            padding_left: 6.0,
            padding_right: 6.0,
        }
    }
}

impl CellStyle {
    fn apply(&mut self, attr: &StyleAttr) {
        match *attr {
            StyleAttr::Background(rgb) => self.background = Some(rgb),
            StyleAttr::TextColor(rgb) => self.color = rgb,
            StyleAttr::Font(role) => self.font = role,
            StyleAttr::FontSize(size) => self.font_size = size,
            StyleAttr::Align(a) => self.alignment = a,
            StyleAttr::VAlign(v) => self.valign = v,
            StyleAttr::PaddingTop(p) => self.padding_top = p,
            StyleAttr::PaddingBottom(p) => self.padding_bottom = p,
            StyleAttr::PaddingLeft(p) => self.padding_left = p,
            StyleAttr::PaddingRight(p) => self.padding_right = p,
            StyleAttr::Box(_)
            | StyleAttr::LineAbove(_)
            | StyleAttr::LineBelow(_)
            | StyleAttr::InnerGrid(_) => {}
        }
    }

    fn text_style(&self) -> TextStyle {
        TextStyle {
            font: self.font,
            font_size: self.font_size,
            leading: self.leading(),
            color: self.color,
            alignment: self.alignment,
            space_before: 0.0,
            space_after: 0.0,
        }
    }

    fn leading(&self) -> f32 {
        self.font_size * 1.2
    }
}

pub(super) struct TableLayout {
    pub(super) styles: Vec<Vec<CellStyle>>,
    pub(super) row_heights: Vec<f32>,
    /// Left edge of every column relative to the table, plus the right edge.
    pub(super) col_x: Vec<f32>,
}

impl TableLayout {
    pub(super) fn height(&self) -> f32 {
        self.row_heights.iter().sum()
    }

    fn rows_height(&self, rows: &Range<usize>) -> f32 {
        self.row_heights[rows.clone()].iter().sum()
    }
}

pub(super) fn resolve_styles(table: &TableBlock) -> Vec<Vec<CellStyle>> {
    let nrows = table.rows.len();
    let ncols = table.col_widths.len();
    let mut styles = vec![vec![CellStyle::default(); ncols]; nrows];
    for rule in &table.rules {
        let Some((r0, r1, c0, c1)) = rule.range.clamp(nrows, ncols) else {
            continue;
        };
        for row in &mut styles[r0..=r1] {
            for style in &mut row[c0..=c1] {
                style.apply(&rule.attr);
            }
        }
    }
    styles
}

fn cell_content_height(painter: &Painter, cell: &Cell, style: &CellStyle, inner_w: f32) -> f32 {
    match cell {
        Cell::Blocks(blocks) => blocks.iter().map(|b| painter.measure(b, inner_w)).sum(),
        Cell::Text(_) | Cell::Empty => {
            let text = cell.as_text().unwrap_or_default();
            let lines = super::layout::build_lines(
                &[Run::plain(text)],
                &style.text_style(),
                painter.fonts,
                inner_w,
            );
            lines.len() as f32 * style.leading()
        }
    }
}

pub(super) fn layout_table(table: &TableBlock, painter: &Painter) -> TableLayout {
    let styles = resolve_styles(table);
    let ncols = table.col_widths.len();

    let mut col_x = Vec::with_capacity(ncols + 1);
    let mut x = 0.0;
    col_x.push(x);
    for w in &table.col_widths {
        x += w;
        col_x.push(x);
    }

    let row_heights = table
        .rows
        .iter()
        .zip(&styles)
        .enumerate()
        .map(|(ri, (row, row_styles))| {
            if row.len() > ncols {
                log::debug!("Table row {ri} has {} cells for {ncols} columns", row.len());
            }
            row.iter()
                .zip(row_styles)
                .zip(&table.col_widths)
                .map(|((cell, style), col_w)| {
                    let inner_w = (col_w - style.padding_left - style.padding_right).max(0.0);
                    cell_content_height(painter, cell, style, inner_w)
                        + style.padding_top
                        + style.padding_bottom
                })
                .fold(0.0, f32::max)
        })
        .collect();

    TableLayout {
        styles,
        row_heights,
        col_x,
    }
}

/// Closed rounded rectangle path with its lower-left corner at (x, y).
pub(super) fn rounded_rect(content: &mut Content, x: f32, y: f32, w: f32, h: f32, r: f32) {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let k = r * KAPPA;
    content.move_to(x + r, y);
    content.line_to(x + w - r, y);
    content.cubic_to(x + w - r + k, y, x + w, y + r - k, x + w, y + r);
    content.line_to(x + w, y + h - r);
    content.cubic_to(x + w, y + h - r + k, x + w - r + k, y + h, x + w - r, y + h);
    content.line_to(x + r, y + h);
    content.cubic_to(x + r - k, y + h, x, y + h - r + k, x, y + h - r);
    content.line_to(x, y + r);
    content.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    content.close_path();
}

fn set_stroke(content: &mut Content, border: &Border) {
    let [r, g, b] = border.color;
    content.set_line_width(border.width);
    content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn line(content: &mut Content, border: &Border, x1: f32, y1: f32, x2: f32, y2: f32) {
    if border.width <= 0.0 {
        return;
    }
    content.save_state();
    set_stroke(content, border);
    content.move_to(x1, y1);
    content.line_to(x2, y2);
    content.stroke();
    content.restore_state();
}

/// Paint `rows` of `table` with its upper-left corner at (`x`, `top`).
/// A segment is a run of whole rows; the paginator paints a table that spans
/// pages as several segments.
pub(super) fn paint_rows(
    painter: &Painter,
    content: &mut Content,
    table: &TableBlock,
    layout: &TableLayout,
    rows: Range<usize>,
    x: f32,
    top: f32,
) {
    if rows.is_empty() {
        return;
    }
    let ncols = table.col_widths.len();
    let width = table.width();
    let seg_h = layout.rows_height(&rows);

    // Row tops in user space
    let mut row_tops = Vec::with_capacity(rows.len() + 1);
    let mut y = top;
    for ri in rows.clone() {
        row_tops.push(y);
        y -= layout.row_heights[ri];
    }
    row_tops.push(y);
    let row_top = |ri: usize| row_tops[ri - rows.start];

    // Backgrounds, clipped to the rounded outline
    content.save_state();
    if table.corner_radius > 0.0 {
        rounded_rect(content, x, top - seg_h, width, seg_h, table.corner_radius);
        content.clip_nonzero();
        content.end_path();
    }
    for ri in rows.clone() {
        let h = layout.row_heights[ri];
        for (ci, style) in layout.styles[ri].iter().enumerate() {
            if let Some([r, g, b]) = style.background {
                content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
                content.rect(
                    x + layout.col_x[ci],
                    row_top(ri) - h,
                    table.col_widths[ci],
                    h,
                );
                content.fill_nonzero();
            }
        }
    }
    content.restore_state();

    // Cell content
    for ri in rows.clone() {
        let h = layout.row_heights[ri];
        for (ci, cell) in table.rows[ri].iter().take(ncols).enumerate() {
            let style = &layout.styles[ri][ci];
            let inner_x = x + layout.col_x[ci] + style.padding_left;
            let inner_w =
                (table.col_widths[ci] - style.padding_left - style.padding_right).max(0.0);
            let content_h = cell_content_height(painter, cell, style, inner_w);
            let avail = h - style.padding_top - style.padding_bottom;
            let offset = match style.valign {
                VAlign::Top => 0.0,
                VAlign::Middle => (avail - content_h) / 2.0,
                VAlign::Bottom => avail - content_h,
            }
            .max(0.0);
            let inner_top = row_top(ri) - style.padding_top - offset;

            match cell {
                Cell::Blocks(blocks) => {
                    paint_nested(painter, content, blocks, inner_x, inner_top, inner_w)
                }
                Cell::Text(_) | Cell::Empty => {
                    let text = cell.as_text().unwrap_or_default();
                    if text.trim().is_empty() {
                        continue;
                    }
                    let text_style = style.text_style();
                    let lines = super::layout::build_lines(
                        &[Run::plain(text)],
                        &text_style,
                        painter.fonts,
                        inner_w,
                    );
                    let baseline =
                        inner_top - painter.fonts.get(style.font).ascender(style.font_size);
                    paint_lines(
                        content,
                        &lines,
                        style.alignment,
                        inner_x,
                        inner_w,
                        baseline,
                        text_style.leading,
                        painter.fonts,
                    );
                }
            }
        }
    }

    // Borders, in rule order
    let nrows = table.rows.len();
    for rule in &table.rules {
        let Some((r0, r1, c0, c1)) = rule.range.clamp(nrows, ncols) else {
            continue;
        };
        let first = r0.max(rows.start);
        let last = r1.min(rows.end - 1);
        if first > last {
            continue;
        }
        let left = x + layout.col_x[c0];
        let right = x + layout.col_x[c1 + 1];

        match &rule.attr {
            StyleAttr::Box(border) => {
                if border.width <= 0.0 {
                    continue;
                }
                let box_top = row_top(first);
                let box_bottom = row_top(last + 1);
                content.save_state();
                set_stroke(content, border);
                let whole_width = c0 == 0 && c1 + 1 == ncols;
                if table.corner_radius > 0.0 && whole_width {
                    rounded_rect(
                        content,
                        left,
                        box_bottom,
                        right - left,
                        box_top - box_bottom,
                        table.corner_radius,
                    );
                } else {
                    content.rect(left, box_bottom, right - left, box_top - box_bottom);
                }
                content.stroke();
                content.restore_state();
            }
            StyleAttr::LineAbove(border) => {
                for ri in first..=last {
                    line(content, border, left, row_top(ri), right, row_top(ri));
                }
            }
            StyleAttr::LineBelow(border) => {
                for ri in first..=last {
                    let y = row_top(ri + 1);
                    line(content, border, left, y, right, y);
                }
            }
            StyleAttr::InnerGrid(border) => {
                let grid_top = row_top(first);
                let grid_bottom = row_top(last + 1);
                for ci in c0 + 1..=c1 {
                    let gx = x + layout.col_x[ci];
                    line(content, border, gx, grid_top, gx, grid_bottom);
                }
                // A row continued from the previous page has no line on top
                for ri in first + 1..=last {
                    line(content, border, left, row_top(ri), right, row_top(ri));
                }
            }
            _ => {}
        }
    }
}

fn paint_nested(
    painter: &Painter,
    content: &mut Content,
    blocks: &[Block],
    x: f32,
    top: f32,
    width: f32,
) {
    let mut y = top;
    for block in blocks {
        painter.paint(content, block, x, y, width);
        y -= painter.measure(block, width);
    }
}
