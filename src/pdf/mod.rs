mod layout;
mod table;

use std::collections::{BTreeSet, HashMap};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::error::Error;
use crate::fonts::{FontEntry, FontSet, HELVETICA, HELVETICA_BOLD, register_font};
use crate::model::{
    Block, EmbeddedImage, FontRole, ImageBlock, ImageFormat, PageGeometry, TextBlock,
};

use layout::Painter;

const PRODUCER: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Document information dictionary values.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DocumentMeta {
    pub(crate) title: String,
    pub(crate) author: String,
}

/// The registered fonts, indexed by role. When regular and emphasis share a
/// face both roles point at the same entry.
pub(crate) struct FontTable {
    entries: Vec<FontEntry>,
    regular: usize,
    emphasis: usize,
}

impl FontTable {
    pub(crate) fn get(&self, role: FontRole) -> &FontEntry {
        match role {
            FontRole::Regular => &self.entries[self.regular],
            FontRole::Emphasis => &self.entries[self.emphasis],
        }
    }
}

/// Vertical cursor over a sequence of pages. Each page starts with the frame
/// drawn at the margins.
struct PageFlow<'g> {
    geometry: &'g PageGeometry,
    finished: Vec<Content>,
    content: Content,
    cursor: f32,
}

impl<'g> PageFlow<'g> {
    fn new(geometry: &'g PageGeometry) -> Self {
        Self {
            geometry,
            finished: Vec::new(),
            content: fresh_page(geometry),
            cursor: geometry.content_top(),
        }
    }

    fn at_page_top(&self) -> bool {
        (self.cursor - self.geometry.content_top()).abs() < 0.5
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.geometry.content_bottom()
    }

    fn break_page(&mut self) {
        let page = std::mem::replace(&mut self.content, fresh_page(self.geometry));
        self.finished.push(page);
        self.cursor = self.geometry.content_top();
    }

    fn finish(mut self) -> Vec<Content> {
        self.finished.push(self.content);
        self.finished
    }
}

fn fresh_page(geometry: &PageGeometry) -> Content {
    let mut content = Content::new();
    content.save_state();
    content.set_line_width(1.0);
    content.set_stroke_gray(0.0);
    content.rect(
        geometry.margin_left,
        geometry.margin_bottom,
        geometry.page_width - geometry.margin_left - geometry.margin_right,
        geometry.page_height - geometry.margin_top - geometry.margin_bottom,
    );
    content.stroke();
    content.restore_state();
    content
}

/// Lay out the blocks top to bottom and paginate.
///
/// Top-level tables break between rows and top-level paragraphs between
/// lines; any other block that does not fit in the remaining space moves
/// whole to the next page.
fn flow_blocks(blocks: &[Block], painter: &Painter, geometry: &PageGeometry) -> Vec<Content> {
    let mut flow = PageFlow::new(geometry);
    let left = geometry.content_left();
    let width = geometry.content_width();

    for block in blocks {
        match block {
            Block::Table(t) => {
                let layout = table::layout_table(t, painter);
                let x = left + (width - t.width()) / 2.0;
                let nrows = t.rows.len();
                let mut start = 0;
                while start < nrows {
                    let mut end = start;
                    let mut seg_h = 0.0;
                    while end < nrows {
                        let row_h = layout.row_heights[end];
                        let fits = seg_h + row_h <= flow.remaining() + 0.01;
                        // A row taller than a whole page is placed anyway
                        if !fits && !(end == start && flow.at_page_top()) {
                            break;
                        }
                        seg_h += row_h;
                        end += 1;
                    }
                    if end == start {
                        flow.break_page();
                        continue;
                    }
                    log::debug!(
                        "Table rows {start}..{end} ({seg_h:.1}pt) at y={:.1}",
                        flow.cursor
                    );
                    let top = flow.cursor;
                    table::paint_rows(painter, &mut flow.content, t, &layout, start..end, x, top);
                    flow.cursor -= seg_h;
                    start = end;
                    if start < nrows {
                        flow.break_page();
                    }
                }
            }
            Block::Text(text) => flow_text(&mut flow, block, text, painter, left, width),
            Block::Spacer(h) => {
                if *h > flow.remaining() {
                    flow.break_page();
                } else {
                    flow.cursor -= h;
                }
            }
            other => {
                let h = painter.measure(other, width);
                if h > flow.remaining() && !flow.at_page_top() {
                    flow.break_page();
                }
                painter.paint(&mut flow.content, other, left, flow.cursor, width);
                flow.cursor -= h;
            }
        }
    }

    flow.finish()
}

fn flow_text(
    flow: &mut PageFlow,
    block: &Block,
    text: &TextBlock,
    painter: &Painter,
    left: f32,
    width: f32,
) {
    let style = &text.style;
    let lines = painter.text_lines(text, width);

    // Keep a paragraph that fits on a fresh page in one piece
    let total = painter.measure(block, width);
    if total > flow.remaining()
        && !flow.at_page_top()
        && total <= flow.geometry.content_height()
    {
        flow.break_page();
    }

    let mut start = 0;
    let mut before = style.space_before;
    while start < lines.len() {
        let avail = flow.remaining() - before;
        let mut n = ((avail + 0.01) / style.leading).floor().max(0.0) as usize;
        if n == 0 && flow.at_page_top() {
            n = 1;
        }
        n = n.min(lines.len() - start);
        if n == 0 {
            flow.break_page();
            before = 0.0;
            continue;
        }

        let top = flow.cursor - before;
        painter.paint_text_lines(&mut flow.content, text, &lines[start..start + n], left, top, width);
        flow.cursor = top - n as f32 * style.leading;
        start += n;
        before = 0.0;
        if start < lines.len() {
            log::debug!("Paragraph continues on a new page after {start} line(s)");
            flow.break_page();
        }
    }
    flow.cursor -= style.space_after;
}

fn embed_image(pdf: &mut Pdf, img: &EmbeddedImage, alloc: &mut impl FnMut() -> Ref) -> Option<Ref> {
    match img.format {
        ImageFormat::Jpeg => {
            let xobj_ref = alloc();
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            if img.grayscale {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
            Some(xobj_ref)
        }
        ImageFormat::Png => {
            let decoded = match image::load_from_memory_with_format(
                &img.data,
                image::ImageFormat::Png,
            ) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("Skipping undecodable PNG: {e}");
                    return None;
                }
            };
            let rgba = decoded.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let xobj_ref = alloc();
            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
            Some(xobj_ref)
        }
    }
}

/// Render laid-out blocks to PDF bytes. Output depends only on the inputs:
/// no timestamps or random identifiers are written.
pub(crate) fn render(
    blocks: &[Block],
    fonts: &FontSet,
    geometry: &PageGeometry,
    meta: &DocumentMeta,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: collect characters, then embed subsetted fonts
    let mut used_chars: BTreeSet<char> = BTreeSet::new();
    used_chars.insert(' ');
    for block in blocks {
        block.for_each_text(&mut |text| {
            used_chars.extend(text.chars().filter(|c| !c.is_control()));
        });
    }
    let t_collect = t0.elapsed();

    let regular = register_font(
        &mut pdf,
        &fonts.regular,
        HELVETICA,
        "F1".to_string(),
        &mut alloc,
        &used_chars,
    );
    let font_table = if fonts.shares_face() {
        FontTable {
            entries: vec![regular],
            regular: 0,
            emphasis: 0,
        }
    } else {
        let emphasis = register_font(
            &mut pdf,
            &fonts.bold,
            HELVETICA_BOLD,
            "F2".to_string(),
            &mut alloc,
            &used_chars,
        );
        FontTable {
            entries: vec![regular, emphasis],
            regular: 0,
            emphasis: 1,
        }
    };
    let t_fonts = t0.elapsed();

    // Phase 1b: one XObject per distinct image key
    let mut image_blocks: Vec<&ImageBlock> = Vec::new();
    for block in blocks {
        block.for_each_image(&mut |img| image_blocks.push(img));
    }
    let mut image_names: HashMap<String, String> = HashMap::new();
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    for img in image_blocks {
        if image_names.contains_key(&img.key) {
            continue;
        }
        if let Some(xobj_ref) = embed_image(&mut pdf, &img.image, &mut alloc) {
            let pdf_name = format!("Im{}", image_xobjects.len() + 1);
            image_names.insert(img.key.clone(), pdf_name.clone());
            image_xobjects.push((pdf_name, xobj_ref));
        }
    }
    let t_images = t0.elapsed();

    // Phase 2: layout and paint
    let painter = Painter {
        fonts: &font_table,
        images: &image_names,
    };
    let all_contents = flow_blocks(blocks, &painter, geometry);
    let t_layout = t0.elapsed();

    // Phase 3: assembly
    let n = all_contents.len();
    let page_count =
        i32::try_from(n).map_err(|_| Error::Pdf(format!("page count {n} out of range")))?;
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let info_id = alloc();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_count);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geometry.page_width, geometry.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for entry in &font_table.entries {
                font_dict.pair(Name(entry.pdf_name.as_bytes()), entry.font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    pdf.document_info(info_id)
        .title(TextStr(&meta.title))
        .author(TextStr(&meta.author))
        .producer(TextStr(PRODUCER));

    let t_assembly = t0.elapsed();

    log::debug!(
        "Render phases: collect={:.1}ms, font_embed={:.1}ms, images={:.1}ms, layout={:.1}ms, assembly={:.1}ms ({n} page(s))",
        t_collect.as_secs_f64() * 1000.0,
        (t_fonts - t_collect).as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fonts::FontSource;
    use crate::model::{Cell, Run, TableBlock, TextBlock, TextStyle};

    /// Built-in Helvetica pair registered into a scratch document.
    pub(crate) fn builtin_table() -> FontTable {
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };
        let chars = BTreeSet::new();
        let regular = register_font(
            &mut pdf,
            &FontSource::Builtin(HELVETICA),
            HELVETICA,
            "F1".to_string(),
            &mut alloc,
            &chars,
        );
        let emphasis = register_font(
            &mut pdf,
            &FontSource::Builtin(HELVETICA_BOLD),
            HELVETICA_BOLD,
            "F2".to_string(),
            &mut alloc,
            &chars,
        );
        FontTable {
            entries: vec![regular, emphasis],
            regular: 0,
            emphasis: 1,
        }
    }

    fn count_pages(pdf: &[u8]) -> usize {
        lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
    }

    fn long_table(rows: usize) -> Block {
        Block::Table(TableBlock::new(
            vec![200.0, 100.0],
            (0..rows)
                .map(|i| vec![Cell::text(format!("Item {i}")), Cell::text("1.00")])
                .collect(),
        ))
    }

    #[test]
    fn short_document_is_one_page() {
        let blocks = vec![Block::Text(TextBlock::new(
            vec![Run::plain("hello")],
            TextStyle::default(),
        ))];
        let bytes = render(
            &blocks,
            &FontSet::builtin(),
            &PageGeometry::A4,
            &DocumentMeta::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(count_pages(&bytes), 1);
    }

    #[test]
    fn long_tables_continue_on_later_pages() {
        // 16pt rows, about 680pt of usable height per page
        let bytes = render(
            &[long_table(100)],
            &FontSet::builtin(),
            &PageGeometry::A4,
            &DocumentMeta::default(),
        )
        .unwrap();
        assert!(count_pages(&bytes) >= 3);
    }

    #[test]
    fn block_that_does_not_fit_moves_to_next_page() {
        let blocks = vec![
            Block::Spacer(PageGeometry::A4.content_height() - 5.0),
            Block::Text(TextBlock::new(vec![Run::plain("late")], TextStyle::default())),
        ];
        let bytes = render(
            &blocks,
            &FontSet::builtin(),
            &PageGeometry::A4,
            &DocumentMeta::default(),
        )
        .unwrap();
        assert_eq!(count_pages(&bytes), 2);
    }

    #[test]
    fn long_paragraph_splits_between_lines() {
        let mut runs = Vec::new();
        for i in 0..100 {
            runs.push(Run::plain(format!("line {i}")));
            runs.push(Run::line_break());
        }
        let blocks = vec![Block::Text(TextBlock::new(runs, TextStyle::default()))];
        let bytes = render(
            &blocks,
            &FontSet::builtin(),
            &PageGeometry::A4,
            &DocumentMeta::default(),
        )
        .unwrap();
        assert_eq!(count_pages(&bytes), 2);
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let blocks = vec![long_table(5)];
        let meta = DocumentMeta {
            title: "Payslip".into(),
            author: "Acme".into(),
        };
        let a = render(&blocks, &FontSet::builtin(), &PageGeometry::A4, &meta).unwrap();
        let b = render(&blocks, &FontSet::builtin(), &PageGeometry::A4, &meta).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_face_registers_one_font() {
        let fonts = FontSet {
            regular: FontSource::Builtin(HELVETICA),
            bold: FontSource::Builtin(HELVETICA),
        };
        let bytes = render(
            &[long_table(1)],
            &fonts,
            &PageGeometry::A4,
            &DocumentMeta::default(),
        )
        .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/BaseFont /Helvetica").count(), 1);
    }
}
