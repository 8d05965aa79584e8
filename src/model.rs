use std::sync::Arc;

pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];
pub const WHITE: Rgb = [255, 255, 255];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Which face of the resolved font set a piece of text uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontRole {
    Regular,
    Emphasis,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub emphasis: bool,
    pub line_break: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: false,
            line_break: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: true,
            line_break: false,
        }
    }

    pub fn line_break() -> Self {
        Self {
            text: String::new(),
            emphasis: false,
            line_break: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font: FontRole,
    pub font_size: f32,
    pub leading: f32,
    pub color: Rgb,
    pub alignment: Alignment,
    pub space_before: f32,
    pub space_after: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: FontRole::Regular,
            font_size: 10.0,
            leading: 12.0,
            color: BLACK,
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub runs: Vec<Run>,
    pub style: TextStyle,
}

impl TextBlock {
    pub fn new(runs: Vec<Run>, style: TextStyle) -> Self {
        Self { runs, style }
    }

    /// Text with hard breaks rendered as '\n'.
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|r| if r.line_break { "\n" } else { r.text.as_str() })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub grayscale: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    /// Identifies the image resource; blocks sharing a key share one XObject.
    pub key: String,
    pub image: Arc<EmbeddedImage>,
    pub width: f32,  // points
    pub height: f32, // points
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Blocks(Vec<Block>),
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Cell::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(t) => Some(t),
            Cell::Empty => Some(""),
            Cell::Blocks(_) => None,
        }
    }
}

/// Inclusive row and column bounds; `LAST` reaches the final row or column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRange {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

pub const LAST: usize = usize::MAX;

impl CellRange {
    pub const fn new(rows: (usize, usize), cols: (usize, usize)) -> Self {
        Self {
            first_row: rows.0,
            last_row: rows.1,
            first_col: cols.0,
            last_col: cols.1,
        }
    }

    pub const fn all() -> Self {
        Self::new((0, LAST), (0, LAST))
    }

    pub const fn row(row: usize) -> Self {
        Self::new((row, row), (0, LAST))
    }

    pub const fn rows(first: usize, last: usize) -> Self {
        Self::new((first, last), (0, LAST))
    }

    pub const fn col(col: usize) -> Self {
        Self::new((0, LAST), (col, col))
    }

    pub const fn cell(row: usize, col: usize) -> Self {
        Self::new((row, row), (col, col))
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    /// Bounds clamped to a table of `nrows` x `ncols`, or `None` if disjoint.
    pub fn clamp(&self, nrows: usize, ncols: usize) -> Option<(usize, usize, usize, usize)> {
        if nrows == 0 || ncols == 0 || self.first_row >= nrows || self.first_col >= ncols {
            return None;
        }
        Some((
            self.first_row,
            self.last_row.min(nrows - 1),
            self.first_col,
            self.last_col.min(ncols - 1),
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StyleAttr {
    Background(Rgb),
    TextColor(Rgb),
    Font(FontRole),
    FontSize(f32),
    Align(Alignment),
    VAlign(VAlign),
    PaddingTop(f32),
    PaddingBottom(f32),
    PaddingLeft(f32),
    PaddingRight(f32),
    /// Outline around the whole region.
    Box(Border),
    LineAbove(Border),
    LineBelow(Border),
    /// Lines between the cells of the region.
    InnerGrid(Border),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleRule {
    pub range: CellRange,
    pub attr: StyleAttr,
}

impl StyleRule {
    pub const fn new(range: CellRange, attr: StyleAttr) -> Self {
        Self { range, attr }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    pub col_widths: Vec<f32>, // points
    pub rows: Vec<Vec<Cell>>,
    /// Applied in order; later rules win per attribute.
    pub rules: Vec<StyleRule>,
    /// Zero draws square corners.
    pub corner_radius: f32,
}

impl TableBlock {
    pub fn new(col_widths: Vec<f32>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            col_widths,
            rows,
            rules: Vec::new(),
            corner_radius: 0.0,
        }
    }

    pub fn with_rules(mut self, rules: Vec<StyleRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = radius;
        self
    }

    pub fn width(&self) -> f32 {
        self.col_widths.iter().sum()
    }

    pub fn cell_text(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_text()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Arrangement {
    /// Children side by side at the given widths.
    Row(Vec<f32>),
    /// Children stacked top to bottom.
    Column,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositeBlock {
    pub arrangement: Arrangement,
    pub children: Vec<Block>,
}

impl CompositeBlock {
    pub fn row(widths: Vec<f32>, children: Vec<Block>) -> Self {
        Self {
            arrangement: Arrangement::Row(widths),
            children,
        }
    }

    pub fn column(children: Vec<Block>) -> Self {
        Self {
            arrangement: Arrangement::Column,
            children,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Table(TableBlock),
    Spacer(f32),
    Image(ImageBlock),
    Composite(CompositeBlock),
}

impl Block {
    /// Visit every piece of text in document order.
    pub fn for_each_text<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Block::Text(t) => {
                for run in &t.runs {
                    f(&run.text);
                }
            }
            Block::Table(t) => {
                for cell in t.rows.iter().flatten() {
                    match cell {
                        Cell::Text(text) => f(text),
                        Cell::Blocks(blocks) => {
                            for b in blocks {
                                b.for_each_text(f);
                            }
                        }
                        Cell::Empty => {}
                    }
                }
            }
            Block::Composite(c) => {
                for child in &c.children {
                    child.for_each_text(f);
                }
            }
            Block::Spacer(_) | Block::Image(_) => {}
        }
    }

    pub fn for_each_image<'a>(&'a self, f: &mut dyn FnMut(&'a ImageBlock)) {
        match self {
            Block::Image(img) => f(img),
            Block::Table(t) => {
                for cell in t.rows.iter().flatten() {
                    if let Cell::Blocks(blocks) = cell {
                        for b in blocks {
                            b.for_each_image(f);
                        }
                    }
                }
            }
            Block::Composite(c) => {
                for child in &c.children {
                    child.for_each_image(f);
                }
            }
            Block::Text(_) | Block::Spacer(_) => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Gap between the visible frame (drawn at the margins) and the content.
    pub frame_padding: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        page_width: 595.28,
        page_height: 841.89,
        margin_top: 40.0,
        margin_bottom: 40.0,
        margin_left: 40.0,
        margin_right: 10.0,
        frame_padding: 20.0,
    };

    pub fn content_left(&self) -> f32 {
        self.margin_left + self.frame_padding
    }

    pub fn content_top(&self) -> f32 {
        self.page_height - self.margin_top - self.frame_padding
    }

    pub fn content_bottom(&self) -> f32 {
        self.margin_bottom + self.frame_padding
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right - 2.0 * self.frame_padding
    }

    pub fn content_height(&self) -> f32 {
        self.content_top() - self.content_bottom()
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}
