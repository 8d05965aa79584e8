use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::assets::AssetConfig;
use crate::model::FontRole;

pub(crate) const HELVETICA: &str = "Helvetica";
pub(crate) const HELVETICA_BOLD: &str = "Helvetica-Bold";

/// Where a font's glyphs come from.
#[derive(Clone)]
pub enum FontSource {
    /// A TrueType/OpenType file read from the static assets, embedded per render.
    TrueType {
        name: String,
        path: PathBuf,
        data: Arc<Mmap>,
    },
    /// One of the PDF standard 14 fonts (WinAnsi only).
    Builtin(&'static str),
}

impl FontSource {
    pub fn name(&self) -> &str {
        match self {
            FontSource::TrueType { name, .. } => name,
            FontSource::Builtin(name) => name,
        }
    }

    /// True when characters outside WinAnsi (such as the rupee sign) can render.
    pub fn is_unicode(&self) -> bool {
        matches!(self, FontSource::TrueType { .. })
    }

    fn same_face(&self, other: &FontSource) -> bool {
        match (self, other) {
            (FontSource::TrueType { data: a, .. }, FontSource::TrueType { data: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (FontSource::Builtin(a), FontSource::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::TrueType { name, path, data } => f
                .debug_struct("TrueType")
                .field("name", name)
                .field("path", path)
                .field("bytes", &data.len())
                .finish(),
            FontSource::Builtin(name) => f.debug_tuple("Builtin").field(name).finish(),
        }
    }
}

/// The fonts a payslip is drawn with. `bold` is the emphasis font used for
/// headings, labels and every amount.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub regular: FontSource,
    pub bold: FontSource,
}

impl FontSet {
    pub fn builtin() -> Self {
        Self {
            regular: FontSource::Builtin(HELVETICA),
            bold: FontSource::Builtin(HELVETICA_BOLD),
        }
    }

    pub fn source(&self, role: FontRole) -> &FontSource {
        match role {
            FontRole::Regular => &self.regular,
            FontRole::Emphasis => &self.bold,
        }
    }

    pub fn emphasis_name(&self) -> &str {
        self.bold.name()
    }

    /// Regular and emphasis resolve to the same face (no bold variant found).
    pub(crate) fn shares_face(&self) -> bool {
        self.regular.same_face(&self.bold)
    }
}

static SHARED_FONTS: OnceLock<FontSet> = OnceLock::new();

/// Process-wide font set, resolved on first use. Later calls return the first
/// resolution regardless of `base_dir`.
pub fn shared_fonts(base_dir: &Path) -> &'static FontSet {
    SHARED_FONTS.get_or_init(|| resolve_fonts(base_dir))
}

/// Pick the payslip fonts from the static assets under `base_dir`.
///
/// Never fails: a missing or unreadable Unicode font falls back to the next
/// candidate, ending at built-in Helvetica.
pub fn resolve_fonts(base_dir: &Path) -> FontSet {
    let t0 = std::time::Instant::now();
    let assets = AssetConfig::new(base_dir);
    let Some(regular) = load_truetype(&assets.regular_font_path()) else {
        log::info!(
            "No Unicode font under {}; using {HELVETICA_BOLD}, non-ASCII glyphs may not render",
            base_dir.display()
        );
        return FontSet::builtin();
    };

    let bold = load_truetype(&assets.bold_font_path()).unwrap_or_else(|| {
        log::info!(
            "No bold Unicode font; {} doubles as the emphasis font",
            regular.name()
        );
        regular.clone()
    });

    log::debug!(
        "resolve_fonts: regular={} emphasis={} → {:.1}ms",
        regular.name(),
        bold.name(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    FontSet { regular, bold }
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn load_truetype(path: &Path) -> Option<FontSource> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("Font asset not found: {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!("Cannot open font {}: {e}", path.display());
            return None;
        }
    };
    let data = match unsafe { Mmap::map(&file) } {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Cannot map font {}: {e}", path.display());
            return None;
        }
    };

    let name = {
        let face = match Face::parse(&data, 0) {
            Ok(face) => face,
            Err(e) => {
                log::warn!("Unusable font {}: {e}", path.display());
                return None;
            }
        };
        let family = font_family_name(&face).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Embedded".to_string())
        });
        let base = family.replace(' ', "");
        if face.is_bold() && !base.ends_with("-Bold") {
            format!("{base}-Bold")
        } else {
            base
        }
    };

    Some(FontSource::TrueType {
        name,
        path: path.to_path_buf(),
        data: Arc::new(data),
    })
}

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    pub(crate) widths_1000: Vec<f32>,
    pub(crate) ascender_ratio: Option<f32>,
    pub(crate) char_to_gid: Option<BTreeMap<char, u16>>,
    pub(crate) char_widths_1000: Option<BTreeMap<char, f32>>,
}

impl FontEntry {
    /// Width of a single character in 1000-units. Uses the per-char cache (covers
    /// all Unicode chars seen in the document), falls back to the WinAnsi table.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        if let Some(ref map) = self.char_widths_1000
            && let Some(&w) = map.get(&ch)
        {
            return w;
        }
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    pub(crate) fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn space_width(&self, font_size: f32) -> f32 {
        self.char_width_1000(' ') * font_size / 1000.0
    }

    pub(crate) fn ascender(&self, font_size: f32) -> f32 {
        font_size * self.ascender_ratio.unwrap_or(0.75)
    }

    /// Bytes for a `Tj` string: glyph IDs for embedded fonts, WinAnsi otherwise.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match self.char_to_gid {
            Some(ref map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes. Characters outside
/// the code page (the rupee sign among them) are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match char_to_winansi(c) {
            0 => None,
            b => Some(b),
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths; wider letters than the regular cut.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            87 => 944.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,
            102 | 116 => 333.0,
            109 => 889.0,
            119 => 778.0,
            97..=122 => 611.0,
            _ => 556.0,
        })
        .collect()
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to only include glyphs used in the document.
#[allow(clippy::type_complexity)]
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font_name: &str,
    font_data: &[u8],
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<(Vec<f32>, f32, BTreeMap<char, u16>, BTreeMap<char, f32>)> {
    let face = Face::parse(font_data, 0).ok()?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let widths_1000: Vec<f32> = (32u8..=255u8)
        .map(|byte| {
            face.glyph_index(winansi_to_char(byte))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0)
        })
        .collect();

    // Ordered iteration keeps glyph remapping, and so the output bytes, stable
    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = BTreeMap::new();
    let mut char_widths_1000 = BTreeMap::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            char_widths_1000.insert(ch, w);
        } else {
            log::debug!("{font_name} has no glyph for {ch:?}");
        }
    }

    let subset_data = subsetter::subset(font_data, 0, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {font_name}: {e}; embedding full font");
        font_data.to_vec()
    });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(font_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(font_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        let mut gid_widths: Vec<(u16, f32)> = char_to_gid
            .iter()
            .map(|(ch, &new_gid)| (new_gid, char_widths_1000[ch]))
            .collect();
        gid_widths.sort_by_key(|&(gid, _)| gid);
        gid_widths.dedup_by_key(|&mut (gid, _)| gid);
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{font_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(font_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    let ascender_ratio = face.ascender() as f32 / units;

    Some((widths_1000, ascender_ratio, char_to_gid, char_widths_1000))
}

fn register_builtin(pdf: &mut Pdf, font_ref: Ref, name: &'static str) -> Vec<f32> {
    pdf.type1_font(font_ref)
        .base_font(Name(name.as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    if name == HELVETICA_BOLD {
        helvetica_bold_widths()
    } else {
        helvetica_widths()
    }
}

/// Write one font of the set into `pdf`. A TrueType source that cannot be
/// embedded degrades to `fallback`.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    source: &FontSource,
    fallback: &'static str,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &BTreeSet<char>,
) -> FontEntry {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let embedded = match source {
        FontSource::TrueType { name, data, .. } => {
            let metrics = embed_truetype(pdf, font_ref, name, data, used_chars, alloc);
            if metrics.is_none() {
                log::warn!("Embedding {name} failed; using {fallback}");
            }
            metrics
        }
        FontSource::Builtin(_) => None,
    };

    let entry = match embedded {
        Some((widths_1000, ascender_ratio, char_to_gid, char_widths_1000)) => {
            FontEntry {
                pdf_name,
                font_ref,
                widths_1000,
                ascender_ratio: Some(ascender_ratio),
                char_to_gid: Some(char_to_gid),
                char_widths_1000: Some(char_widths_1000),
            }
        }
        None => {
            let name = match source {
                FontSource::Builtin(name) => name,
                FontSource::TrueType { .. } => fallback,
            };
            FontEntry {
                pdf_name,
                font_ref,
                widths_1000: register_builtin(pdf, font_ref, name),
                ascender_ratio: None,
                char_to_gid: None,
                char_widths_1000: None,
            }
        }
    };

    log::debug!(
        "register_font: {} ({} chars) → {:.1}ms",
        source.name(),
        used_chars.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    entry
}
