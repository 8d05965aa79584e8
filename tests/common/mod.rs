#![allow(dead_code)]

use std::path::Path;

use payslip_pdf::PayslipRecord;

pub const SAMPLE_JSON: &str = r#"{
    "employee_name": "Asha Rao",
    "employee_id": "E100",
    "pay_period": "1-Oct-2025 to 30-Oct-2025",
    "payment_date": "2025-10-31",
    "paid_days": 30,
    "loss_of_pay_days": 0,
    "basic_salary": "50000.00",
    "incentive": "5000.00",
    "gross_earnings": "55000.00",
    "income_tax": "5000.00",
    "total_deduction": "5000.00",
    "net_payable": "50000.00",
    "amount_in_words": "Fifty Thousand Rupees Only"
}"#;

pub fn sample_record() -> PayslipRecord {
    PayslipRecord::from_json(SAMPLE_JSON).expect("sample record parses")
}

pub fn load(pdf: &[u8]) -> lopdf::Document {
    lopdf::Document::load_mem(pdf).expect("output parses as PDF")
}

pub fn page_count(pdf: &[u8]) -> usize {
    load(pdf).get_pages().len()
}

/// Text shown on every page, decoded through each font's encoding or
/// ToUnicode map. Lines end with a newline.
pub fn painted_text(pdf: &[u8]) -> String {
    let doc = load(pdf);
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).expect("text extracts")
}

/// Names of the XObjects painted with `Do` on any page.
pub fn painted_xobjects(pdf: &[u8]) -> Vec<String> {
    let doc = load(pdf);
    let mut names = Vec::new();
    for page_id in doc.get_pages().into_values() {
        let content = doc.get_and_decode_page_content(page_id).expect("content decodes");
        for op in content.operations {
            if op.operator == "Do"
                && let Some(lopdf::Object::Name(name)) = op.operands.first()
            {
                names.push(String::from_utf8_lossy(name).into_owned());
            }
        }
    }
    names
}

/// A fresh asset directory with optional `static/` content.
pub fn asset_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}

pub fn write_logo(base: &Path, with_alpha: bool) {
    let path = base.join("static/images/logo.png");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let alpha = if with_alpha { 128 } else { 255 };
    image::RgbaImage::from_pixel(8, 8, image::Rgba([91, 77, 158, alpha]))
        .save(&path)
        .unwrap();
}

const SYSTEM_FONT_DIRS: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
];

fn install_system_font(base: &Path, file: &str) -> bool {
    let Some(src) = SYSTEM_FONT_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(file))
        .find(|p| p.exists())
    else {
        return false;
    };
    let dest = base.join("static/fonts").join(file);
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::copy(src, dest).is_ok()
}

/// Copy a system DejaVu Sans into `base` if one is installed.
pub fn install_system_dejavu(base: &Path) -> bool {
    install_system_font(base, "DejaVuSans.ttf")
}

/// Regular and bold DejaVu Sans, both carrying the rupee sign. False when
/// either is missing, so callers can skip.
pub fn install_dejavu_with_rupee(base: &Path) -> bool {
    ["DejaVuSans.ttf", "DejaVuSans-Bold.ttf"].iter().all(|file| {
        install_system_font(base, file) && {
            let bytes = std::fs::read(base.join("static/fonts").join(file)).unwrap();
            ttf_parser::Face::parse(&bytes, 0)
                .is_ok_and(|face| face.glyph_index('\u{20B9}').is_some())
        }
    })
}
