mod common;

use payslip_pdf::{
    AssetConfig, Error, FontSet, OutputTarget, PayslipRecord, PayslipRenderer, resolve_fonts,
};

fn render_with(fonts: &FontSet, assets: &AssetConfig, record: &PayslipRecord) -> Vec<u8> {
    PayslipRenderer::new(fonts, assets)
        .render_to_vec(record)
        .expect("render succeeds")
}

#[test]
fn sample_payslip_shows_employee_amounts_and_words() {
    let dir = common::asset_dir();
    let pdf = render_with(
        &FontSet::builtin(),
        &AssetConfig::new(dir.path()),
        &common::sample_record(),
    );

    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(common::page_count(&pdf), 1);

    let text = common::painted_text(&pdf);
    for expected in [
        "Asha Rao",
        "E100",
        "1-Oct-2025 to 30-Oct-2025",
        "55000.00",
        "50000.00",
        "Fifty Thousand Rupees Only",
        "TOTAL NET PAYABLE",
        "ACKNOWLEDGED BY,",
    ] {
        assert!(text.contains(expected), "missing {expected:?}");
    }
}

#[test]
fn same_record_renders_identical_bytes() {
    let dir = common::asset_dir();
    common::write_logo(dir.path(), true);
    let assets = AssetConfig::new(dir.path());
    let fonts = FontSet::builtin();
    let record = common::sample_record();
    assert_eq!(
        render_with(&fonts, &assets, &record),
        render_with(&fonts, &assets, &record)
    );
}

#[test]
fn missing_fonts_fall_back_to_helvetica() {
    let dir = common::asset_dir();
    let fonts = resolve_fonts(dir.path());
    let pdf = render_with(&fonts, &AssetConfig::new(dir.path()), &common::sample_record());
    let raw = String::from_utf8_lossy(&pdf);
    assert!(raw.contains("/BaseFont /Helvetica-Bold"));
    assert!(raw.contains("/Encoding /WinAnsiEncoding"));
}

#[test]
fn logo_is_embedded_with_soft_mask() {
    let dir = common::asset_dir();
    common::write_logo(dir.path(), true);
    let pdf = render_with(
        &FontSet::builtin(),
        &AssetConfig::new(dir.path()),
        &common::sample_record(),
    );
    let raw = String::from_utf8_lossy(&pdf);
    assert!(raw.contains("/Subtype /Image"));
    assert!(raw.contains("/SMask"));
    assert_eq!(common::painted_xobjects(&pdf), vec!["Im1".to_string()]);
}

#[test]
fn no_logo_means_no_image() {
    let dir = common::asset_dir();
    let pdf = render_with(
        &FontSet::builtin(),
        &AssetConfig::new(dir.path()),
        &common::sample_record(),
    );
    let raw = String::from_utf8_lossy(&pdf);
    assert!(!raw.contains("/Subtype /Image"));
    assert!(common::painted_xobjects(&pdf).is_empty());
    assert!(common::painted_text(&pdf).contains("VETRI IT SYSTEMS"));
}

#[test]
fn blank_record_still_renders() {
    let dir = common::asset_dir();
    let pdf = render_with(
        &FontSet::builtin(),
        &AssetConfig::new(dir.path()),
        &PayslipRecord::default(),
    );
    assert_eq!(common::page_count(&pdf), 1);
    assert!(common::painted_text(&pdf).contains("Gross Earnings"));
}

#[test]
fn document_info_names_the_payslip() {
    let dir = common::asset_dir();
    let pdf = render_with(
        &FontSet::builtin(),
        &AssetConfig::new(dir.path()),
        &common::sample_record(),
    );
    let raw = String::from_utf8_lossy(&pdf);
    assert!(raw.contains("(Payslip - Asha Rao - 1-Oct-2025 to 30-Oct-2025)"));
    assert!(raw.contains("(VETRI IT SYSTEMS PVT LTD.)"));
}

#[test]
fn overflowing_content_continues_on_next_page() {
    let dir = common::asset_dir();
    let mut record = common::sample_record();
    record.amount_in_words = "Fifty Thousand ".repeat(1500);
    let pdf = render_with(&FontSet::builtin(), &AssetConfig::new(dir.path()), &record);
    assert!(common::page_count(&pdf) >= 2);
}

#[test]
fn file_target_writes_pdf() {
    let dir = common::asset_dir();
    let out = dir.path().join("asha.pdf");
    let fonts = FontSet::builtin();
    PayslipRenderer::new(&fonts, &AssetConfig::new(dir.path()))
        .render(OutputTarget::File(&out), &common::sample_record())
        .unwrap();
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn unwritable_target_errors_and_leaves_nothing() {
    let dir = common::asset_dir();
    let out = dir.path().join("no-such-dir").join("asha.pdf");
    let fonts = FontSet::builtin();
    let err = PayslipRenderer::new(&fonts, &AssetConfig::new(dir.path()))
        .render(OutputTarget::File(&out), &common::sample_record())
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!out.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn buffer_target_receives_bytes() {
    let dir = common::asset_dir();
    let fonts = FontSet::builtin();
    let mut buf = Vec::new();
    PayslipRenderer::new(&fonts, &AssetConfig::new(dir.path()))
        .render(OutputTarget::Buffer(&mut buf), &common::sample_record())
        .unwrap();
    assert!(buf.starts_with(b"%PDF-"));
    assert!(buf.ends_with(b"%%EOF") || buf.ends_with(b"%%EOF\n"));
}

#[test]
fn render_to_dir_names_file_after_employee() {
    let dir = common::asset_dir();
    let out_dir = dir.path().join("slips");
    let path = payslip_pdf::render_payslip_to_dir(&out_dir, &common::sample_record()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("payslip_E100_"), "{name}");
    assert!(name.ends_with(".pdf"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn unicode_fonts_render_rupee_amounts() {
    let dir = common::asset_dir();
    if !common::install_dejavu_with_rupee(dir.path()) {
        println!("DejaVu Sans with the rupee sign not installed; skipping");
        return;
    }
    let fonts = resolve_fonts(dir.path());
    assert!(fonts.regular.is_unicode());
    assert!(fonts.bold.is_unicode());
    let pdf = render_with(&fonts, &AssetConfig::new(dir.path()), &common::sample_record());

    let raw = String::from_utf8_lossy(&pdf);
    assert!(raw.contains("/Identity-H"));
    assert!(!raw.contains("/Helvetica"));
    assert!(common::page_count(&pdf) >= 1);

    let text = common::painted_text(&pdf);
    for expected in [
        "Asha Rao",
        "E100",
        "\u{20B9} 55000.00",
        "\u{20B9} 50000.00",
        "\u{20B9} 5000.00",
        "Fifty Thousand Rupees Only",
    ] {
        assert!(text.contains(expected), "missing {expected:?} in {text:?}");
    }
}

#[test]
fn lenient_json_numbers_and_blanks() {
    let record = PayslipRecord::from_json(
        r#"{"employee_id": "E7", "basic_salary": 1200.5, "incentive": "", "paid_days": "28"}"#,
    )
    .unwrap();
    assert_eq!(record.basic_salary.map(|d| d.to_string()), Some("1200.5".into()));
    assert_eq!(record.incentive, None);
    assert_eq!(record.paid_days, Some(28));
}
