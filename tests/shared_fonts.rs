mod common;

use payslip_pdf::{AssetConfig, PayslipRenderer, shared_fonts};

// Only test in this binary, so it owns the first initialisation.
#[test]
fn shared_fonts_resolve_once_per_process() {
    let empty = common::asset_dir();
    let empty_path = empty.path().to_path_buf();
    let first = std::thread::spawn(move || shared_fonts(&empty_path))
        .join()
        .unwrap();
    assert!(!first.regular.is_unicode());

    let with_fonts = common::asset_dir();
    common::install_system_dejavu(with_fonts.path());
    let second = shared_fonts(with_fonts.path());
    assert!(std::ptr::eq(first, second));
    assert!(!second.regular.is_unicode());

    let assets = AssetConfig::new(empty.path());
    let record = common::sample_record();
    let (a, b) = std::thread::scope(|s| {
        let a = s.spawn(|| PayslipRenderer::new(first, &assets).render_to_vec(&record));
        let b = s.spawn(|| PayslipRenderer::new(second, &assets).render_to_vec(&record));
        (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
    });
    assert_eq!(a, b);
    assert_eq!(common::page_count(&a), 1);
}
