use std::sync::Arc;

use crate::fonts::FontSet;
use crate::format::{currency_or_blank, display_or_blank};
use crate::model::{
    Alignment, Block, Border, Cell, CellRange, CompositeBlock, EmbeddedImage, FontRole,
    ImageBlock, Rgb, Run, StyleAttr, StyleRule, TableBlock, TextBlock, TextStyle, VAlign, BLACK,
    WHITE,
};
use crate::payslip::PayslipRecord;

pub const COMPANY_NAME: &str = "VETRI IT SYSTEMS PVT LTD.";
pub const COMPANY_ADDRESS: [&str; 3] = [
    "Shanthi complex, Second floor,",
    "Surandai, Tenkasi - 627 859",
    "India",
];

pub const BRAND_PURPLE: Rgb = [0x5b, 0x4d, 0x9e];
pub const LIGHT_GREEN: Rgb = [0xe8, 0xf5, 0xe9];
pub const PALE_GREEN: Rgb = [0xf9, 0xfd, 0xf7];
pub const WHITESMOKE: Rgb = [0xf5, 0xf5, 0xf5];
const RULE_GREY: Rgb = [0xd0, 0xd0, 0xd0];
const BANNER_EDGE: Rgb = [0xe0, 0xe0, 0xd0];
const SUBTITLE_GREY: Rgb = [0x66, 0x66, 0x66];

const LOGO_SIZE: f32 = 70.0;
const SIGNATURE_LINE: &str = "_________________________";

/// Resources the builder may draw on besides the record itself.
pub struct BuildAssets<'a> {
    pub fonts: &'a FontSet,
    pub logo: Option<Arc<EmbeddedImage>>,
}

/// The payslip as an ordered block sequence: header, earnings/deductions,
/// net-payable banner, amount in words, signatures.
pub fn build_blocks(payslip: &PayslipRecord, assets: &BuildAssets) -> Vec<Block> {
    if !assets.fonts.bold.is_unicode() {
        log::debug!(
            "Emphasis font {} lacks the rupee glyph; amounts render without it",
            assets.fonts.emphasis_name()
        );
    }

    vec![
        header(payslip, assets.logo.clone()),
        Block::Spacer(25.0),
        earnings_and_deductions(payslip),
        Block::Spacer(30.0),
        net_payable_banner(payslip),
        Block::Spacer(10.0),
        amount_in_words(payslip),
        Block::Spacer(20.0),
        acknowledgement_title(),
        signature_table(payslip),
    ]
}

fn title_style() -> TextStyle {
    TextStyle {
        font_size: 16.0,
        leading: 20.0,
        color: BRAND_PURPLE,
        space_after: 10.0,
        ..TextStyle::default()
    }
}

fn body_style() -> TextStyle {
    TextStyle {
        space_after: 5.0,
        ..TextStyle::default()
    }
}

fn header(payslip: &PayslipRecord, logo: Option<Arc<EmbeddedImage>>) -> Block {
    let mut company = Vec::new();
    if let Some(image) = logo {
        company.push(Block::Image(ImageBlock {
            key: "logo".to_string(),
            image,
            width: LOGO_SIZE,
            height: LOGO_SIZE,
        }));
        company.push(Block::Spacer(6.0));
    }
    company.push(Block::Text(TextBlock::new(
        vec![Run::bold(format!("{COMPANY_NAME},"))],
        title_style(),
    )));
    for line in COMPANY_ADDRESS {
        company.push(Block::Text(TextBlock::new(vec![Run::plain(line)], body_style())));
    }

    let fields = [
        ("Employee Name:", payslip.employee_name.clone()),
        ("Employee ID:", payslip.employee_id.clone()),
        ("Pay Period:", payslip.pay_period.clone()),
        ("Paid Days:", display_or_blank(payslip.paid_days)),
        ("Loss of Pay Days:", display_or_blank(payslip.loss_of_pay_days)),
        ("Payment Date:", payslip.payment_date.clone()),
    ];
    let mut runs = Vec::with_capacity(fields.len() * 3);
    for (i, (label, value)) in fields.into_iter().enumerate() {
        if i > 0 {
            runs.push(Run::line_break());
        }
        runs.push(Run::bold(label));
        runs.push(Run::plain(format!(" {value}")));
    }

    let statement = vec![
        Block::Spacer(15.0),
        Block::Text(TextBlock::new(
            vec![Run::bold("Employee Statement")],
            title_style(),
        )),
        Block::Text(TextBlock::new(
            runs,
            TextStyle {
                leading: 20.0,
                space_after: 5.0,
                ..TextStyle::default()
            },
        )),
    ];

    Block::Composite(CompositeBlock::row(
        vec![250.0, 250.0],
        vec![
            Block::Composite(CompositeBlock::column(company)),
            Block::Composite(CompositeBlock::column(statement)),
        ],
    ))
}

/// Header, body and highlighted footer rows shared by both amount tables.
fn amount_table(rows: Vec<[String; 2]>) -> TableBlock {
    let last = rows.len().saturating_sub(1);
    let body = CellRange::rows(1, last.saturating_sub(1));
    let edge = Border {
        width: 1.0,
        color: RULE_GREY,
    };
    let rules = vec![
        StyleRule::new(CellRange::row(0), StyleAttr::Background(LIGHT_GREEN)),
        StyleRule::new(CellRange::row(0), StyleAttr::TextColor(BLACK)),
        StyleRule::new(CellRange::row(0), StyleAttr::FontSize(10.0)),
        StyleRule::new(body, StyleAttr::Background(WHITE)),
        StyleRule::new(body, StyleAttr::TextColor(BLACK)),
        StyleRule::new(body, StyleAttr::FontSize(9.0)),
        StyleRule::new(CellRange::row(last), StyleAttr::Background(BRAND_PURPLE)),
        StyleRule::new(CellRange::row(last), StyleAttr::TextColor(WHITESMOKE)),
        StyleRule::new(CellRange::row(last), StyleAttr::FontSize(10.0)),
        StyleRule::new(CellRange::all(), StyleAttr::Font(FontRole::Emphasis)),
        StyleRule::new(CellRange::col(0), StyleAttr::Align(Alignment::Left)),
        StyleRule::new(CellRange::col(1), StyleAttr::Align(Alignment::Right)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingTop(10.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingBottom(10.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingLeft(12.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingRight(12.0)),
        StyleRule::new(CellRange::all(), StyleAttr::Box(edge)),
        StyleRule::new(CellRange::row(0), StyleAttr::LineBelow(edge)),
        StyleRule::new(CellRange::row(last), StyleAttr::LineAbove(edge)),
    ];

    let rows = rows
        .into_iter()
        .map(|[label, amount]| vec![Cell::Text(label), Cell::Text(amount)])
        .collect();

    TableBlock::new(vec![140.0, 100.0], rows)
        .with_rules(rules)
        .with_corner_radius(8.0)
}

fn earnings_table(payslip: &PayslipRecord) -> TableBlock {
    amount_table(vec![
        ["Earnings".into(), "Amount".into()],
        ["Basic".into(), currency_or_blank(payslip.basic_salary)],
        ["Incentive".into(), currency_or_blank(payslip.incentive)],
        ["Gross Earnings".into(), currency_or_blank(payslip.gross_earnings)],
    ])
}

fn deductions_table(payslip: &PayslipRecord) -> TableBlock {
    amount_table(vec![
        ["Deduction".into(), "Amount".into()],
        ["Income Tax".into(), currency_or_blank(payslip.income_tax)],
        // Blank row keeps both tables the same height
        [String::new(), String::new()],
        ["Total Deduction".into(), currency_or_blank(payslip.total_deduction)],
    ])
}

fn earnings_and_deductions(payslip: &PayslipRecord) -> Block {
    Block::Composite(CompositeBlock::row(
        vec![240.0, 20.0, 240.0],
        vec![
            Block::Table(earnings_table(payslip)),
            Block::Spacer(0.0),
            Block::Table(deductions_table(payslip)),
        ],
    ))
}

fn net_payable_banner(payslip: &PayslipRecord) -> Block {
    let title = Block::Text(TextBlock::new(
        vec![Run::plain("TOTAL NET PAYABLE")],
        TextStyle {
            font: FontRole::Emphasis,
            font_size: 13.0,
            leading: 16.0,
            ..TextStyle::default()
        },
    ));
    let subtitle = Block::Text(TextBlock::new(
        vec![Run::plain("Gross Earnings - Total Deduction")],
        TextStyle {
            font_size: 9.0,
            leading: 12.0,
            color: SUBTITLE_GREY,
            ..TextStyle::default()
        },
    ));

    let rules = vec![
        StyleRule::new(CellRange::all(), StyleAttr::Background(PALE_GREEN)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::Background(BRAND_PURPLE)),
        StyleRule::new(CellRange::cell(0, 0), StyleAttr::TextColor(BLACK)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::TextColor(WHITESMOKE)),
        StyleRule::new(CellRange::cell(0, 0), StyleAttr::Align(Alignment::Left)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::Align(Alignment::Center)),
        StyleRule::new(CellRange::all(), StyleAttr::VAlign(VAlign::Middle)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::Font(FontRole::Emphasis)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::FontSize(16.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingTop(15.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingBottom(15.0)),
        StyleRule::new(CellRange::cell(0, 0), StyleAttr::PaddingLeft(15.0)),
        StyleRule::new(CellRange::cell(0, 1), StyleAttr::PaddingRight(20.0)),
        StyleRule::new(
            CellRange::all(),
            StyleAttr::Box(Border {
                width: 1.0,
                color: BANNER_EDGE,
            }),
        ),
    ];

    Block::Table(
        TableBlock::new(
            vec![370.0, 130.0],
            vec![vec![
                Cell::Blocks(vec![title, subtitle]),
                Cell::Text(currency_or_blank(payslip.net_payable)),
            ]],
        )
        .with_rules(rules)
        .with_corner_radius(8.0),
    )
}

fn amount_in_words(payslip: &PayslipRecord) -> Block {
    Block::Text(TextBlock::new(
        vec![
            Run::bold("Amount in words:"),
            Run::plain(format!(" {}", payslip.amount_in_words)),
        ],
        TextStyle {
            font_size: 9.0,
            leading: 11.0,
            alignment: Alignment::Center,
            space_after: 15.0,
            ..TextStyle::default()
        },
    ))
}

fn acknowledgement_title() -> Block {
    Block::Text(TextBlock::new(
        vec![Run::bold("ACKNOWLEDGED BY,")],
        TextStyle {
            alignment: Alignment::Center,
            color: BRAND_PURPLE,
            space_after: 25.0,
            ..TextStyle::default()
        },
    ))
}

fn signature_table(payslip: &PayslipRecord) -> Block {
    let rows = vec![
        vec![Cell::text(SIGNATURE_LINE), Cell::text(SIGNATURE_LINE)],
        vec![
            Cell::text(payslip.employee_name.clone()),
            Cell::text("AUTHORISED NAME"),
        ],
        vec![
            Cell::text(format!("Employee, {COMPANY_NAME}")),
            Cell::text(format!("Managing Director, {COMPANY_NAME}")),
        ],
    ];
    let rules = vec![
        StyleRule::new(CellRange::all(), StyleAttr::Align(Alignment::Center)),
        StyleRule::new(CellRange::row(1), StyleAttr::Font(FontRole::Emphasis)),
        StyleRule::new(CellRange::rows(0, 1), StyleAttr::FontSize(9.0)),
        StyleRule::new(CellRange::row(2), StyleAttr::FontSize(8.0)),
        StyleRule::new(CellRange::row(2), StyleAttr::TextColor(BRAND_PURPLE)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingTop(5.0)),
        StyleRule::new(CellRange::all(), StyleAttr::PaddingBottom(5.0)),
    ];
    Block::Table(TableBlock::new(vec![240.0, 240.0], rows).with_rules(rules))
}
