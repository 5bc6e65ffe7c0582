use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use printpdf::image_crate::{DynamicImage, GenericImageView, RgbImage};
use printpdf::{
    path::PaintMode, BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm,
    PdfDocument, PdfLayerReference, Point, Pt, Rect, Rgb,
};
use serde::Serialize;

use crate::grading::{self, Grade};
use crate::store::{AcademicSession, SchoolSettings, ScoreRecord, StoreError, Student};

const PAGE_W: f64 = 595.28;
const PAGE_H: f64 = 841.89;

// Column left edges of the score table, in points.
const COL_SUB: f64 = 40.0;
const COL_CA1: f64 = 180.0;
const COL_CA2: f64 = 225.0;
const COL_EXAM: f64 = 270.0;
const COL_TOT: f64 = 315.0;
const COL_HIGH: f64 = 360.0;
const COL_LOW: f64 = 405.0;
const COL_GRD: f64 = 450.0;
const COL_REM: f64 = 485.0;
const COL_SIGN: f64 = 530.0;
const COL_END: f64 = 555.0;
const ROW_H: f64 = 15.0;

const SKILLS: [&str; 13] = [
    "Handwriting",
    "Fluency",
    "Games/Sports",
    "Handling Tools",
    "Labour",
    "Drawing",
    "Crafts",
    "Punctuality",
    "Neatness",
    "Politeness",
    "Honesty",
    "Self Control",
    "Initiative",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowScore {
    pub ca1: u32,
    pub ca2: u32,
    pub exam: u32,
    pub total: u32,
    pub grade: &'static str,
    pub remark: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<RowScore>,
    pub high: u32,
    pub low: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardModel {
    pub student: Student,
    pub class_name: String,
    pub session_year: String,
    pub term: u8,
    pub no_in_class: usize,
    pub position: usize,
    pub overall_total: u32,
    pub subjects_taken: usize,
    pub average: String,
    pub rows: Vec<SubjectRow>,
}

/// Scores that count for one class's report run: active session and term,
/// students of the class only.
pub fn filter_class_scores<'a>(
    scores: &'a [ScoreRecord],
    session: &AcademicSession,
    class_students: &[Student],
) -> Vec<&'a ScoreRecord> {
    scores
        .iter()
        .filter(|s| {
            s.session == session.year
                && s.term == session.current_term
                && class_students.iter().any(|cs| cs.id == s.student_id)
        })
        .collect()
}

/// Per-class figures shared by every page of a batch: resolved subject list,
/// class extremes per subject, and the ranking.
pub struct ClassContext<'a> {
    class_scores: &'a [&'a ScoreRecord],
    no_in_class: usize,
    subjects: Vec<String>,
    extremes: HashMap<String, (u32, u32)>,
    positions: HashMap<String, (usize, u32)>, // student id -> (position, total)
}

impl<'a> ClassContext<'a> {
    pub fn new(
        class_name: &str,
        class_students: &[Student],
        class_scores: &'a [&'a ScoreRecord],
    ) -> Self {
        let subjects = grading::report_subjects(class_name, class_scores);
        let extremes = subjects
            .iter()
            .map(|sub| (sub.clone(), grading::subject_extremes(class_scores, sub)))
            .collect();
        let roster: Vec<(String, String)> = class_students
            .iter()
            .map(|s| (s.id.clone(), s.reg_number.clone()))
            .collect();
        let positions = grading::rank_class(&roster, class_scores, &subjects)
            .into_iter()
            .map(|r| (r.student_id, (r.position, r.grand_total)))
            .collect();
        Self {
            class_scores,
            no_in_class: class_students.len(),
            subjects,
            extremes,
            positions,
        }
    }

    pub fn model_for(&self, student: &Student, session: &AcademicSession) -> ReportCardModel {
        let rows: Vec<SubjectRow> = self
            .subjects
            .iter()
            .map(|subject| {
                let score = self
                    .class_scores
                    .iter()
                    .find(|s| s.student_id == student.id && &s.subject == subject)
                    .map(|s| {
                        let total = s.total();
                        let grade = Grade::from_total(total);
                        RowScore {
                            ca1: s.ca1,
                            ca2: s.ca2,
                            exam: s.exam,
                            total,
                            grade: grade.letter(),
                            remark: grade.remark(),
                        }
                    });
                let (high, low) = *self.extremes.get(subject).unwrap_or(&(0, 0));
                SubjectRow {
                    subject: subject.clone(),
                    score,
                    high,
                    low,
                }
            })
            .collect();

        let (position, overall_total) = *self.positions.get(&student.id).unwrap_or(&(0, 0));
        let subjects_taken = rows.iter().filter(|r| r.score.is_some()).count();
        let average = if subjects_taken > 0 {
            format!("{:.1}", overall_total as f64 / subjects_taken as f64)
        } else {
            "0.0".to_string()
        };

        ReportCardModel {
            student: student.clone(),
            class_name: student.current_class.clone(),
            session_year: session.year.clone(),
            term: session.current_term,
            no_in_class: self.no_in_class,
            position,
            overall_total,
            subjects_taken,
            average,
        rows,
        }
    }
}

pub fn single_filename(reg_number: &str) -> String {
    format!("CDSS_Report_{}.pdf", reg_number.replace('/', "-"))
}

pub fn batch_filename(class_name: &str) -> String {
    format!("Report_Cards_{}.pdf", class_name.replace(' ', "_"))
}

// ---------------------------------------------------------------------------
// Rendering

fn pt(v: f64) -> Mm {
    Mm::from(Pt(v as f32))
}

fn pdf_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::new("pdf_failed", e.to_string())
}

/// Decoded school logo. The watermark copy is pre-faded because the page
/// model carries no transparency state.
struct Logo {
    header: DynamicImage,
    watermark: DynamicImage,
    aspect: f64, // height / width
}

/// A logo that fails to decode is dropped with a warning; the report still
/// renders, just without the marks.
fn decode_logo(logo_url: &str) -> Option<Logo> {
    if logo_url.is_empty() {
        return None;
    }
    let b64 = logo_url.split_once(',').map(|(_, b)| b).unwrap_or(logo_url);
    let bytes = match STANDARD.decode(b64.trim()) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "logo is not valid base64, skipping");
            return None;
        }
    };
    let img = match printpdf::image_crate::load_from_memory(&bytes) {
        Ok(i) => i,
        Err(e) => {
            tracing::warn!(error = %e, "logo bytes are not a decodable image, skipping");
            return None;
        }
    };

    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let aspect = h as f64 / w as f64;
    let rgba = img.to_rgba8();

    let flatten = |fade: f64| -> DynamicImage {
        let mut out = RgbImage::new(w, h);
        for (x, y, px) in rgba.enumerate_pixels() {
            let a = px[3] as f64 / 255.0 * fade;
            let blend = |v: u8| (255.0 - (255.0 - v as f64) * a).round() as u8;
            out.put_pixel(
                x,
                y,
                printpdf::image_crate::Rgb([blend(px[0]), blend(px[1]), blend(px[2])]),
            );
        }
        DynamicImage::ImageRgb8(out)
    };

    Some(Logo {
        header: flatten(1.0),
        watermark: flatten(0.08),
        aspect,
    })
}

const BLACK: (f64, f64, f64) = (0.0, 0.0, 0.0);
const DARK_GREEN: (f64, f64, f64) = (0.0, 0.4, 0.0);
const DARK_RED: (f64, f64, f64) = (0.8, 0.0, 0.0);
const GREY: (f64, f64, f64) = (0.4, 0.4, 0.4);

fn rgb(c: (f64, f64, f64)) -> Color {
    Color::Rgb(Rgb::new(c.0 as f32, c.1 as f32, c.2 as f32, None))
}

struct Painter<'a> {
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
}

impl Painter<'_> {
    fn text(&self, s: &str, size: f64, x: f64, y: f64, bold: bool, color: (f64, f64, f64)) {
        self.layer.set_fill_color(rgb(color));
        let font = if bold { self.bold } else { self.regular };
        self.layer.use_text(s, size as f32, pt(x), pt(y), font);
        self.layer.set_fill_color(rgb(BLACK));
    }

    /// Centres digit strings between two column edges. Helvetica digits are
    /// 556/1000 em wide, which covers every numeric cell we centre.
    fn centered_digits(&self, s: &str, size: f64, x1: f64, x2: f64, y: f64) {
        let w = s.len() as f64 * 0.556 * size;
        self.text(s, size, x1 + (x2 - x1 - w) / 2.0, y, false, BLACK);
    }

    fn line(&self, x1: f64, y1: f64, x2: f64, y2: f64, thickness: f64, color: (f64, f64, f64)) {
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness as f32);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(pt(x1), pt(y1)), false),
                (Point::new(pt(x2), pt(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64, thickness: f64) {
        self.layer.set_outline_color(rgb(BLACK));
        self.layer.set_outline_thickness(thickness as f32);
        self.layer
            .add_rect(Rect::new(pt(x), pt(y), pt(x + w), pt(y + h)).with_mode(PaintMode::Stroke));
    }

    fn filled_rect(&self, x: f64, y: f64, w: f64, h: f64, fill: (f64, f64, f64)) {
        self.layer.set_fill_color(rgb(fill));
        self.layer.set_outline_color(rgb(BLACK));
        self.layer.set_outline_thickness(1.0);
        self.layer.add_rect(
            Rect::new(pt(x), pt(y), pt(x + w), pt(y + h)).with_mode(PaintMode::FillStroke),
        );
        self.layer.set_fill_color(rgb(BLACK));
    }
}

fn place_image(layer: &PdfLayerReference, img: &DynamicImage, x: f64, y: f64, w: f64, h: f64) {
    let (px_w, px_h) = img.dimensions();
    let image = Image::from_dynamic_image(img);
    // At 300 dpi the natural size is px/300 inch; scale to the requested box.
    let natural_w_pt = px_w as f64 / 300.0 * 72.0;
    let natural_h_pt = px_h as f64 / 300.0 * 72.0;
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(pt(x)),
            translate_y: Some(pt(y)),
            scale_x: Some((w / natural_w_pt) as f32),
            scale_y: Some((h / natural_h_pt) as f32),
            dpi: Some(300.0),
            ..Default::default()
        },
    );
}

fn draw_page(p: &Painter<'_>, model: &ReportCardModel, logo: Option<&Logo>) {
    if let Some(logo) = logo {
        let wm_w = 350.0;
        let wm_h = logo.aspect * wm_w;
        place_image(
            &p.layer,
            &logo.watermark,
            (PAGE_W - wm_w) / 2.0,
            (PAGE_H - wm_h) / 2.0,
            wm_w,
            wm_h,
        );
        place_image(&p.layer, &logo.header, 40.0, PAGE_H - 100.0, 60.0, 60.0);
    }

    p.text(
        "COMMAND DAY SECONDARY SCHOOL, DAURA",
        20.0,
        110.0,
        PAGE_H - 50.0,
        true,
        DARK_GREEN,
    );
    p.text(
        "Daura L.G.A Katsina State       cdssdaura@gmail.com",
        10.0,
        110.0,
        PAGE_H - 68.0,
        false,
        BLACK,
    );
    p.text(
        "+234 707 622 4069      +234 907 795 9897",
        10.0,
        110.0,
        PAGE_H - 80.0,
        false,
        BLACK,
    );

    let junior = crate::curriculum::is_junior(&model.class_name);
    let tier_title = if junior {
        "JUNIOR SECONDARY SCHOOL"
    } else {
        "SENIOR SECONDARY SCHOOL"
    };
    p.text(tier_title, 16.0, 160.0, PAGE_H - 100.0, true, DARK_RED);

    // Bio rows, each underlined.
    let mut y = PAGE_H - 130.0;
    p.text(
        &format!(
            "Name (Surname First): {}",
            model.student.full_name.to_uppercase()
        ),
        10.0,
        40.0,
        y,
        true,
        BLACK,
    );
    y -= 5.0;
    p.line(40.0, y, 550.0, y, 1.0, BLACK);
    y -= 20.0;

    p.text(
        &format!("Admission No: {}", model.student.reg_number),
        10.0,
        40.0,
        y,
        false,
        BLACK,
    );
    p.text(&format!("Class: {}", model.class_name), 10.0, 250.0, y, false, BLACK);
    p.text(&format!("Year: {}", model.session_year), 10.0, 400.0, y, false, BLACK);
    y -= 5.0;
    p.line(40.0, y, 550.0, y, 1.0, BLACK);
    y -= 20.0;

    p.text(
        &format!("No. in Class: {}", model.no_in_class),
        10.0,
        40.0,
        y,
        false,
        BLACK,
    );
    p.text(&format!("Grade: {}", model.position), 10.0, 180.0, y, false, BLACK);
    p.text(
        &format!("Sex: {:?}", model.student.gender),
        10.0,
        320.0,
        y,
        false,
        BLACK,
    );
    p.text("Age: ____", 10.0, 450.0, y, false, BLACK);
    y -= 5.0;
    p.line(40.0, y, 550.0, y, 1.0, BLACK);
    y -= 20.0;

    p.text(
        &format!("Class Average: {}", model.average),
        10.0,
        40.0,
        y,
        false,
        BLACK,
    );
    p.text(
        &format!("Term: {}", grading::term_label(model.term)),
        10.0,
        250.0,
        y,
        false,
        BLACK,
    );
    p.text(
        &format!("Session: {}", model.session_year),
        10.0,
        400.0,
        y,
        false,
        BLACK,
    );
    y -= 5.0;
    p.line(40.0, y, 550.0, y, 1.0, BLACK);
    y -= 15.0;

    // Table header band.
    p.filled_rect(COL_SUB, y - 25.0, COL_END - COL_SUB, 25.0, (0.95, 0.95, 0.95));
    let header = |text: &str, x: f64| {
        for (i, l) in text.split('\n').enumerate() {
            p.text(l, 6.0, x + 2.0, y - 10.0 - i as f64 * 8.0, true, BLACK);
        }
    };
    header("SUBJECTS", COL_SUB);
    header("1ST CA\nSUMMARY\n(15%)", COL_CA1);
    header("2ND CA\nSUMMARY\n(15%)", COL_CA2);
    header("EXAM\nSCORE\n(70%)", COL_EXAM);
    header("TOTAL\nSCORE\n(100%)", COL_TOT);
    header("HIGHEST\nSCORE", COL_HIGH);
    header("LOWEST\nSCORE", COL_LOW);
    header("GRADE", COL_GRD);
    header("REMARKS", COL_REM);
    header("SIGN", COL_SIGN);
    y -= 25.0;

    for row in &model.rows {
        p.stroke_rect(COL_SUB, y - ROW_H, COL_END - COL_SUB, ROW_H, 1.0);
        p.text(&row.subject.to_uppercase(), 8.0, COL_SUB + 2.0, y - 10.0, true, BLACK);

        if let Some(score) = &row.score {
            p.centered_digits(&score.ca1.to_string(), 8.0, COL_CA1, COL_CA2, y - 10.0);
            p.centered_digits(&score.ca2.to_string(), 8.0, COL_CA2, COL_EXAM, y - 10.0);
            p.centered_digits(&score.exam.to_string(), 8.0, COL_EXAM, COL_TOT, y - 10.0);
            p.centered_digits(&score.total.to_string(), 8.0, COL_TOT, COL_HIGH, y - 10.0);
            p.centered_digits(&row.high.to_string(), 8.0, COL_HIGH, COL_LOW, y - 10.0);
            p.centered_digits(&row.low.to_string(), 8.0, COL_LOW, COL_GRD, y - 10.0);
            let grade_color = if score.grade == "F" { DARK_RED } else { BLACK };
            p.text(score.grade, 8.0, COL_GRD + 10.0, y - 10.0, true, grade_color);
            p.text(score.remark, 6.0, COL_REM + 2.0, y - 10.0, false, BLACK);
        }

        for x in [
            COL_CA1, COL_CA2, COL_EXAM, COL_TOT, COL_HIGH, COL_LOW, COL_GRD, COL_REM, COL_SIGN,
        ] {
            p.line(x, y, x, y - ROW_H, 1.0, BLACK);
        }
        y -= ROW_H;
    }

    // Totals band.
    p.filled_rect(COL_SUB, y - 15.0, COL_END - COL_SUB, 15.0, (0.9, 0.9, 0.9));
    p.text(
        &format!("OVERALL TOTAL: {}", model.overall_total),
        9.0,
        200.0,
        y - 10.0,
        true,
        DARK_RED,
    );
    p.text(
        &format!("PERCENTAGE: {}%", model.average),
        9.0,
        400.0,
        y - 10.0,
        true,
        (0.0, 0.5, 0.0),
    );
    y -= 30.0;

    let left_x = 40.0;
    let right_x = 300.0;
    let boxed = |label: &str, yy: f64| {
        p.stroke_rect(left_x, yy - 15.0, 250.0, 15.0, 1.0);
        p.text(label, 7.0, left_x + 2.0, yy - 10.0, true, BLACK);
    };
    boxed("NEXT TERM BEGINS  ______________", y);
    y -= 15.0;
    boxed("NEXT TERM ENDS    ______________", y);
    y -= 20.0;

    p.text(
        "Times School Opened: ____  Times Present: ____  Absent: ____",
        8.0,
        left_x,
        y,
        false,
        BLACK,
    );
    y -= 15.0;

    let mut skill_y = y + 50.0;
    p.text(
        "SKILLS AND BEHAVIOUR RATINGS (1-5)",
        8.0,
        right_x,
        skill_y + 5.0,
        true,
        DARK_GREEN,
    );
    for skill in SKILLS {
        p.stroke_rect(right_x, skill_y - 12.0, 150.0, 12.0, 0.5);
        p.text(skill, 7.0, right_x + 2.0, skill_y - 9.0, false, BLACK);
        for i in 0..5 {
            p.stroke_rect(right_x + 150.0 + i as f64 * 15.0, skill_y - 12.0, 15.0, 12.0, 0.5);
        }
        skill_y -= 12.0;
    }

    y -= 10.0;
    p.text(
        "Class Teacher's Remarks & Signature _________________________________________",
        9.0,
        left_x,
        y,
        true,
        BLACK,
    );
    y -= 25.0;
    p.text("_________________________________________", 9.0, left_x, y, false, BLACK);
    p.text("Date: ____________", 9.0, 350.0, y, false, BLACK);
    y -= 30.0;
    p.text(
        "Ag. Commandant's Remarks & Signature _________________________________________",
        9.0,
        left_x,
        y,
        true,
        BLACK,
    );
    y -= 25.0;
    p.text("_________________________________________", 9.0, left_x, y, false, BLACK);
    p.text("Date: ____________", 9.0, 350.0, y, false, BLACK);

    let footer_y = 30.0;
    p.line(40.0, footer_y + 10.0, PAGE_W - 40.0, footer_y + 10.0, 1.0, (0.8, 0.8, 0.8));
    p.text(
        "Command Day Secondary School, Daura - Katsina State",
        9.0,
        40.0,
        footer_y,
        true,
        GREY,
    );
    p.text("Page 1 of 1", 9.0, PAGE_W - 90.0, footer_y, false, GREY);
}

/// Renders one page per model. The whole document is produced in memory so
/// a failure leaves no partial file behind.
pub fn render(models: &[ReportCardModel], settings: &SchoolSettings) -> Result<Vec<u8>, StoreError> {
    if models.is_empty() {
        return Err(StoreError::new("bad_params", "no students to render"));
    }
    let logo = decode_logo(&settings.logo_url);

    let (doc, first_page, first_layer) =
        PdfDocument::new("Report Cards", pt(PAGE_W), pt(PAGE_H), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    for (i, model) in models.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(pt(PAGE_W), pt(PAGE_H), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };
        let painter = Painter {
            layer,
            regular: &regular,
            bold: &bold,
        };
        draw_page(&painter, model, logo.as_ref());
    }

    doc.save_to_bytes().map_err(pdf_err)
}

pub fn generate(
    models: &[ReportCardModel],
    settings: &SchoolSettings,
    out_dir: &Path,
    filename: &str,
) -> Result<PathBuf, StoreError> {
    let bytes = render(models, settings)?;
    fs::create_dir_all(out_dir).map_err(pdf_err)?;
    let path = out_dir.join(filename);
    fs::write(&path, &bytes).map_err(pdf_err)?;
    Ok(path)
}
