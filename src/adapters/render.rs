//! Visual QA overlay: ducts, dampers, and their associations drawn on top of
//! the rendered worksheet image.

use crate::core::geometry::distance_to_duct;
use crate::domain::model::{Damper, FeatureSet, Mapping, Point, WorksheetMeta};
use crate::utils::error::{AssociationError, Result};
use ab_glyph::FontRef;
use image::{imageops::FilterType, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_text_mut,
};
use std::path::{Path, PathBuf};

const DUCT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const CONNECTOR_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const BORDER_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const UNASSIGNED_RING_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
const LABEL_SCALE: f32 = 14.0;
const CONFIDENCE_SCALE: f32 = 12.0;
const TITLE_SCALE: f32 = 28.0;

/// The font embedded in the binary, used for every overlay label.
pub fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT).map_err(|e| AssociationError::ProcessingError {
        message: format!("Embedded label font is unreadable: {}", e),
    })
}

/// Maps drawing (page) coordinates to pixels of the zoomed worksheet image.
/// The page y axis points up, the image y axis points down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub zoom: f64,
}

impl PageTransform {
    pub fn from_meta(meta: &WorksheetMeta, zoom: u32) -> Result<Self> {
        if meta.fe_width <= 0.0 || meta.fe_height <= 0.0 {
            return Err(AssociationError::ValidationError {
                message: format!(
                    "Worksheet metadata has non-positive frontend size {}x{}",
                    meta.fe_width, meta.fe_height
                ),
            });
        }

        Ok(Self {
            scale_x: meta.page_width / meta.fe_width,
            scale_y: meta.page_height / meta.fe_height,
            zoom: f64::from(zoom),
        })
    }

    pub fn to_pixel(&self, point: Point) -> (f32, f32) {
        (
            (point.x * self.scale_x * self.zoom) as f32,
            (-point.y * self.scale_y * self.zoom) as f32,
        )
    }
}

/// Fill color and radius for a damper symbol, keyed by detected type.
pub fn damper_style(kind: Option<&str>) -> (Rgb<u8>, i32) {
    match kind {
        Some("CRD") => (Rgb([255, 0, 0]), 8),
        Some("MVD") => (Rgb([0, 255, 0]), 10),
        _ => (Rgb([255, 165, 0]), 6),
    }
}

fn draw_thick_line(image: &mut RgbImage, start: (f32, f32), end: (f32, f32), color: Rgb<u8>) {
    draw_line_segment_mut(image, start, end, color);
    // 第二條偏移一像素，線寬約為 2
    let (ox, oy) = if (end.0 - start.0).abs() >= (end.1 - start.1).abs() {
        (0.0, 1.0)
    } else {
        (1.0, 0.0)
    };
    draw_line_segment_mut(
        image,
        (start.0 + ox, start.1 + oy),
        (end.0 + ox, end.1 + oy),
        color,
    );
}

fn draw_damper(image: &mut RgbImage, damper: &Damper, center: (i32, i32), assigned: bool) {
    let (color, radius) = damper_style(damper.kind.as_deref());
    draw_filled_circle_mut(image, center, radius, color);
    draw_hollow_circle_mut(image, center, radius, BORDER_COLOR);
    if !assigned {
        draw_hollow_circle_mut(image, center, radius + 3, UNASSIGNED_RING_COLOR);
    }
}

/// `id:type` above-right of the symbol, confidence just below it.
fn draw_damper_label(
    image: &mut RgbImage,
    font: &FontRef<'_>,
    damper: &Damper,
    center: (i32, i32),
) {
    let (x, y) = center;
    let label = format!(
        "{}:{}",
        damper.id,
        damper.kind.as_deref().unwrap_or("Unknown")
    );
    draw_text_mut(image, TEXT_COLOR, x + 10, y - 22, LABEL_SCALE, font, &label);

    let confidence = format!("{:.2}", damper.confidence.unwrap_or(0.0));
    draw_text_mut(image, TEXT_COLOR, x + 10, y - 4, CONFIDENCE_SCALE, font, &confidence);
}

/// Draws ducts, association connectors, dampers with their labels, and the
/// worksheet title onto `image`.
pub fn draw_overlay(
    image: &mut RgbImage,
    features: &FeatureSet,
    mapping: &Mapping,
    transform: &PageTransform,
    extension_distance: f64,
) -> Result<()> {
    let font = label_font()?;

    for duct in &features.ducts {
        for segment in duct.segments() {
            draw_thick_line(
                image,
                transform.to_pixel(segment.start),
                transform.to_pixel(segment.end),
                DUCT_COLOR,
            );
        }
    }

    for damper in &features.dampers {
        let Some(duct_id) = mapping.get(&damper.id).and_then(|a| a.duct_id()) else {
            continue;
        };
        let Some(duct) = features.ducts.iter().find(|d| d.id == duct_id) else {
            continue;
        };
        if let Some(measured) = distance_to_duct(damper.location, duct, extension_distance) {
            draw_line_segment_mut(
                image,
                transform.to_pixel(damper.location),
                transform.to_pixel(measured.foot),
                CONNECTOR_COLOR,
            );
        }
    }

    for damper in &features.dampers {
        let (x, y) = transform.to_pixel(damper.location);
        let assigned = mapping
            .get(&damper.id)
            .map(|a| a.is_assigned())
            .unwrap_or(false);
        let center = (x as i32, y as i32);
        draw_damper(image, damper, center, assigned);
        draw_damper_label(image, &font, damper, center);
    }

    let title = format!(
        "Ducts (Blue) and Dampers - Worksheet: {}",
        features.worksheet_id
    );
    draw_text_mut(image, TEXT_COLOR, 10, 8, TITLE_SCALE, &font, &title);

    Ok(())
}

/// Decodes the worksheet image and draws the overlay on it.
pub fn render_overlay(
    image_bytes: &[u8],
    features: &FeatureSet,
    mapping: &Mapping,
    transform: &PageTransform,
    extension_distance: f64,
) -> Result<RgbImage> {
    let mut image = image::load_from_memory(image_bytes)?.to_rgb8();
    tracing::debug!(
        "Decoded worksheet image {}x{}",
        image.width(),
        image.height()
    );
    draw_overlay(&mut image, features, mapping, transform, extension_distance)?;
    Ok(image)
}

/// Saves the full-size overlay and a downscaled copy. Returns both paths.
pub fn save_overlay(
    image: &RgbImage,
    output_dir: &Path,
    worksheet_id: &str,
    scale_down: f64,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output_dir)?;

    let full_path = output_dir.join(format!("ducts_dampers_visualization_{}.jpg", worksheet_id));
    image.save(&full_path)?;

    let width = ((f64::from(image.width()) * scale_down) as u32).max(1);
    let height = ((f64::from(image.height()) * scale_down) as u32).max(1);
    let small = image::imageops::resize(image, width, height, FilterType::Triangle);
    let small_path = output_dir.join(format!(
        "ducts_dampers_visualization_{}_small.jpg",
        worksheet_id
    ));
    small.save(&small_path)?;

    Ok((full_path, small_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Assignment, Duct};
    use tempfile::TempDir;

    fn identity() -> PageTransform {
        PageTransform {
            scale_x: 1.0,
            scale_y: 1.0,
            zoom: 1.0,
        }
    }

    fn features() -> FeatureSet {
        let mut crd = Damper::new("crd", Point::new(20.0, -50.0));
        crd.kind = Some("CRD".to_string());
        let lonely = Damper::new("lonely", Point::new(80.0, -80.0));

        FeatureSet {
            worksheet_id: "ws".to_string(),
            ducts: vec![Duct::new(
                "duct",
                vec![Point::new(10.0, -10.0), Point::new(10.0, -90.0)],
            )],
            dampers: vec![crd, lonely],
        }
    }

    #[test]
    fn test_page_transform_scales_and_flips() {
        let meta = WorksheetMeta {
            page_width: 200.0,
            page_height: 100.0,
            fe_width: 100.0,
            fe_height: 100.0,
        };
        let transform = PageTransform::from_meta(&meta, 2).unwrap();
        assert_eq!(transform.to_pixel(Point::new(10.0, -5.0)), (40.0, 10.0));
    }

    #[test]
    fn test_page_transform_rejects_empty_frontend_size() {
        let meta = WorksheetMeta {
            page_width: 200.0,
            page_height: 100.0,
            fe_width: 0.0,
            fe_height: 100.0,
        };
        assert!(PageTransform::from_meta(&meta, 2).is_err());
    }

    #[test]
    fn test_damper_style_by_kind() {
        assert_eq!(damper_style(Some("CRD")), (Rgb([255, 0, 0]), 8));
        assert_eq!(damper_style(Some("MVD")), (Rgb([0, 255, 0]), 10));
        assert_eq!(damper_style(None).1, 6);
    }

    #[test]
    fn test_draw_overlay_paints_ducts_dampers_and_connectors() {
        let mut image = RgbImage::new(100, 100);
        let mut mapping = Mapping::new();
        mapping.insert("crd".to_string(), Assignment::Duct("duct".to_string()));
        mapping.insert("lonely".to_string(), Assignment::Unassigned);

        draw_overlay(&mut image, &features(), &mapping, &identity(), 13.0).unwrap();

        // 管線
        assert_eq!(*image.get_pixel(10, 70), DUCT_COLOR);
        // 風門中心
        assert_eq!(*image.get_pixel(20, 50), Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(80, 80), Rgb([255, 165, 0]));
        // 連接線落在風門與管線之間
        assert_eq!(*image.get_pixel(11, 50), CONNECTOR_COLOR);
    }

    fn labelled(id: &str, confidence: f64) -> RgbImage {
        let mut damper = Damper::new(id, Point::new(30.0, -100.0));
        damper.kind = Some("CRD".to_string());
        damper.confidence = Some(confidence);
        let features = FeatureSet {
            worksheet_id: "ws".to_string(),
            ducts: Vec::new(),
            dampers: vec![damper],
        };

        let mut image = RgbImage::new(240, 160);
        draw_overlay(&mut image, &features, &Mapping::new(), &identity(), 13.0).unwrap();
        image
    }

    fn painted_in(image: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y).0 != [0, 0, 0])
            .count()
    }

    #[test]
    fn test_labels_show_id_type_and_confidence() {
        let short = labelled("A", 0.10);
        let long = labelled("VD-0042", 0.99);

        // 標籤區：風門右上方與右側
        assert!(painted_in(&short, 40..200, 78..96) > 0);
        assert!(painted_in(&short, 40..100, 96..112) > 0);
        assert_ne!(short, long);
        // 信心值不同，下方數字區也不同
        let confidence_area = |image: &RgbImage| {
            (96..112)
                .flat_map(|y| (40..100).map(move |x| (x, y)))
                .map(|(x, y)| image.get_pixel(x, y).0)
                .collect::<Vec<_>>()
        };
        assert_ne!(confidence_area(&short), confidence_area(&long));
    }

    #[test]
    fn test_title_is_drawn_along_the_top() {
        let image = labelled("A", 0.5);
        assert!(painted_in(&image, 10..230, 8..36) > 0);
    }

    #[test]
    fn test_embedded_font_loads() {
        assert!(label_font().is_ok());
    }

    #[test]
    fn test_render_and_save_overlay() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        RgbImage::new(64, 48)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();

        let image = render_overlay(
            buffer.get_ref(),
            &features(),
            &Mapping::new(),
            &identity(),
            13.0,
        )
        .unwrap();
        assert_eq!(image.dimensions(), (64, 48));

        let dir = TempDir::new().unwrap();
        let (full, small) = save_overlay(&image, dir.path(), "ws", 0.5).unwrap();
        assert!(full.exists());
        assert!(small.exists());
        let reloaded = image::open(&small).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (32, 24));
    }
}
