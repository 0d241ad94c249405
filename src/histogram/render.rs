use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::{models::Timeline, settings::RenderSettings};

use super::{bar_height, HistogramModel, BAR_WIDTH};

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Paints histogram bars onto an RGBA surface, bottom-aligned.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: Rgba<u8>,
}

impl Renderer {
    pub fn new(color: [u8; 4]) -> Self {
        Self {
            color: Rgba(color),
        }
    }

    /// Clears `surface` and draws one bar per non-empty bin. Non-empty bins
    /// are always at least one pixel tall.
    pub fn draw(&self, surface: &mut RgbaImage, model: &HistogramModel) {
        for pixel in surface.pixels_mut() {
            *pixel = CLEAR;
        }

        let (width, height) = surface.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let available = height as f64;
        let max_count = model.max_count();

        for (bin, &count) in model.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }

            let bar = bar_height(count, max_count, available).max(1.0).min(available);
            let top = (available - bar).round() as u32;
            let left = bin as u32 * BAR_WIDTH;
            if left >= width {
                break;
            }
            let right = (left + BAR_WIDTH).min(width);

            for x in left..right {
                for y in top..height {
                    surface.put_pixel(x, y, self.color);
                }
            }
        }
    }
}

/// Keeps the last fetched timeline and redraws it on demand, so a resize
/// never needs a new fetch.
pub struct GraphView {
    renderer: Renderer,
    surface: RgbaImage,
    timeline: Option<Timeline>,
}

impl GraphView {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            renderer: Renderer::new(settings.bar_color),
            surface: RgbaImage::new(settings.width, settings.height),
            timeline: None,
        }
    }

    /// Replaces whatever was shown before.
    pub fn show(&mut self, timeline: Timeline) {
        self.timeline = Some(timeline);
        self.redraw();
    }

    pub fn clear(&mut self) {
        self.timeline = None;
        self.redraw();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.surface.dimensions() != (width, height) {
            self.surface = RgbaImage::new(width, height);
        }
        self.redraw();
    }

    pub fn redraw(&mut self) {
        let model = self.model();
        self.renderer.draw(&mut self.surface, &model);
    }

    /// Histogram for the current timeline at the current width; all-empty
    /// without a timeline.
    pub fn model(&self) -> HistogramModel {
        match &self.timeline {
            Some(timeline) => {
                HistogramModel::build(&timeline.timestamps, timeline.duration, self.surface.width())
            }
            None => HistogramModel::build(&[], 0.0, self.surface.width()),
        }
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.surface
            .save(path)
            .with_context(|| format!("Failed to write graph to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoId;

    const PURPLE: [u8; 4] = [169, 112, 255, 230];

    fn filled_rows(surface: &RgbaImage, x: u32) -> u32 {
        (0..surface.height())
            .filter(|&y| surface.get_pixel(x, y).0 == PURPLE)
            .count() as u32
    }

    #[test]
    fn bars_are_bottom_aligned_and_two_wide() {
        let model = HistogramModel {
            bin_width_secs: 1.0,
            counts: vec![4, 0, 2],
        };
        let mut surface = RgbaImage::new(6, 8);
        Renderer::new(PURPLE).draw(&mut surface, &model);

        assert_eq!(filled_rows(&surface, 0), 8);
        assert_eq!(filled_rows(&surface, 1), 8);
        assert_eq!(filled_rows(&surface, 2), 0);
        assert_eq!(filled_rows(&surface, 3), 0);
        // (2/4)^2 * 8 = 2
        assert_eq!(filled_rows(&surface, 4), 2);
        assert_eq!(*surface.get_pixel(4, 7), Rgba(PURPLE));
        assert_eq!(*surface.get_pixel(4, 5), CLEAR);
    }

    #[test]
    fn tiny_bins_stay_visible() {
        let model = HistogramModel {
            bin_width_secs: 1.0,
            counts: vec![100, 1],
        };
        let mut surface = RgbaImage::new(4, 10);
        Renderer::new(PURPLE).draw(&mut surface, &model);

        assert_eq!(filled_rows(&surface, 2), 1);
    }

    #[test]
    fn draw_clears_previous_contents() {
        let renderer = Renderer::new(PURPLE);
        let mut surface = RgbaImage::new(4, 4);
        renderer.draw(
            &mut surface,
            &HistogramModel {
                bin_width_secs: 1.0,
                counts: vec![1, 1],
            },
        );
        renderer.draw(
            &mut surface,
            &HistogramModel {
                bin_width_secs: 1.0,
                counts: vec![0, 0],
            },
        );

        assert!(surface.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn resize_redraws_from_retained_timeline() {
        let settings = RenderSettings {
            width: 4,
            height: 10,
            bar_color: PURPLE,
        };
        let mut view = GraphView::new(&settings);
        view.show(Timeline::new(VideoId::new("1"), 600.0, vec![5.0, 300.0]));
        assert_eq!(view.model().counts, vec![1, 1]);

        view.resize(8, 10);
        assert_eq!(view.surface().dimensions(), (8, 10));
        assert_eq!(view.model().counts, vec![1, 0, 1, 0]);
        assert_eq!(filled_rows(view.surface(), 0), 10);
        assert_eq!(filled_rows(view.surface(), 4), 10);

        let before = view.surface().clone();
        view.redraw();
        assert_eq!(view.surface(), &before);
    }

    #[test]
    fn clear_blanks_the_surface() {
        let mut view = GraphView::new(&RenderSettings {
            width: 4,
            height: 4,
            bar_color: PURPLE,
        });
        view.show(Timeline::new(VideoId::new("1"), 10.0, vec![1.0]));
        view.clear();

        assert!(view.timeline().is_none());
        assert!(view.surface().pixels().all(|p| *p == CLEAR));
    }
}
