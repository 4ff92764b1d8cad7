//! crates/flower_timer_core/src/render.rs
//!
//! Pure SVG rendering for each species at each growth stage.
//! Every species is described by a small `FlowerArt` value; drawing takes only
//! that description and the stage, nothing else.

use crate::domain::{FlowerRecord, GrowthStage, Species};

const VIEW_WIDTH: f64 = 200.0;
const CENTER_X: f64 = 100.0;
const SOIL_Y: f64 = 270.0;
const STEM_COLOR: &str = "#228B22";
const LEAF_COLOR: &str = "#2E8B57";
const SOIL_COLOR: &str = "#8B7355";
const SEED_COLOR: &str = "#D4A574";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetalShape {
    /// Wide rounded petals around a center.
    Round,
    /// Long narrow petals.
    Pointed,
    /// Three overlapping upright petals.
    Cup,
    /// Tiny florets stacked along the stem tip.
    Spike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowerArt {
    pub petal_color: &'static str,
    pub center_color: &'static str,
    pub petal_count: u32,
    pub shape: PetalShape,
}

impl Species {
    pub fn art(&self) -> FlowerArt {
        match self {
            Species::Rose => FlowerArt {
                petal_color: "#E63946",
                center_color: "#9D0208",
                petal_count: 8,
                shape: PetalShape::Round,
            },
            Species::Sunflower => FlowerArt {
                petal_color: "#FFD60A",
                center_color: "#6F4518",
                petal_count: 16,
                shape: PetalShape::Pointed,
            },
            Species::Tulip => FlowerArt {
                petal_color: "#FF70A6",
                center_color: "#FFD6E0",
                petal_count: 3,
                shape: PetalShape::Cup,
            },
            Species::Daisy => FlowerArt {
                petal_color: "#FFFFFF",
                center_color: "#FFC300",
                petal_count: 12,
                shape: PetalShape::Pointed,
            },
            Species::Lavender => FlowerArt {
                petal_color: "#9B5DE5",
                center_color: "#7B2CBF",
                petal_count: 9,
                shape: PetalShape::Spike,
            },
            Species::Lotus => FlowerArt {
                petal_color: "#FFAFCC",
                center_color: "#FFE066",
                petal_count: 8,
                shape: PetalShape::Pointed,
            },
            Species::Cherry => FlowerArt {
                petal_color: "#FFC8DD",
                center_color: "#FF006E",
                petal_count: 5,
                shape: PetalShape::Round,
            },
            Species::Poppy => FlowerArt {
                petal_color: "#F94144",
                center_color: "#1B1B1E",
                petal_count: 4,
                shape: PetalShape::Round,
            },
        }
    }
}

fn stem_top(stage: GrowthStage) -> Option<f64> {
    match stage {
        GrowthStage::Seed => None,
        GrowthStage::Sprout => Some(235.0),
        GrowthStage::SmallStem => Some(190.0),
        GrowthStage::Growing => Some(140.0),
        GrowthStage::Budding | GrowthStage::Opening | GrowthStage::Blooming => Some(100.0),
    }
}

/// Draws `species` at `stage` as a standalone SVG document.
pub fn render_svg(species: Species, stage: GrowthStage) -> String {
    let art = species.art();
    let mut parts = vec![format!(
        r#"<rect x="0" y="{SOIL_Y}" width="{VIEW_WIDTH}" height="30" fill="{SOIL_COLOR}" rx="5"/>"#
    )];

    if stage <= GrowthStage::Sprout {
        parts.push(format!(
            r#"<ellipse class="seed" cx="{CENTER_X}" cy="265" rx="8" ry="10" fill="{SEED_COLOR}"/>"#
        ));
    }

    if let Some(top) = stem_top(stage) {
        parts.push(format!(
            r#"<path class="stem" d="M {CENTER_X} 262 Q 105 {mid:.1}, {CENTER_X} {top:.1}" stroke="{STEM_COLOR}" stroke-width="6" fill="none" stroke-linecap="round"/>"#,
            mid = (262.0 + top) / 2.0,
        ));
        if stage >= GrowthStage::SmallStem {
            parts.push(leaves(top));
        }
        match stage {
            GrowthStage::Budding => parts.push(bud(&art, top)),
            GrowthStage::Opening => parts.push(bloom(&art, top, 0.6)),
            GrowthStage::Blooming => parts.push(bloom(&art, top, 1.0)),
            _ => {}
        }
    }

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 300" class="flower {species} stage-{index}">{body}</svg>"#,
        index = stage.index(),
        body = parts.concat(),
    )
}

/// A garden card always shows the flower in full bloom.
pub fn render_card(record: &FlowerRecord) -> String {
    render_svg(record.species, GrowthStage::Blooming)
}

fn leaves(stem_top: f64) -> String {
    let y = (SOIL_Y + stem_top) / 2.0 + 15.0;
    format!(
        r#"<g class="leaves"><ellipse cx="82" cy="{y:.1}" rx="16" ry="7" fill="{LEAF_COLOR}" transform="rotate(-30 82 {y:.1})"/><ellipse cx="118" cy="{ly:.1}" rx="16" ry="7" fill="{LEAF_COLOR}" transform="rotate(30 118 {ly:.1})"/></g>"#,
        ly = y - 18.0,
    )
}

fn bud(art: &FlowerArt, top: f64) -> String {
    format!(
        r#"<ellipse class="bud" cx="{CENTER_X}" cy="{cy:.1}" rx="9" ry="15" fill="{color}"/>"#,
        cy = top - 12.0,
        color = art.petal_color,
    )
}

fn bloom(art: &FlowerArt, top: f64, scale: f64) -> String {
    let cy = top - 10.0 * scale;
    let mut petals = String::new();
    match art.shape {
        PetalShape::Round | PetalShape::Pointed => {
            let (rx, ry, offset) = match art.shape {
                PetalShape::Round => (14.0 * scale, 14.0 * scale, 14.0 * scale),
                _ => (5.0 * scale, 20.0 * scale, 20.0 * scale),
            };
            for i in 0..art.petal_count {
                let angle = 360.0 * f64::from(i) / f64::from(art.petal_count);
                petals.push_str(&format!(
                    r#"<ellipse cx="{CENTER_X}" cy="{py:.1}" rx="{rx:.1}" ry="{ry:.1}" fill="{color}" transform="rotate({angle:.1} {CENTER_X} {cy:.1})"/>"#,
                    py = cy - offset,
                    color = art.petal_color,
                ));
            }
            petals.push_str(&format!(
                r#"<circle cx="{CENTER_X}" cy="{cy:.1}" r="{r:.1}" fill="{color}"/>"#,
                r = 9.0 * scale,
                color = art.center_color,
            ));
        }
        PetalShape::Cup => {
            for angle in [-22.0, 22.0, 0.0] {
                petals.push_str(&format!(
                    r#"<ellipse cx="{CENTER_X}" cy="{cy:.1}" rx="{rx:.1}" ry="{ry:.1}" fill="{color}" transform="rotate({angle:.1} {CENTER_X} {base:.1})"/>"#,
                    rx = 12.0 * scale,
                    ry = 24.0 * scale,
                    base = top,
                    color = art.petal_color,
                ));
            }
        }
        PetalShape::Spike => {
            for i in 0..art.petal_count {
                let y = top - 6.0 * f64::from(i) * scale;
                let color = if i % 2 == 0 {
                    art.petal_color
                } else {
                    art.center_color
                };
                petals.push_str(&format!(
                    r#"<circle cx="{x:.1}" cy="{y:.1}" r="{r:.1}" fill="{color}"/>"#,
                    x = if i % 2 == 0 { CENTER_X - 3.0 } else { CENTER_X + 3.0 },
                    r = 5.0 * scale,
                ));
            }
        }
    }
    format!(r#"<g class="bloom">{petals}</g>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_no_stem() {
        let svg = render_svg(Species::Rose, GrowthStage::Seed);
        assert!(svg.contains(r#"class="seed""#));
        assert!(!svg.contains("stem"));
        assert!(svg.contains("stage-0"));
    }

    #[test]
    fn bloom_uses_species_colors() {
        for species in Species::ALL {
            let art = species.art();
            let svg = render_svg(species, GrowthStage::Blooming);
            assert!(svg.contains(art.petal_color), "{species} petals");
            assert!(svg.contains("stage-6"));
            assert!(!svg.contains(r#"class="seed""#));
        }
    }

    #[test]
    fn round_flowers_draw_every_petal() {
        let svg = render_svg(Species::Poppy, GrowthStage::Blooming);
        let petals = svg.matches(r##"fill="#F94144""##).count();
        assert_eq!(petals, 4);
    }

    #[test]
    fn stages_add_parts_progressively() {
        let budding = render_svg(Species::Tulip, GrowthStage::Budding);
        assert!(budding.contains(r#"class="bud""#));
        assert!(budding.contains(r#"class="leaves""#));
        assert!(!budding.contains(r#"class="bloom""#));

        let sprout = render_svg(Species::Tulip, GrowthStage::Sprout);
        assert!(sprout.contains(r#"class="stem""#));
        assert!(!sprout.contains(r#"class="leaves""#));
    }
}
