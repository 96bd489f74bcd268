//! Print the palette gradient.

use likelines_common::config::PlayerConfig;
use likelines_heatmap_core::palette::to_hex;
use likelines_heatmap_core::resample::linspace;
use likelines_heatmap_core::Palette;

pub fn run(config: &PlayerConfig, width: usize) -> anyhow::Result<()> {
    let palette = Palette::from_name(config.palette);
    let steps = linspace(0.0, 1.0, width);
    for (value, color) in steps.iter().zip(palette.gradient(width)) {
        println!(
            "{value:.3} {} rgb({}, {}, {})",
            to_hex(color),
            color[0],
            color[1],
            color[2]
        );
    }
    Ok(())
}
