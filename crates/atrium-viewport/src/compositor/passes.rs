/// Buffer dimensions in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PassSize {
    pub width: u32,
    pub height: u32,
}

/// Quality preset for the anti-aliasing effect.
///
/// Higher presets widen the edge search span the shader walks per pixel.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SmaaPreset {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl SmaaPreset {
    /// Edge search span in texels.
    pub fn search_span(self) -> u32 {
        match self {
            SmaaPreset::Low => 4,
            SmaaPreset::Medium => 8,
            SmaaPreset::High => 16,
            SmaaPreset::Ultra => 32,
        }
    }
}

/// Which signal the edge-detection stage reads.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EdgeDetectionMode {
    Depth,
    Luma,
    #[default]
    Color,
}

/// Predication sharpens edge detection using a secondary signal.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PredicationMode {
    Disabled,
    #[default]
    Depth,
    Custom,
}

/// Anti-aliasing effect configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AaSettings {
    pub preset: SmaaPreset,
    pub edge_detection: EdgeDetectionMode,
    pub predication: PredicationMode,
    /// Contrast above which a pixel counts as an edge.
    pub edge_threshold: f32,
    /// Threshold for the predication signal.
    pub predication_threshold: f32,
    /// Multiplier applied to the edge threshold where predication fires.
    pub predication_scale: f32,
}

impl Default for AaSettings {
    fn default() -> Self {
        Self {
            preset: SmaaPreset::High,
            edge_detection: EdgeDetectionMode::Color,
            predication: PredicationMode::Depth,
            edge_threshold: 0.02,
            predication_threshold: 0.002,
            predication_scale: 1.0,
        }
    }
}

/// Base pass rendering the scene into the composer's offscreen target.
#[derive(Debug, Default)]
pub struct ScenePass {
    size: PassSize,
}

/// The anti-aliasing effect pass.
#[derive(Debug)]
pub struct AaPass {
    pub settings: AaSettings,
    size: PassSize,
}

impl AaPass {
    pub fn new(settings: AaSettings) -> Self {
        Self {
            settings,
            size: PassSize::default(),
        }
    }
}

/// Pass-through copy. Held disabled but sized, ready to stand in for the
/// effect pass without a reallocation.
#[derive(Debug, Default)]
pub struct CopyPass {
    pub enabled: bool,
    size: PassSize,
}

/// Final pass writing to the screen.
#[derive(Debug, Default)]
pub struct OutputPass {
    size: PassSize,
}

macro_rules! sized_pass {
    ($($pass:ty),+) => {$(
        impl $pass {
            pub fn set_size(&mut self, width: u32, height: u32) {
                self.size = PassSize { width, height };
            }

            pub fn size(&self) -> PassSize {
                self.size
            }
        }
    )+};
}

sized_pass!(ScenePass, AaPass, CopyPass, OutputPass);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_widen_the_search_span() {
        assert!(SmaaPreset::Low.search_span() < SmaaPreset::Medium.search_span());
        assert!(SmaaPreset::Medium.search_span() < SmaaPreset::High.search_span());
        assert!(SmaaPreset::High.search_span() < SmaaPreset::Ultra.search_span());
    }

    #[test]
    fn default_settings_match_the_tuned_values() {
        let s = AaSettings::default();
        assert_eq!(s.preset, SmaaPreset::High);
        assert_eq!(s.edge_detection, EdgeDetectionMode::Color);
        assert_eq!(s.predication, PredicationMode::Depth);
        assert!((s.edge_threshold - 0.02).abs() < 1e-9);
        assert!((s.predication_threshold - 0.002).abs() < 1e-9);
        assert!((s.predication_scale - 1.0).abs() < 1e-9);
    }
}
