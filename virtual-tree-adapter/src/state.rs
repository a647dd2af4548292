/// What the engine knows about the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    /// Scroll offset of the viewport's leading edge.
    pub offset: u64,
    /// Length of the viewport along the scroll axis.
    pub extent: u64,
    /// Whether the surface is shown at all. A hidden engine skips recomputes.
    pub visible: bool,
}

impl ViewportState {
    pub fn new(offset: u64, extent: u64) -> Self {
        Self {
            offset,
            extent,
            visible: true,
        }
    }

    /// A recompute only has an effect when this is `true`.
    pub fn is_observable(&self) -> bool {
        self.visible && self.extent > 0
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// What one recompute did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSummary {
    /// Items in the window afterwards.
    pub visible: usize,
    pub entered: usize,
    pub left: usize,
    pub kept: usize,
    /// Entering items that needed a new resource.
    pub created: usize,
    /// Entering items served from a pool.
    pub reused: usize,
    /// Entering items whose pooled resource was parked under their own key.
    pub exact: usize,
}
