// ============================================================================
// POINTER INTERACTION — drag-to-move and drag-to-crop state machine
// ============================================================================

use crate::error::{Result, WatermarkError};
use crate::geometry::{CropRegion, ImagePoint, Position};

/// What a primary-button drag on the canvas does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Drag moves the watermark.
    #[default]
    Watermark,
    /// Drag selects a crop rectangle.
    Crop,
}

impl EditMode {
    pub fn label(&self) -> &'static str {
        match self {
            EditMode::Watermark => "Watermark",
            EditMode::Crop => "Crop",
        }
    }
}

/// The gesture in progress. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Moving the watermark. `origin` is where the pointer went down,
    /// `start_position` the watermark position at that moment.
    Dragging {
        origin: ImagePoint,
        start_position: Position,
    },
    /// Selecting a crop rectangle from `start` to `current`.
    Cropping {
        start: ImagePoint,
        current: ImagePoint,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::Cropping { .. } => "cropping",
        }
    }
}

/// Result of feeding a pointer move into the state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveOutcome {
    /// Nothing in progress; the move is ignored.
    None,
    /// The watermark moved to this position.
    Moved(Position),
    /// The crop rectangle's free corner moved.
    CropUpdated(CropRegion),
}

/// Edit mode, current gesture and the pending crop selection.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    mode: EditMode,
    state: InteractionState,
    /// Survives the end of the crop gesture until confirmed or discarded.
    pending_crop: Option<CropRegion>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn crop_region(&self) -> Option<CropRegion> {
        self.pending_crop
    }

    /// Switch between moving the watermark and selecting a crop.
    /// Only legal while no gesture is in progress. Leaving crop mode
    /// discards the pending selection.
    pub fn set_mode(&mut self, mode: EditMode) -> Result<()> {
        if !self.is_idle() {
            return Err(WatermarkError::Busy(self.state.name()));
        }
        if mode != EditMode::Crop {
            self.pending_crop = None;
        }
        self.mode = mode;
        Ok(())
    }

    /// Begin a gesture at `point`. Ignored unless idle.
    pub fn pointer_down(&mut self, point: ImagePoint, position: Position) {
        if !self.is_idle() {
            return;
        }
        self.state = match self.mode {
            EditMode::Watermark => InteractionState::Dragging {
                origin: point,
                start_position: position,
            },
            EditMode::Crop => {
                self.pending_crop = Some(CropRegion::new(point, point));
                InteractionState::Cropping { start: point, current: point }
            }
        };
    }

    /// Advance the current gesture. `bitmap_w`/`bitmap_h` are the image's
    /// pixel dimensions, used to turn a pixel delta into a percentage.
    pub fn pointer_move(&mut self, point: ImagePoint, bitmap_w: u32, bitmap_h: u32) -> MoveOutcome {
        match self.state {
            InteractionState::Idle => MoveOutcome::None,
            InteractionState::Dragging { origin, start_position } => {
                let dx = axis_delta(point.x - origin.x, bitmap_w);
                let dy = axis_delta(point.y - origin.y, bitmap_h);
                MoveOutcome::Moved(Position::new(start_position.x() + dx, start_position.y() + dy))
            }
            InteractionState::Cropping { start, .. } => {
                self.state = InteractionState::Cropping { start, current: point };
                let region = CropRegion::new(start, point);
                self.pending_crop = Some(region);
                MoveOutcome::CropUpdated(region)
            }
        }
    }

    /// End whatever gesture is in progress. Safe to call in any state.
    pub fn pointer_up(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Forget the pending crop selection and stop any crop gesture.
    pub fn clear_crop(&mut self) {
        if matches!(self.state, InteractionState::Cropping { .. }) {
            self.state = InteractionState::Idle;
        }
        self.pending_crop = None;
    }

    /// Drop everything: back to idle watermark mode with no selection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn axis_delta(pixels: f32, dimension: u32) -> f32 {
    if dimension == 0 { 0.0 } else { pixels / dimension as f32 * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> ImagePoint {
        ImagePoint::new(x, y)
    }

    #[test]
    fn drag_moves_by_percentage_of_bitmap() {
        let mut ix = Interaction::new();
        ix.pointer_down(pt(100.0, 100.0), Position::new(50.0, 50.0));
        assert!(matches!(ix.state(), InteractionState::Dragging { .. }));

        let out = ix.pointer_move(pt(120.0, 90.0), 200, 100);
        assert_eq!(out, MoveOutcome::Moved(Position::new(60.0, 40.0)));

        // Deltas are measured from the origin, not accumulated
        let out = ix.pointer_move(pt(100.0, 100.0), 200, 100);
        assert_eq!(out, MoveOutcome::Moved(Position::new(50.0, 50.0)));
    }

    #[test]
    fn drag_result_is_clamped_per_axis() {
        let mut ix = Interaction::new();
        ix.pointer_down(pt(0.0, 0.0), Position::new(90.0, 10.0));
        for (dx, dy) in [(1e6, -1e6), (-1e6, 1e6), (30.0, -30.0), (-500.0, 0.0)] {
            match ix.pointer_move(pt(dx, dy), 100, 100) {
                MoveOutcome::Moved(p) => {
                    assert!((0.0..=100.0).contains(&p.x()));
                    assert!((0.0..=100.0).contains(&p.y()));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        let out = ix.pointer_move(pt(30.0, -30.0), 100, 100);
        assert_eq!(out, MoveOutcome::Moved(Position::new(100.0, 0.0)));
    }

    #[test]
    fn crop_gesture_tracks_free_corner() {
        let mut ix = Interaction::new();
        ix.set_mode(EditMode::Crop).unwrap();
        ix.pointer_down(pt(10.0, 10.0), Position::default());
        assert_eq!(ix.crop_region(), Some(CropRegion::new(pt(10.0, 10.0), pt(10.0, 10.0))));

        // No clamping to the bitmap bounds here
        let out = ix.pointer_move(pt(-40.0, 500.0), 200, 200);
        assert_eq!(out, MoveOutcome::CropUpdated(CropRegion::new(pt(10.0, 10.0), pt(-40.0, 500.0))));

        ix.pointer_up();
        assert!(ix.is_idle());
        assert_eq!(ix.crop_region().map(|r| r.end), Some(pt(-40.0, 500.0)));
    }

    #[test]
    fn pointer_up_always_returns_to_idle() {
        let mut ix = Interaction::new();
        ix.pointer_up();
        assert!(ix.is_idle());

        ix.pointer_down(pt(1.0, 1.0), Position::default());
        ix.pointer_up();
        assert!(ix.is_idle());

        ix.set_mode(EditMode::Crop).unwrap();
        ix.pointer_down(pt(1.0, 1.0), Position::default());
        ix.pointer_up();
        assert!(ix.is_idle());
    }

    #[test]
    fn mode_switch_refused_mid_gesture() {
        let mut ix = Interaction::new();
        ix.pointer_down(pt(1.0, 1.0), Position::default());
        assert!(matches!(ix.set_mode(EditMode::Crop), Err(WatermarkError::Busy("dragging"))));
        assert_eq!(ix.mode(), EditMode::Watermark);
        ix.pointer_up();
        assert!(ix.set_mode(EditMode::Crop).is_ok());
    }

    #[test]
    fn second_pointer_down_is_ignored() {
        let mut ix = Interaction::new();
        ix.pointer_down(pt(5.0, 5.0), Position::new(20.0, 20.0));
        ix.pointer_down(pt(50.0, 50.0), Position::new(80.0, 80.0));
        assert_eq!(
            ix.state(),
            InteractionState::Dragging { origin: pt(5.0, 5.0), start_position: Position::new(20.0, 20.0) }
        );
    }

    #[test]
    fn leaving_crop_mode_discards_selection() {
        let mut ix = Interaction::new();
        ix.set_mode(EditMode::Crop).unwrap();
        ix.pointer_down(pt(0.0, 0.0), Position::default());
        ix.pointer_move(pt(20.0, 20.0), 100, 100);
        ix.pointer_up();
        ix.set_mode(EditMode::Watermark).unwrap();
        assert_eq!(ix.crop_region(), None);
    }

    #[test]
    fn idle_move_is_ignored() {
        let mut ix = Interaction::new();
        assert_eq!(ix.pointer_move(pt(3.0, 3.0), 10, 10), MoveOutcome::None);
    }
}
