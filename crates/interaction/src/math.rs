use serde::{Deserialize, Serialize};

const NORMALIZE_EPSILON: f32 = 1.0e-8;
const NEAR_PLANE: f32 = 1.0e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const FORWARD: Self = Self::new(1.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        other.sub(self).length()
    }

    pub fn safe_normal(self) -> Self {
        let length_sq = self.length_squared();
        if length_sq <= NORMALIZE_EPSILON {
            return Self::ZERO;
        }
        self.scale(length_sq.sqrt().recip())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPoint {
    pub location: Vec3,
    pub forward: Vec3,
}

impl Default for ViewPoint {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            forward: Vec3::FORWARD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub location: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            forward: Vec3::FORWARD,
            up: Vec3::UP,
            fov_degrees: 90.0,
        }
    }
}

impl CameraView {
    pub fn from_view_point(view_point: ViewPoint) -> Self {
        Self {
            location: view_point.location,
            forward: view_point.forward,
            ..Self::default()
        }
    }
}

/// Pinhole projection into pixel space. Origin is top-left, +y points down.
/// Returns `None` for points on or behind the camera plane.
pub fn project_world_to_screen(camera: &CameraView, viewport: Viewport, point: Vec3) -> Option<Vec2> {
    let forward = camera.forward.safe_normal();
    if forward == Vec3::ZERO {
        return None;
    }
    let mut right = forward.cross(camera.up).safe_normal();
    if right == Vec3::ZERO {
        right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).safe_normal();
    }
    let up = right.cross(forward);

    let relative = point.sub(camera.location);
    let depth = relative.dot(forward);
    if depth <= NEAR_PLANE {
        return None;
    }

    let half_fov = (camera.fov_degrees.clamp(1.0, 179.0) * 0.5).to_radians();
    let focal_px = viewport.width as f32 * 0.5 / half_fov.tan();
    let center = viewport.center();
    Some(Vec2 {
        x: center.x + relative.dot(right) / depth * focal_px,
        y: center.y - relative.dot(up) / depth * focal_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_normal_of_zero_is_zero() {
        assert_eq!(Vec3::ZERO.safe_normal(), Vec3::ZERO);
        let unit = Vec3::new(3.0, 0.0, 4.0).safe_normal();
        assert!((unit.length() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn point_on_view_axis_projects_to_viewport_center() {
        let camera = CameraView::default();
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let screen =
            project_world_to_screen(&camera, viewport, Vec3::new(10.0, 0.0, 0.0)).expect("screen");
        assert!((screen.x - 400.0).abs() < 0.001);
        assert!((screen.y - 300.0).abs() < 0.001);
    }

    #[test]
    fn point_behind_camera_does_not_project() {
        let camera = CameraView::default();
        assert!(project_world_to_screen(&camera, Viewport::default(), Vec3::new(-5.0, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn offsets_map_to_expected_screen_directions() {
        let camera = CameraView::default();
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        // fov 90: focal length is half the viewport width.
        let above =
            project_world_to_screen(&camera, viewport, Vec3::new(10.0, 0.0, 5.0)).expect("above");
        assert!((above.x - 400.0).abs() < 0.001);
        assert!((above.y - 100.0).abs() < 0.001);

        let side = project_world_to_screen(&camera, viewport, Vec3::new(10.0, 5.0, 0.0))
            .expect("side");
        assert!((side.x - 400.0).abs() > 100.0);
        assert!((side.y - 300.0).abs() < 0.001);
    }
}
