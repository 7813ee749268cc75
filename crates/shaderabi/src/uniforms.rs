use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use serde::Serialize;

/// Expected std140 layout of a uniform block, compared against reflected
/// struct members by declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockLayout {
    pub name: &'static str,
    pub members: &'static [(&'static str, u32)],
    /// Size of the host-side struct, including trailing std140 padding.
    pub size: u32,
}

/// Per-frame camera block (`set = 0, binding = 0`).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraUbo {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

unsafe impl Zeroable for CameraUbo {}
unsafe impl Pod for CameraUbo {}

pub const CAMERA_BLOCK: BlockLayout = BlockLayout {
    name: "CameraUbo",
    members: &[
        ("view", offset_of!(CameraUbo, view) as u32),
        ("proj", offset_of!(CameraUbo, proj) as u32),
    ],
    size: size_of::<CameraUbo>() as u32,
};

impl CameraUbo {
    pub fn new(view: Mat4, proj: Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
        }
    }

    /// Right-handed look-at camera with a Vulkan style (depth 0..1)
    /// perspective projection.
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self::new(
            Self::look_at(eye, target, up),
            Self::projection(fov_y_radians, aspect, near, far),
        )
    }

    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(eye, target, up)
    }

    /// Maps view-space depth `near..far` to clip depth `0..1`.
    pub fn projection(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(fov_y_radians, aspect, near, far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.proj)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }
}

impl Default for CameraUbo {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Bit mask stored in [`MeshUbo::flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MeshFlags(u32);

impl MeshFlags {
    pub const NONE: MeshFlags = MeshFlags(0);
    /// Sample the bound texture instead of using the flat base color.
    pub const TEXTURED: MeshFlags = MeshFlags(1);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: MeshFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl std::ops::BitOr for MeshFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-object block (`set = 1, binding = 0`).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshUbo {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub flags: u32,
    pub _padding: [u32; 3],
}

unsafe impl Zeroable for MeshUbo {}
unsafe impl Pod for MeshUbo {}

pub const MESH_BLOCK: BlockLayout = BlockLayout {
    name: "MeshUbo",
    members: &[
        ("model", offset_of!(MeshUbo, model) as u32),
        ("color", offset_of!(MeshUbo, color) as u32),
        ("flags", offset_of!(MeshUbo, flags) as u32),
    ],
    size: size_of::<MeshUbo>() as u32,
};

impl MeshUbo {
    pub fn new(model: Mat4, color: Vec4, flags: MeshFlags) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.to_array(),
            flags: flags.bits(),
            _padding: [0; 3],
        }
    }

    pub fn flat(model: Mat4, color: Vec4) -> Self {
        Self::new(model, color, MeshFlags::NONE)
    }

    pub fn textured(model: Mat4) -> Self {
        Self::new(model, Vec4::ONE, MeshFlags::TEXTURED)
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn color(&self) -> Vec4 {
        Vec4::from_array(self.color)
    }

    pub fn flags(&self) -> MeshFlags {
        MeshFlags::from_bits(self.flags)
    }
}

impl Default for MeshUbo {
    fn default() -> Self {
        Self::flat(Mat4::IDENTITY, Vec4::ONE)
    }
}

/// Infrequently updated light block (`set = 2, binding = 0` for the lit
/// variant). `ambient` sits in the fourth float of `color`'s std140 slot.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalLightUbo {
    pub direction: [f32; 3],
    pub _padding0: f32,
    pub color: [f32; 3],
    pub ambient: f32,
}

unsafe impl Zeroable for GlobalLightUbo {}
unsafe impl Pod for GlobalLightUbo {}

pub const LIGHT_BLOCK: BlockLayout = BlockLayout {
    name: "GlobalLightUbo",
    members: &[
        ("direction", offset_of!(GlobalLightUbo, direction) as u32),
        ("color", offset_of!(GlobalLightUbo, color) as u32),
        ("ambient", offset_of!(GlobalLightUbo, ambient) as u32),
    ],
    size: size_of::<GlobalLightUbo>() as u32,
};

impl GlobalLightUbo {
    pub fn new(direction: Vec3, color: Vec3, ambient: f32) -> Self {
        Self {
            direction: direction.to_array(),
            _padding0: 0.0,
            color: color.to_array(),
            ambient,
        }
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.direction)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }
}

impl Default for GlobalLightUbo {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_std140() {
        assert_eq!(size_of::<CameraUbo>(), 128);
        assert_eq!(size_of::<MeshUbo>(), 96);
        assert_eq!(size_of::<GlobalLightUbo>(), 32);
        assert_eq!(MESH_BLOCK.members[1], ("color", 64));
        assert_eq!(MESH_BLOCK.members[2], ("flags", 80));
        assert_eq!(LIGHT_BLOCK.members[1], ("color", 16));
        assert_eq!(LIGHT_BLOCK.members[2], ("ambient", 28));
    }

    #[test]
    fn blocks_upload_as_plain_bytes() {
        let mesh = MeshUbo::textured(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let bytes = bytemuck::bytes_of(&mesh);
        assert_eq!(bytes.len(), 96);
        assert_eq!(&bytes[80..84], &1u32.to_ne_bytes());

        let light = GlobalLightUbo::new(Vec3::X, Vec3::ONE, 0.25);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&light));
        assert_eq!(floats[7], 0.25);
    }

    #[test]
    fn flags_test_single_bits() {
        let flags = MeshFlags::from_bits(0b11);
        assert!(flags.contains(MeshFlags::TEXTURED));
        assert!(!MeshFlags::NONE.contains(MeshFlags::TEXTURED));
        assert!(!MeshFlags::NONE.contains(MeshFlags::NONE));
        assert_eq!((MeshFlags::NONE | MeshFlags::TEXTURED).bits(), 1);
    }

    #[test]
    fn camera_round_trips_matrices() {
        let camera = CameraUbo::perspective(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        );
        let view = camera.view();
        let origin = view.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
        assert_eq!(camera.view_proj(), camera.proj() * camera.view());
    }

    #[test]
    fn projection_uses_zero_to_one_depth() {
        let proj = CameraUbo::projection(1.0, 1.0, 0.5, 10.0);
        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }
}
