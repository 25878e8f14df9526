pub mod isosurface;
pub mod mesh;
pub mod stitch;
