pub mod coords;
pub mod heightmap;
pub mod noise;
pub mod settings;
